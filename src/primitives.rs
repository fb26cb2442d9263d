use std::cmp::Ordering;
use std::rc::Rc;

use num::{BigInt, FromPrimitive, Integer, Signed, ToPrimitive};

use crate::evaluator::{EvalError, EvalResult};
use crate::source::Span;
use crate::value::{Procedure, Value};

// Checks the number of arguments
macro_rules! check_arity {
    ($args:expr, $expected:expr, $span:expr, $name:expr) => {
        if $args.len() != $expected {
            return Err(EvalError::InvalidArguments(
                format!(
                    "Primitive '{}' expects exactly {} arguments, got {}",
                    $name,
                    $expected,
                    $args.len()
                ),
                $span,
            ));
        }
    };
    // Variant for minimum number of args
    ($args:expr, min $expected:expr, $span:expr, $name:expr) => {
        if $args.len() < $expected {
            return Err(EvalError::InvalidArguments(
                format!(
                    "Primitive '{}' expects at least {} arguments, got {}",
                    $name,
                    $expected,
                    $args.len()
                ),
                $span,
            ));
        }
    };
    // Variant for range of args (inclusive)
    ($args:expr, $min:expr, $max:expr, $span:expr, $name:expr) => {
        if !($min..=$max).contains(&$args.len()) {
            return Err(EvalError::InvalidArguments(
                format!(
                    "Primitive '{}' expects between {} and {} arguments, got {}",
                    $name,
                    $min,
                    $max,
                    $args.len()
                ),
                $span,
            ));
        }
    };
}

pub(crate) use check_arity;

pub(crate) fn type_mismatch(expected: &'static str, found: &Value, span: Span) -> EvalError {
    EvalError::TypeMismatch {
        expected,
        found: found.clone(),
        span,
    }
}

/// Reads an integer or float argument as `f64`.
pub(crate) fn expect_float(value: &Value, span: Span) -> EvalResult<f64> {
    value
        .as_float()
        .ok_or_else(|| type_mismatch("number", value, span))
}

/// Reads an integer argument that must fit in an `i64`.
pub(crate) fn expect_integer(value: &Value, span: Span, name: &str) -> EvalResult<i64> {
    match value {
        Value::Integer(n) => Ok(*n),
        Value::BigInteger(_) => Err(overflow(name, span)),
        _ => Err(type_mismatch("integer", value, span)),
    }
}

pub(crate) fn expect_big_integer(value: &Value, span: Span) -> EvalResult<BigInt> {
    value
        .as_bigint()
        .ok_or_else(|| type_mismatch("integer", value, span))
}

pub(crate) fn expect_list(value: &Value, span: Span) -> EvalResult<&Rc<Vec<Value>>> {
    match value {
        Value::List(items) => Ok(items),
        _ => Err(type_mismatch("list", value, span)),
    }
}

fn expect_procedure(value: &Value, span: Span) -> EvalResult<&Procedure> {
    match value {
        Value::Procedure(procedure) => Ok(procedure),
        _ => Err(EvalError::NotAProcedure(value.clone(), span)),
    }
}

/// Converts an already-rounded float to an exact integer value.
pub(crate) fn float_to_integer(n: f64, span: Span, name: &str) -> EvalResult {
    BigInt::from_f64(n).map(Value::from).ok_or_else(|| {
        EvalError::InvalidArguments(
            format!("{}: cannot convert {} to an integer", name, Value::Float(n)),
            span,
        )
    })
}

pub(crate) fn overflow(name: &str, span: Span) -> EvalError {
    EvalError::InvalidArguments(format!("integer too large in '{}'", name), span)
}

// Integers stay exact: i64 while the result fits, BigInt past that.
// Anything involving a float goes through f64.
fn arithmetic(
    args: Vec<Value>,
    span: Span,
    name: &str,
    int_op: fn(i64, i64) -> Option<i64>,
    big_op: fn(BigInt, BigInt) -> BigInt,
    float_op: fn(f64, f64) -> f64,
) -> EvalResult {
    check_arity!(args, 2, span, name);
    if let (Value::Integer(a), Value::Integer(b)) = (&args[0], &args[1]) {
        if let Some(n) = int_op(*a, *b) {
            return Ok(Value::Integer(n));
        }
    }
    match (args[0].as_bigint(), args[1].as_bigint()) {
        (Some(a), Some(b)) => Ok(Value::from(big_op(a, b))),
        _ => Ok(Value::Float(float_op(
            expect_float(&args[0], span)?,
            expect_float(&args[1], span)?,
        ))),
    }
}

/// Addition of numbers, concatenation of lists. Also bound as `append`.
pub fn prim_add(args: Vec<Value>, span: Span) -> EvalResult {
    check_arity!(args, 2, span, "+");
    if let (Value::List(a), Value::List(b)) = (&args[0], &args[1]) {
        let joined: Vec<Value> = a.iter().chain(b.iter()).cloned().collect();
        return Ok(Value::from(joined));
    }
    arithmetic(args, span, "+", i64::checked_add, |a, b| a + b, |a, b| a + b)
}

pub fn prim_sub(args: Vec<Value>, span: Span) -> EvalResult {
    arithmetic(args, span, "-", i64::checked_sub, |a, b| a - b, |a, b| a - b)
}

pub fn prim_mul(args: Vec<Value>, span: Span) -> EvalResult {
    arithmetic(args, span, "*", i64::checked_mul, |a, b| a * b, |a, b| a * b)
}

/// True division: the result is always a float.
pub fn prim_div(args: Vec<Value>, span: Span) -> EvalResult {
    check_arity!(args, 2, span, "/");
    let dividend = expect_float(&args[0], span)?;
    let divisor = expect_float(&args[1], span)?;
    if divisor == 0.0 {
        return Err(EvalError::InvalidArguments(
            "Division by zero".to_string(),
            span,
        ));
    }
    Ok(Value::Float(dividend / divisor))
}

fn compare_with(args: Vec<Value>, span: Span, name: &str, accept: fn(Ordering) -> bool) -> EvalResult {
    check_arity!(args, 2, span, name);
    let ordering = args[0].compare(&args[1], span)?;
    Ok(Value::from(ordering.is_some_and(accept)))
}

pub fn prim_equals(args: Vec<Value>, span: Span) -> EvalResult {
    check_arity!(args, 2, span, "=");
    Ok(Value::from(args[0].equals(&args[1])))
}

pub fn prim_less_than(args: Vec<Value>, span: Span) -> EvalResult {
    compare_with(args, span, "<", Ordering::is_lt)
}

pub fn prim_less_than_or_equals(args: Vec<Value>, span: Span) -> EvalResult {
    compare_with(args, span, "<=", Ordering::is_le)
}

pub fn prim_greater_than(args: Vec<Value>, span: Span) -> EvalResult {
    compare_with(args, span, "v", Ordering::is_gt)
}

pub fn prim_greater_than_or_equals(args: Vec<Value>, span: Span) -> EvalResult {
    compare_with(args, span, ">=", Ordering::is_ge)
}

// --- List Primitives ---

pub fn prim_car(args: Vec<Value>, span: Span) -> EvalResult {
    // (car list) -> first item
    check_arity!(args, 1, span, "car");
    expect_list(&args[0], span)?
        .first()
        .cloned()
        .ok_or_else(|| EvalError::InvalidArguments("car: list index out of range".to_string(), span))
}

pub fn prim_cdr(args: Vec<Value>, span: Span) -> EvalResult {
    // (cdr list) -> the element at index 1, not the rest of the list
    check_arity!(args, 1, span, "cdr");
    expect_list(&args[0], span)?
        .get(1)
        .cloned()
        .ok_or_else(|| EvalError::InvalidArguments("cdr: list index out of range".to_string(), span))
}

pub fn prim_cons(args: Vec<Value>, span: Span) -> EvalResult {
    // (cons item list) -> [item, ..list]
    check_arity!(args, 2, span, "cons");
    let tail = expect_list(&args[1], span)?;
    let mut elements = Vec::with_capacity(tail.len() + 1);
    elements.push(args[0].clone());
    elements.extend(tail.iter().cloned());
    Ok(Value::from(elements))
}

pub fn prim_length(args: Vec<Value>, span: Span) -> EvalResult {
    check_arity!(args, 1, span, "length");
    let len = expect_list(&args[0], span)?.len();
    Ok(Value::Integer(len as i64))
}

pub fn prim_list(args: Vec<Value>, _span: Span) -> EvalResult {
    // (list item1 item2 ...) -> new list containing items
    Ok(Value::from(args))
}

// --- Type Predicates ---

macro_rules! is_type {
    ($args:expr, $type:pat, $name:expr, $span:expr) => {{
        check_arity!($args, 1, $span, $name);
        Ok(Value::from(matches!(&$args[0], $type)))
    }};
}

pub fn prim_is_list(args: Vec<Value>, span: Span) -> EvalResult {
    is_type!(args, Value::List(_), "list?", span)
}

pub fn prim_is_null(args: Vec<Value>, span: Span) -> EvalResult {
    check_arity!(args, 1, span, "null?");
    Ok(Value::from(
        matches!(&args[0], Value::List(items) if items.is_empty()),
    ))
}

pub fn prim_is_number(args: Vec<Value>, span: Span) -> EvalResult {
    is_type!(
        args,
        Value::Integer(_) | Value::BigInteger(_) | Value::Float(_),
        "number?",
        span
    )
}

pub fn prim_is_symbol(args: Vec<Value>, span: Span) -> EvalResult {
    is_type!(args, Value::Symbol(_), "symbol?", span)
}

pub fn prim_is_procedure(args: Vec<Value>, span: Span) -> EvalResult {
    is_type!(args, Value::Procedure(_), "procedure?", span)
}

pub fn prim_is_eq(args: Vec<Value>, span: Span) -> EvalResult {
    check_arity!(args, 2, span, "eq?");
    Ok(Value::from(args[0].is_same(&args[1])))
}

pub fn prim_is_equal(args: Vec<Value>, span: Span) -> EvalResult {
    check_arity!(args, 2, span, "equal?");
    Ok(Value::from(args[0].equals(&args[1])))
}

// --- Utilities ---

pub fn prim_abs(args: Vec<Value>, span: Span) -> EvalResult {
    check_arity!(args, 1, span, "abs");
    match args[0].as_bigint() {
        Some(n) => Ok(Value::from(n.abs())),
        None => Ok(Value::Float(expect_float(&args[0], span)?.abs())),
    }
}

pub fn prim_apply(args: Vec<Value>, span: Span) -> EvalResult {
    // (apply proc (arg1 arg2 ...))
    check_arity!(args, 2, span, "apply");
    let procedure = expect_procedure(&args[0], span)?;
    let call_args = expect_list(&args[1], span)?.to_vec();
    procedure.call(call_args, span)
}

pub fn prim_begin(mut args: Vec<Value>, span: Span) -> EvalResult {
    // Arguments are already evaluated in order; only the last one is kept.
    args.pop()
        .ok_or_else(|| EvalError::InvalidArguments("begin: expects at least one argument".to_string(), span))
}

pub fn prim_expt(args: Vec<Value>, span: Span) -> EvalResult {
    check_arity!(args, 2, span, "expt");
    if let (Some(base), Some(exponent)) = (args[0].as_bigint(), args[1].as_bigint()) {
        if !exponent.is_negative() {
            let exponent = exponent.to_u32().ok_or_else(|| overflow("expt", span))?;
            return Ok(Value::from(base.pow(exponent)));
        }
    }
    let base = expect_float(&args[0], span)?;
    let exponent = expect_float(&args[1], span)?;
    if base == 0.0 && exponent < 0.0 {
        return Err(EvalError::InvalidArguments(
            "expt: 0 cannot be raised to a negative power".to_string(),
            span,
        ));
    }
    let result = base.powf(exponent);
    if result.is_nan() && !base.is_nan() && !exponent.is_nan() {
        return Err(EvalError::InvalidArguments("expt: math domain error".to_string(), span));
    }
    Ok(Value::Float(result))
}

pub fn prim_map(args: Vec<Value>, span: Span) -> EvalResult {
    // (map proc list1 list2 ...) stops at the shortest list
    check_arity!(args, min 2, span, "map");
    let procedure = expect_procedure(&args[0], span)?;
    let lists = args[1..]
        .iter()
        .map(|arg| expect_list(arg, span))
        .collect::<EvalResult<Vec<_>>>()?;
    let len = lists.iter().map(|list| list.len()).min().unwrap_or(0);

    let mut results = Vec::with_capacity(len);
    for i in 0..len {
        let call_args = lists.iter().map(|list| list[i].clone()).collect();
        results.push(procedure.call(call_args, span)?);
    }
    Ok(Value::from(results))
}

fn extremum(args: Vec<Value>, span: Span, name: &str, wanted: Ordering) -> EvalResult {
    // Either (max a b ...) or (max list)
    let candidates = if args.len() == 1 {
        expect_list(&args[0], span)?.to_vec()
    } else {
        args
    };
    let mut iter = candidates.into_iter();
    let mut best = iter.next().ok_or_else(|| {
        EvalError::InvalidArguments(format!("{}: expects at least one value", name), span)
    })?;
    for candidate in iter {
        if candidate.compare(&best, span)? == Some(wanted) {
            best = candidate;
        }
    }
    Ok(best)
}

pub fn prim_max(args: Vec<Value>, span: Span) -> EvalResult {
    extremum(args, span, "max", Ordering::Greater)
}

pub fn prim_min(args: Vec<Value>, span: Span) -> EvalResult {
    extremum(args, span, "min", Ordering::Less)
}

pub fn prim_not(args: Vec<Value>, span: Span) -> EvalResult {
    check_arity!(args, 1, span, "not");
    Ok(Value::from(!args[0].is_truthy()))
}

pub fn prim_print(args: Vec<Value>, _span: Span) -> EvalResult {
    let line: Vec<String> = args.iter().map(Value::to_string).collect();
    println!("{}", line.join(" "));
    Ok(Value::Void)
}

pub fn prim_round(args: Vec<Value>, span: Span) -> EvalResult {
    // (round x) -> integer, ties to even; (round x digits) keeps x's type
    match args.as_slice() {
        [value] => match value {
            Value::Integer(_) | Value::BigInteger(_) => Ok(value.clone()),
            _ => float_to_integer(expect_float(value, span)?.round_ties_even(), span, "round"),
        },
        [value, digits] => {
            let digits = expect_integer(digits, span, "round")?;
            match value.as_bigint() {
                Some(n) => round_integer(n, digits, span),
                None => {
                    let x = expect_float(value, span)?;
                    let factor = 10f64.powi(digits.clamp(-308, 308) as i32);
                    let scaled = x * factor;
                    if !scaled.is_finite() {
                        // Already more precise than the requested digits
                        return Ok(Value::Float(x));
                    }
                    Ok(Value::Float(scaled.round_ties_even() / factor))
                }
            }
        }
        _ => Err(EvalError::InvalidArguments(
            format!(
                "Primitive 'round' expects between 1 and 2 arguments, got {}",
                args.len()
            ),
            span,
        )),
    }
}

// Rounds to a multiple of 10^-digits, ties to even, exactly.
fn round_integer(n: BigInt, digits: i64, span: Span) -> EvalResult {
    if digits >= 0 {
        return Ok(Value::from(n));
    }
    let places = u32::try_from(digits.unsigned_abs()).map_err(|_| overflow("round", span))?;
    let factor = BigInt::from(10).pow(places);
    let (quotient, remainder) = n.div_mod_floor(&factor);
    let twice: BigInt = remainder * 2;
    let quotient = match twice.cmp(&factor) {
        Ordering::Greater => quotient + 1,
        Ordering::Equal if quotient.is_odd() => quotient + 1,
        _ => quotient,
    };
    Ok(Value::from(quotient * factor))
}
