//! The numeric library seeded into the global environment: constants plus
//! float, integer and predicate functions, each registered under its usual
//! name.

use std::f64::consts;

use num::{BigInt, Integer, One, Signed, ToPrimitive, Zero};

use crate::environment::Environment;
use crate::evaluator::{EvalError, EvalResult};
use crate::primitives::{
    check_arity, expect_big_integer, expect_float, expect_list, float_to_integer, overflow,
};
use crate::source::Span;
use crate::value::Value;

// NaN from non-NaN input is a domain error, an infinity from finite input a
// range error.
fn checked_float(name: &str, inputs: &[f64], result: f64, span: Span) -> EvalResult {
    if result.is_nan() && !inputs.iter().any(|x| x.is_nan()) {
        Err(EvalError::InvalidArguments(
            format!("{}: math domain error", name),
            span,
        ))
    } else if result.is_infinite() && inputs.iter().all(|x| x.is_finite()) {
        Err(EvalError::InvalidArguments(
            format!("{}: math range error", name),
            span,
        ))
    } else {
        Ok(Value::Float(result))
    }
}

macro_rules! unary_float {
    ($($fn_name:ident => $name:literal, $op:expr;)*) => {
        $(
            fn $fn_name(args: Vec<Value>, span: Span) -> EvalResult {
                check_arity!(args, 1, span, $name);
                let x = expect_float(&args[0], span)?;
                checked_float($name, &[x], $op(x), span)
            }
        )*
    };
}

macro_rules! binary_float {
    ($($fn_name:ident => $name:literal, $op:expr;)*) => {
        $(
            fn $fn_name(args: Vec<Value>, span: Span) -> EvalResult {
                check_arity!(args, 2, span, $name);
                let x = expect_float(&args[0], span)?;
                let y = expect_float(&args[1], span)?;
                checked_float($name, &[x, y], $op(x, y), span)
            }
        )*
    };
}

macro_rules! float_to_int {
    ($($fn_name:ident => $name:literal, $op:expr;)*) => {
        $(
            fn $fn_name(args: Vec<Value>, span: Span) -> EvalResult {
                check_arity!(args, 1, span, $name);
                match &args[0] {
                    Value::Integer(_) | Value::BigInteger(_) => Ok(args[0].clone()),
                    other => float_to_integer($op(expect_float(other, span)?), span, $name),
                }
            }
        )*
    };
}

macro_rules! float_predicate {
    ($($fn_name:ident => $name:literal, $op:expr;)*) => {
        $(
            fn $fn_name(args: Vec<Value>, span: Span) -> EvalResult {
                check_arity!(args, 1, span, $name);
                Ok(Value::from($op(expect_float(&args[0], span)?)))
            }
        )*
    };
}

unary_float! {
    math_sqrt => "sqrt", f64::sqrt;
    math_exp => "exp", f64::exp;
    math_expm1 => "expm1", f64::exp_m1;
    math_log10 => "log10", f64::log10;
    math_log2 => "log2", f64::log2;
    math_log1p => "log1p", f64::ln_1p;
    math_sin => "sin", f64::sin;
    math_cos => "cos", f64::cos;
    math_tan => "tan", f64::tan;
    math_asin => "asin", f64::asin;
    math_acos => "acos", f64::acos;
    math_atan => "atan", f64::atan;
    math_sinh => "sinh", f64::sinh;
    math_cosh => "cosh", f64::cosh;
    math_tanh => "tanh", f64::tanh;
    math_asinh => "asinh", f64::asinh;
    math_acosh => "acosh", f64::acosh;
    math_atanh => "atanh", f64::atanh;
    math_fabs => "fabs", f64::abs;
    math_degrees => "degrees", f64::to_degrees;
    math_radians => "radians", f64::to_radians;
}

binary_float! {
    math_atan2 => "atan2", f64::atan2;
    math_pow => "pow", f64::powf;
    math_hypot => "hypot", f64::hypot;
    math_fmod => "fmod", |x: f64, y: f64| x % y;
    math_copysign => "copysign", f64::copysign;
}

float_to_int! {
    math_floor => "floor", f64::floor;
    math_ceil => "ceil", f64::ceil;
    math_trunc => "trunc", f64::trunc;
}

float_predicate! {
    math_isfinite => "isfinite", f64::is_finite;
    math_isinf => "isinf", f64::is_infinite;
    math_isnan => "isnan", f64::is_nan;
}

fn math_log(args: Vec<Value>, span: Span) -> EvalResult {
    // (log x) is the natural log, (log x base) divides by ln(base)
    check_arity!(args, 1, 2, span, "log");
    let x = expect_float(&args[0], span)?;
    if x <= 0.0 {
        return Err(EvalError::InvalidArguments(
            "log: math domain error".to_string(),
            span,
        ));
    }
    match args.get(1) {
        None => checked_float("log", &[x], x.ln(), span),
        Some(base) => {
            let base = expect_float(base, span)?;
            if base <= 0.0 || base == 1.0 {
                return Err(EvalError::InvalidArguments(
                    "log: math domain error".to_string(),
                    span,
                ));
            }
            checked_float("log", &[x, base], x.ln() / base.ln(), span)
        }
    }
}

fn expect_non_negative(value: &Value, span: Span, name: &str) -> EvalResult<BigInt> {
    let n = expect_big_integer(value, span)?;
    if n.is_negative() {
        return Err(EvalError::InvalidArguments(
            format!("{}: expects a non-negative integer, got {}", name, n),
            span,
        ));
    }
    Ok(n)
}

fn math_factorial(args: Vec<Value>, span: Span) -> EvalResult {
    check_arity!(args, 1, span, "factorial");
    let n = expect_non_negative(&args[0], span, "factorial")?
        .to_u64()
        .ok_or_else(|| overflow("factorial", span))?;
    let product = (2..=n).fold(BigInt::one(), |acc, k| acc * k);
    Ok(Value::from(product))
}

fn math_gcd(args: Vec<Value>, span: Span) -> EvalResult {
    let mut acc = BigInt::zero();
    for arg in &args {
        acc = acc.gcd(&expect_big_integer(arg, span)?);
    }
    Ok(Value::from(acc))
}

fn math_lcm(args: Vec<Value>, span: Span) -> EvalResult {
    let mut acc = BigInt::one();
    for arg in &args {
        let n = expect_big_integer(arg, span)?;
        if acc.is_zero() || n.is_zero() {
            acc = BigInt::zero();
            continue;
        }
        acc = (&acc / acc.gcd(&n) * n).abs();
    }
    Ok(Value::from(acc))
}

fn math_isqrt(args: Vec<Value>, span: Span) -> EvalResult {
    check_arity!(args, 1, span, "isqrt");
    let n = expect_non_negative(&args[0], span, "isqrt")?;
    Ok(Value::from(n.sqrt()))
}

fn math_comb(args: Vec<Value>, span: Span) -> EvalResult {
    check_arity!(args, 2, span, "comb");
    let n = expect_non_negative(&args[0], span, "comb")?;
    let k = expect_non_negative(&args[1], span, "comb")?;
    if k > n {
        return Ok(Value::Integer(0));
    }
    let k = k.clone().min(&n - &k);
    let steps = k.to_u64().ok_or_else(|| overflow("comb", span))?;
    let base = &n - &k;
    let mut acc = BigInt::one();
    for i in 1..=steps {
        // acc * (n - k + i) is always divisible by i
        acc = acc * (&base + i) / i;
    }
    Ok(Value::from(acc))
}

fn math_fsum(args: Vec<Value>, span: Span) -> EvalResult {
    check_arity!(args, 1, span, "fsum");
    let mut total = 0.0;
    for value in expect_list(&args[0], span)?.iter() {
        total += expect_float(value, span)?;
    }
    Ok(Value::Float(total))
}

/// Registers every constant and function of the numeric library.
pub(crate) fn install(env: &mut Environment) {
    env.define("pi".to_string(), Value::Float(consts::PI));
    env.define("e".to_string(), Value::Float(consts::E));
    env.define("tau".to_string(), Value::Float(consts::TAU));
    env.define("inf".to_string(), Value::Float(f64::INFINITY));
    env.define("nan".to_string(), Value::Float(f64::NAN));

    env.add_primitive("sqrt", math_sqrt);
    env.add_primitive("exp", math_exp);
    env.add_primitive("expm1", math_expm1);
    env.add_primitive("log", math_log);
    env.add_primitive("log10", math_log10);
    env.add_primitive("log2", math_log2);
    env.add_primitive("log1p", math_log1p);
    env.add_primitive("sin", math_sin);
    env.add_primitive("cos", math_cos);
    env.add_primitive("tan", math_tan);
    env.add_primitive("asin", math_asin);
    env.add_primitive("acos", math_acos);
    env.add_primitive("atan", math_atan);
    env.add_primitive("sinh", math_sinh);
    env.add_primitive("cosh", math_cosh);
    env.add_primitive("tanh", math_tanh);
    env.add_primitive("asinh", math_asinh);
    env.add_primitive("acosh", math_acosh);
    env.add_primitive("atanh", math_atanh);
    env.add_primitive("fabs", math_fabs);
    env.add_primitive("degrees", math_degrees);
    env.add_primitive("radians", math_radians);

    env.add_primitive("atan2", math_atan2);
    env.add_primitive("pow", math_pow);
    env.add_primitive("hypot", math_hypot);
    env.add_primitive("fmod", math_fmod);
    env.add_primitive("copysign", math_copysign);

    env.add_primitive("floor", math_floor);
    env.add_primitive("ceil", math_ceil);
    env.add_primitive("trunc", math_trunc);

    env.add_primitive("factorial", math_factorial);
    env.add_primitive("gcd", math_gcd);
    env.add_primitive("lcm", math_lcm);
    env.add_primitive("isqrt", math_isqrt);
    env.add_primitive("comb", math_comb);
    env.add_primitive("fsum", math_fsum);

    env.add_primitive("isfinite", math_isfinite);
    env.add_primitive("isinf", math_isinf);
    env.add_primitive("isnan", math_isnan);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::evaluate;
    use crate::parser::parse_str;

    fn eval(input: &str) -> EvalResult {
        let node = parse_str(input).unwrap_or_else(|e| panic!("Parsing failed for '{}': {}", input, e));
        evaluate(&node, &mut Environment::new_global_populated())
    }

    fn assert_eval(input: &str, expected: Value) {
        match eval(input) {
            Ok(result) => assert_eq!(result, expected, "Input: '{}'", input),
            Err(e) => panic!("Evaluation failed for input '{}': {}", input, e),
        }
    }

    fn assert_close(input: &str, expected: f64) {
        match eval(input) {
            Ok(Value::Float(n)) => assert!(
                (n - expected).abs() < 1e-12,
                "Input: '{}', expected {}, got {}",
                input,
                expected,
                n
            ),
            other => panic!("Input: '{}', expected a float, got {:?}", input, other),
        }
    }

    fn assert_invalid_arguments(input: &str) {
        let result = eval(input);
        assert!(
            matches!(result, Err(EvalError::InvalidArguments(_, _))),
            "Input: '{}', expected invalid arguments, got {:?}",
            input,
            result
        );
    }

    #[test]
    fn test_constants() {
        assert_eval("pi", Value::Float(consts::PI));
        assert_eval("e", Value::Float(consts::E));
        assert_eval("tau", Value::Float(consts::TAU));
    }

    #[test]
    fn test_unary_functions() {
        assert_eval("(sqrt 16)", Value::Float(4.0));
        assert_close("(sin 0)", 0.0);
        assert_close("(cos pi)", -1.0);
        assert_close("(exp 1)", consts::E);
        assert_close("(log10 1000)", 3.0);
        assert_close("(degrees pi)", 180.0);
        assert_eval("(fabs -3)", Value::Float(3.0));
    }

    #[test]
    fn test_log() {
        assert_close("(log e)", 1.0);
        assert_close("(log 8 2)", 3.0);
        assert_invalid_arguments("(log 0)");
        assert_invalid_arguments("(log -1)");
        assert_invalid_arguments("(log 8 1)");
    }

    #[test]
    fn test_binary_functions() {
        assert_eval("(pow 2 10)", Value::Float(1024.0));
        assert_eval("(hypot 3 4)", Value::Float(5.0));
        assert_eval("(fmod 7 3)", Value::Float(1.0));
        assert_eval("(fmod -7 3)", Value::Float(-1.0));
        assert_eval("(copysign 2 -0.5)", Value::Float(-2.0));
        assert_close("(atan2 1 1)", consts::FRAC_PI_4);
    }

    #[test]
    fn test_domain_and_range_errors() {
        assert_invalid_arguments("(sqrt -1)");
        assert_invalid_arguments("(acos 2)");
        assert_invalid_arguments("(exp 1000)");
        assert_invalid_arguments("(fmod 1 0)");
        assert_invalid_arguments("(pow 0 -1)");
        // Non-finite input passes straight through
        assert_eval("(sqrt inf)", Value::Float(f64::INFINITY));
    }

    #[test]
    fn test_rounding_to_integer() {
        assert_eval("(floor 2.7)", Value::Integer(2));
        assert_eval("(floor -2.1)", Value::Integer(-3));
        assert_eval("(ceil 2.1)", Value::Integer(3));
        assert_eval("(trunc -2.9)", Value::Integer(-2));
        assert_eval("(floor 5)", Value::Integer(5));
        assert_invalid_arguments("(floor inf)");
        assert_invalid_arguments("(ceil nan)");
    }

    #[test]
    fn test_integer_functions() {
        assert_eval("(factorial 5)", Value::Integer(120));
        assert_eval("(factorial 0)", Value::Integer(1));
        assert_invalid_arguments("(factorial -1)");
        assert_eval(
            "(factorial 30)",
            Value::from("265252859812191058636308480000000".parse::<BigInt>().expect("digits")),
        );
        assert_eval("(gcd 12 18)", Value::Integer(6));
        assert_eval("(gcd -4 6)", Value::Integer(2));
        assert_eval("(lcm 4 6)", Value::Integer(12));
        assert_eval("(isqrt 17)", Value::Integer(4));
        assert_eval("(isqrt 16)", Value::Integer(4));
        assert_eval("(comb 5 2)", Value::Integer(10));
        assert_eval("(comb 2 5)", Value::Integer(0));
        assert_eval("(comb 100 50)", Value::from("100891344545564193334812497256".parse::<BigInt>().expect("digits")));
        assert_eval("(isqrt 100000000000000000000)", Value::Integer(10_000_000_000));
        assert_eval("(lcm 9223372036854775807 2)", Value::from(BigInt::from(i64::MAX) * 2));
        assert!(matches!(
            eval("(factorial 2.0)"),
            Err(EvalError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_gcd_of_most_negative_integer_is_positive() {
        assert_eval(
            "(gcd -9223372036854775808)",
            Value::from(-BigInt::from(i64::MIN)),
        );
        assert_eval("(gcd -9223372036854775808 6)", Value::Integer(2));
        assert_eval("(gcd)", Value::Integer(0));
    }

    #[test]
    fn test_predicates_and_fsum() {
        assert_eval("(isnan nan)", Value::Integer(1));
        assert_eval("(isinf inf)", Value::Integer(1));
        assert_eval("(isfinite 1)", Value::Integer(1));
        assert_eval("(fsum (list 1 2.5 3))", Value::Float(6.5));
    }

    #[test]
    fn test_abs_comes_from_builtins() {
        // abs comes from the built-in table and keeps integers exact
        assert_eval("(abs -3)", Value::Integer(3));
    }
}
