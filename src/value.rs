use crate::evaluator::{EvalError, EvalResult};
use crate::source::Span;
use num::{BigInt, ToPrimitive, Zero};
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

/// A runtime value produced by evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    /// Only ever holds values outside the `i64` range; build it through
    /// `Value::from(BigInt)`.
    BigInteger(BigInt),
    Float(f64),
    Symbol(String),
    // Shared so that `eq?` can tell one list apart from an equal copy.
    List(Rc<Vec<Value>>),
    Procedure(Procedure),
    /// The result of `define`; renders as nothing.
    Void,
}

pub type PrimitiveFunc = fn(Vec<Value>, Span) -> EvalResult<Value>;

#[derive(Clone)] // Need Clone for Value::Procedure
pub enum Procedure {
    Primitive(PrimitiveFunc, String), // The function pointer and its name (for display/debug)
}

impl Procedure {
    pub fn name(&self) -> &str {
        match self {
            Procedure::Primitive(_, name) => name,
        }
    }

    /// Invokes the procedure on already-evaluated arguments.
    pub fn call(&self, args: Vec<Value>, span: Span) -> EvalResult<Value> {
        match self {
            Procedure::Primitive(func, _) => func(args, span),
        }
    }
}

impl fmt::Debug for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Procedure::Primitive(_, name) => write!(f, "Primitive({})", name),
        }
    }
}

// Function pointers are not reliably comparable, so primitives compare by
// the name they were registered under.
impl PartialEq for Procedure {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Integer(if b { 1 } else { 0 })
    }
}

impl From<BigInt> for Value {
    fn from(n: BigInt) -> Self {
        match n.to_i64() {
            Some(small) => Value::Integer(small),
            None => Value::BigInteger(n),
        }
    }
}

impl From<Vec<Value>> for Value {
    fn from(values: Vec<Value>) -> Self {
        Value::List(Rc::new(values))
    }
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) | Value::BigInteger(_) => "integer",
            Value::Float(_) => "float",
            Value::Symbol(_) => "symbol",
            Value::List(_) => "list",
            Value::Procedure(_) => "procedure",
            Value::Void => "void",
        }
    }

    pub fn symbol(name: impl Into<String>) -> Value {
        Value::Symbol(name.into())
    }

    pub fn is_number(&self) -> bool {
        matches!(
            self,
            Value::Integer(_) | Value::BigInteger(_) | Value::Float(_)
        )
    }

    /// Zero, the empty list and `Void` are false; everything else is true.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Integer(n) => *n != 0,
            Value::BigInteger(n) => !n.is_zero(),
            Value::Float(n) => *n != 0.0,
            Value::List(elements) => !elements.is_empty(),
            Value::Void => false,
            Value::Symbol(_) | Value::Procedure(_) => true,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::BigInteger(n) => n.to_f64(),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Any integer value, widened to a `BigInt`.
    pub fn as_bigint(&self) -> Option<BigInt> {
        match self {
            Value::Integer(n) => Some(BigInt::from(*n)),
            Value::BigInteger(n) => Some(n.clone()),
            _ => None,
        }
    }

    /// The text the REPL prints for this value, or `None` for `Void`.
    pub fn rendering(&self) -> Option<String> {
        match self {
            Value::Void => None,
            value => Some(value.to_string()),
        }
    }

    /// Structural equality; integers and floats compare numerically.
    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (a, b) if a.is_number() && b.is_number() => match (a.as_bigint(), b.as_bigint()) {
                (Some(x), Some(y)) => x == y,
                _ => a.as_float() == b.as_float(),
            },
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.equals(y))
            }
            (a, b) => a == b,
        }
    }

    /// Identity: lists must be the same allocation, atoms the same value.
    pub fn is_same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
            (a, b) => a == b,
        }
    }

    /// Orders two values for the comparison primitives. `Ok(None)` means the
    /// values are unordered (a NaN is involved).
    pub fn compare(&self, other: &Value, span: Span) -> EvalResult<Option<Ordering>> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Ok(Some(a.cmp(b))),
            (a, b) if a.is_number() && b.is_number() => match (a.as_bigint(), b.as_bigint()) {
                (Some(x), Some(y)) => Ok(Some(x.cmp(&y))),
                _ => Ok(a.as_float().partial_cmp(&b.as_float())),
            },
            (Value::Symbol(a), Value::Symbol(b)) => Ok(Some(a.cmp(b))),
            (Value::List(a), Value::List(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    if !x.equals(y) {
                        return x.compare(y, span);
                    }
                }
                Ok(Some(a.len().cmp(&b.len())))
            }
            (a, b) => Err(EvalError::TypeMismatch {
                expected: a.type_name(),
                found: b.clone(),
                span,
            }),
        }
    }
}

fn fmt_float(n: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if n.is_nan() {
        write!(f, "nan")
    } else if n.is_infinite() {
        write!(f, "{}", if n > 0.0 { "inf" } else { "-inf" })
    } else if n != 0.0 && (n.abs() >= 1e16 || n.abs() < 1e-4) {
        let repr = format!("{:e}", n);
        match repr.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => write!(f, "{}e+{:0>2}", mantissa, exp),
            Some((mantissa, exp)) => write!(f, "{}e-{:0>2}", mantissa, &exp[1..]),
            None => write!(f, "{}", repr),
        }
    } else {
        write!(f, "{:?}", n)
    }
}

// Renders values the way the REPL prints them
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{}", n),
            Value::BigInteger(n) => write!(f, "{}", n),
            Value::Float(n) => fmt_float(*n, f),
            Value::Symbol(s) => write!(f, "{}", s),
            Value::List(list) => {
                write!(f, "(")?;
                let mut first = true;
                for value in list.iter() {
                    if !first {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", value)?;
                    first = false;
                }
                write!(f, ")")
            }
            Value::Procedure(procedure) => write!(f, "#<primitive:{}>", procedure.name()),
            Value::Void => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(values: Vec<Value>) -> Value {
        Value::from(values)
    }

    #[test]
    fn test_display_atoms() {
        assert_eq!(Value::Integer(-12).to_string(), "-12");
        assert_eq!(Value::symbol("foo").to_string(), "foo");
        assert_eq!(Value::Void.to_string(), "");
    }

    #[test]
    fn test_display_floats() {
        assert_eq!(Value::Float(3.0).to_string(), "3.0");
        assert_eq!(Value::Float(0.5).to_string(), "0.5");
        assert_eq!(Value::Float(-2.25).to_string(), "-2.25");
        assert_eq!(Value::Float(0.0).to_string(), "0.0");
        assert_eq!(Value::Float(f64::INFINITY).to_string(), "inf");
        assert_eq!(Value::Float(f64::NEG_INFINITY).to_string(), "-inf");
        assert_eq!(Value::Float(f64::NAN).to_string(), "nan");
        assert_eq!(Value::Float(1e16).to_string(), "1e+16");
        assert_eq!(Value::Float(1.5e-7).to_string(), "1.5e-07");
    }

    #[test]
    fn test_display_lists() {
        let nested = list(vec![
            Value::Integer(1),
            list(vec![Value::symbol("a"), Value::Float(2.5)]),
            list(vec![]),
        ]);
        assert_eq!(nested.to_string(), "(1 (a 2.5) ())");
    }

    #[test]
    fn test_big_integers_normalize_and_compare_exactly() {
        let big = |digits: &str| Value::from(digits.parse::<BigInt>().expect("valid digits"));
        assert_eq!(big("42"), Value::Integer(42));
        assert!(matches!(big("100000000000000000001"), Value::BigInteger(_)));
        assert_eq!(big("100000000000000000001").to_string(), "100000000000000000001");
        assert!(!big("100000000000000000001").equals(&big("100000000000000000000")));
        assert_eq!(
            big("100000000000000000001").compare(&big("100000000000000000000"), Span::default()),
            Ok(Some(Ordering::Greater))
        );
        assert_eq!(
            big("100000000000000000000").compare(&Value::Integer(1), Span::default()),
            Ok(Some(Ordering::Greater))
        );
        assert!(big("-100000000000000000000").is_truthy());
        assert_eq!(big("100000000000000000000").as_float(), Some(1e20));
    }

    #[test]
    fn test_rendering_skips_void() {
        assert_eq!(Value::Void.rendering(), None);
        assert_eq!(Value::Integer(0).rendering(), Some("0".to_string()));
        assert_eq!(list(vec![]).rendering(), Some("()".to_string()));
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Integer(0).is_truthy());
        assert!(!Value::Float(0.0).is_truthy());
        assert!(!list(vec![]).is_truthy());
        assert!(!Value::Void.is_truthy());
        assert!(Value::Integer(-1).is_truthy());
        assert!(Value::symbol("x").is_truthy());
        assert!(list(vec![Value::Integer(0)]).is_truthy());
    }

    #[test]
    fn test_equals_is_numeric_across_types() {
        assert!(Value::Integer(1).equals(&Value::Float(1.0)));
        assert!(!Value::Integer(1).equals(&Value::symbol("1")));
        assert!(
            list(vec![Value::Integer(1), Value::Float(2.0)])
                .equals(&list(vec![Value::Float(1.0), Value::Integer(2)]))
        );
    }

    #[test]
    fn test_is_same_uses_list_identity() {
        let a = list(vec![Value::Integer(1)]);
        let b = list(vec![Value::Integer(1)]);
        assert!(a.is_same(&a.clone()));
        assert!(!a.is_same(&b));
        assert!(Value::symbol("x").is_same(&Value::symbol("x")));
    }

    #[test]
    fn test_compare() {
        let span = Span::default();
        let cmp = |a: Value, b: Value| a.compare(&b, span).expect("comparable");
        assert_eq!(cmp(Value::Integer(1), Value::Float(1.5)), Some(Ordering::Less));
        assert_eq!(cmp(Value::symbol("b"), Value::symbol("a")), Some(Ordering::Greater));
        assert_eq!(
            cmp(
                list(vec![Value::Integer(1), Value::Integer(2)]),
                list(vec![Value::Integer(1), Value::Integer(3)])
            ),
            Some(Ordering::Less)
        );
        assert_eq!(
            cmp(list(vec![Value::Integer(1)]), list(vec![Value::Integer(1), Value::Integer(0)])),
            Some(Ordering::Less)
        );
        assert_eq!(cmp(Value::Float(f64::NAN), Value::Integer(1)), None);
        assert!(matches!(
            Value::Integer(1).compare(&Value::symbol("a"), span),
            Err(EvalError::TypeMismatch { .. })
        ));
    }
}
