use crate::source::Span;
use num::{BigInt, ToPrimitive};
use std::fmt; // For custom display formatting

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: Sexpr, // The actual S-expression data
    pub span: Span,  // The source span it covers
}

impl Node {
    pub fn new(kind: Sexpr, span: Span) -> Self {
        Node { kind, span }
    }

    pub fn new_atom(atom: Atom, span: Span) -> Self {
        Node::new(Sexpr::Atom(atom), span)
    }

    pub fn new_symbol(name: impl Into<String>, span: Span) -> Self {
        Node::new_atom(Atom::Symbol(name.into()), span)
    }

    pub fn new_integer(n: i64, span: Span) -> Self {
        Node::new_atom(Atom::Integer(n), span)
    }

    pub fn new_float(n: f64, span: Span) -> Self {
        Node::new_atom(Atom::Float(n), span)
    }

    pub fn new_list(elements: Vec<Node>, span: Span) -> Self {
        Node::new(Sexpr::List(elements), span)
    }

    /// The symbol name, if this node is a symbol atom.
    pub fn as_symbol(&self) -> Option<&str> {
        match &self.kind {
            Sexpr::Atom(Atom::Symbol(name)) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Delegate to Sexpr's Display implementation
        write!(f, "{}", self.kind)
    }
}

/// A classified leaf of the expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Atom {
    Integer(i64),
    /// An integer literal outside the `i64` range, kept exact.
    BigInteger(BigInt),
    Float(f64),
    Symbol(String),
}

impl Atom {
    /// Classifies one lexeme: base-10 integer first, then floating point,
    /// otherwise a symbol holding the text verbatim. Never fails.
    pub fn classify(lexeme: &str) -> Atom {
        if let Ok(n) = lexeme.parse::<i64>() {
            Atom::Integer(n)
        } else if let Ok(n) = lexeme.parse::<BigInt>() {
            match n.to_i64() {
                Some(small) => Atom::Integer(small),
                None => Atom::BigInteger(n),
            }
        } else if let Ok(n) = lexeme.parse::<f64>() {
            Atom::Float(n)
        } else {
            Atom::Symbol(lexeme.to_string())
        }
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::Integer(n) => write!(f, "{}", n),
            Atom::BigInteger(n) => write!(f, "{}", n),
            Atom::Float(n) => write!(f, "{:?}", n),
            Atom::Symbol(s) => write!(f, "{}", s),
        }
    }
}

/// The expression tree produced by the parser: an atom or a parenthesized
/// sequence of sub-expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum Sexpr {
    Atom(Atom),
    List(Vec<Node>), // e.g., (+ 1 2), (define x 10)
}

impl fmt::Display for Sexpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sexpr::Atom(atom) => write!(f, "{}", atom),
            Sexpr::List(list) => {
                write!(f, "(")?;
                let mut first = true;
                for expr in list {
                    if !first {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", expr)?;
                    first = false;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_integer() {
        assert_eq!(Atom::classify("3"), Atom::Integer(3));
        assert_eq!(Atom::classify("-42"), Atom::Integer(-42));
        assert_eq!(Atom::classify("+7"), Atom::Integer(7));
    }

    #[test]
    fn test_classify_float() {
        assert_eq!(Atom::classify("3.5"), Atom::Float(3.5));
        assert_eq!(Atom::classify(".5"), Atom::Float(0.5));
        assert_eq!(Atom::classify("1."), Atom::Float(1.0));
        assert_eq!(Atom::classify("-1e-5"), Atom::Float(-1e-5));
    }

    #[test]
    fn test_classify_big_integer_is_exact() {
        let expected: BigInt = "12345678901234567891".parse().expect("valid digits");
        assert_eq!(
            Atom::classify("12345678901234567891"),
            Atom::BigInteger(expected)
        );
        assert_eq!(
            Atom::classify("-99999999999999999999").to_string(),
            "-99999999999999999999"
        );
        // Still fits after all
        assert_eq!(
            Atom::classify("-9223372036854775808"),
            Atom::Integer(i64::MIN)
        );
    }

    #[test]
    fn test_classify_symbol() {
        assert_eq!(Atom::classify("foo"), Atom::Symbol("foo".to_string()));
        assert_eq!(Atom::classify("+"), Atom::Symbol("+".to_string()));
        assert_eq!(Atom::classify("1-2"), Atom::Symbol("1-2".to_string()));
        assert_eq!(Atom::classify("1.2.3"), Atom::Symbol("1.2.3".to_string()));
        assert_eq!(Atom::classify("null?"), Atom::Symbol("null?".to_string()));
        // Punctuation that normally never reaches the classifier
        assert_eq!(Atom::classify("("), Atom::Symbol("(".to_string()));
    }

    #[test]
    fn test_display_nested() {
        let node = Node::new_list(
            vec![
                Node::new_symbol("+", Span::default()),
                Node::new_integer(1, Span::default()),
                Node::new_list(
                    vec![
                        Node::new_symbol("*", Span::default()),
                        Node::new_float(2.5, Span::default()),
                    ],
                    Span::default(),
                ),
            ],
            Span::default(),
        );
        assert_eq!(node.to_string(), "(+ 1 (* 2.5))");
        assert_eq!(Node::new_list(vec![], Span::default()).to_string(), "()");
    }
}
