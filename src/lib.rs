pub mod environment;
pub mod evaluator;
pub mod lexer;
mod math; // Only seeds the global environment
pub mod parser;
pub mod pretty_print;
pub mod primitives;
pub mod source;
pub mod types;
pub mod value;

pub use environment::{EnvError, Environment};
pub use evaluator::{EvalError, EvalResult, evaluate};
pub use lexer::{Token, TokenKind, tokenize};
pub use parser::{ParseError, Parser, parse_str};
pub use source::Span;
pub use types::{Atom, Node, Sexpr};
pub use value::{Procedure, Value};

use thiserror::Error;

/// Any failure from reading and evaluating one line.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Eval(#[from] EvalError),
}

/// Parses the first expression in `input` and evaluates it in `env`.
pub fn eval_str(input: &str, env: &mut Environment) -> Result<Value, Error> {
    let node = parse_str(input)?;
    Ok(evaluate(&node, env)?)
}
