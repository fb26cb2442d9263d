use crate::environment::{EnvError, Environment};
use crate::source::Span;
use crate::types::{Atom, Node, Sexpr};
use crate::value::Value;
use log::{debug, trace};
use std::collections::HashSet;
use thiserror::Error;

// --- Evaluation Error ---
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error(transparent)]
    EnvError(#[from] EnvError), // Errors from environment lookup
    #[error("Evaluation Error: Expected a procedure, but got: {0}")]
    NotAProcedure(Value, Span), // Tried to call something that isn't a procedure
    #[error("Evaluation Error: Invalid arguments - {0}")]
    InvalidArguments(String, Span), // Mismatched arity or bad argument values
    #[error("Evaluation Error: Type mismatch - expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: Value,
        span: Span,
    },
    #[error("Evaluation Error: Expected a symbol, but got: {0}")]
    NotASymbol(Node), // define target that isn't a symbol
    #[error("Evaluation Error: Invalid special form - {0}")]
    InvalidSpecialForm(String, Span), // Malformed special form (e.g., (if cond))
    #[error("Evaluation Error: Cannot apply an empty list")]
    EmptyApplication(Span),
}

impl EvalError {
    pub fn span(&self) -> Span {
        match self {
            EvalError::EnvError(EnvError::UnboundVariable(_, span))
            | EvalError::NotAProcedure(_, span)
            | EvalError::InvalidArguments(_, span)
            | EvalError::TypeMismatch { span, .. }
            | EvalError::InvalidSpecialForm(_, span)
            | EvalError::EmptyApplication(span) => *span,
            EvalError::NotASymbol(node) => node.span,
        }
    }
}

// Result type alias for convenience
pub type EvalResult<T = Value> = Result<T, EvalError>;

const IF: &str = "if";
const DEFINE: &str = "define";

/// Names handled by the evaluator itself rather than looked up.
pub fn special_form_identifiers() -> HashSet<String> {
    [IF, DEFINE].iter().map(|s| s.to_string()).collect()
}

// --- Evaluate Function ---

/// Evaluates a given AST Node within the specified environment.
///
/// Evaluation recurses on the host stack once per nesting level, so the
/// maximum depth of an expression is bounded by the thread's stack size.
pub fn evaluate(node: &Node, env: &mut Environment) -> EvalResult {
    match &node.kind {
        // Symbols: Look up in the environment
        Sexpr::Atom(Atom::Symbol(name)) => Ok(env.get(name, node.span)?),

        // Numbers evaluate to themselves
        Sexpr::Atom(Atom::Integer(n)) => Ok(Value::Integer(*n)),
        Sexpr::Atom(Atom::BigInteger(n)) => Ok(Value::BigInteger(n.clone())),
        Sexpr::Atom(Atom::Float(n)) => Ok(Value::Float(*n)),

        // Lists: special forms or procedure calls
        Sexpr::List(elements) => match elements.split_first() {
            Some((first, rest)) => match first.as_symbol() {
                Some(IF) => evaluate_if(rest, env, node.span),
                Some(DEFINE) => evaluate_define(rest, env, node.span),
                _ => evaluate_procedure(first, rest, env, node.span),
            },
            None => Err(EvalError::EmptyApplication(node.span)),
        },
    }
}

fn evaluate_procedure(
    operator: &Node,
    operands: &[Node],
    env: &mut Environment,
    span: Span,
) -> EvalResult {
    let procedure = match evaluate(operator, env)? {
        Value::Procedure(procedure) => procedure,
        other => return Err(EvalError::NotAProcedure(other, operator.span)),
    };

    let mut evaluated_args: Vec<Value> = Vec::with_capacity(operands.len());
    for operand_node in operands {
        evaluated_args.push(evaluate(operand_node, env)?);
    }

    trace!("apply {} to {} argument(s)", procedure.name(), evaluated_args.len());
    let result = procedure.call(evaluated_args, span);
    match &result {
        Ok(value) => trace!("{} returned {}", procedure.name(), value),
        Err(e) => trace!("{} failed: {}", procedure.name(), e),
    }
    result
}

fn evaluate_if(operands: &[Node], env: &mut Environment, span: Span) -> EvalResult {
    if let [condition, consequent, alternate] = operands {
        if evaluate(condition, env)?.is_truthy() {
            evaluate(consequent, env)
        } else {
            evaluate(alternate, env)
        }
    } else {
        Err(EvalError::InvalidSpecialForm(
            format!(
                "if expects a test, a consequent and an alternative, got {} operand(s)",
                operands.len()
            ),
            span, // Span of the whole (if ...) form
        ))
    }
}

fn evaluate_define(operands: &[Node], env: &mut Environment, span: Span) -> EvalResult {
    if let [target, expr] = operands {
        let name = target
            .as_symbol()
            .ok_or_else(|| EvalError::NotASymbol(target.clone()))?
            .to_string();
        let value = evaluate(expr, env)?;
        debug!("define {} as {}", name, value);
        env.define(name, value);
        Ok(Value::Void)
    } else {
        Err(EvalError::InvalidSpecialForm(
            format!(
                "define expects a symbol and an expression, got {} operand(s)",
                operands.len()
            ),
            span,
        ))
    }
}
