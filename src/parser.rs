use crate::Span;
use crate::lexer::{Token, TokenKind};
use crate::types::{Atom, Node, Sexpr};
use log::trace;
use std::iter::Peekable;
use std::vec::IntoIter; // To iterate over Vec<Token>
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("Parse Error: Unexpected token {found}, expected {expected}")]
    UnexpectedToken { found: Token, expected: String },
    #[error("Parse Error: Unexpected end of input during parsing. Expected {0}")]
    UnexpectedEof(String),
}

// Result type alias for convenience
type ParseResult<T> = Result<T, ParseError>;

pub struct Parser {
    // We iterate over owned Tokens, consuming them.
    tokens: Peekable<IntoIter<Token>>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens: tokens.into_iter().peekable(),
        }
    }

    // Consumes the next token if available.
    fn next_token(&mut self) -> Option<Token> {
        self.tokens.next()
    }

    /// Number of tokens not yet consumed.
    pub fn remaining(&self) -> usize {
        self.tokens.len()
    }

    /// Parses a single S-expression from the token stream, consuming exactly
    /// the tokens that belong to it.
    pub fn parse_expr(&mut self) -> ParseResult<Node> {
        match self.next_token() {
            Some(Token {
                kind: TokenKind::LParen,
                span,
            }) => self.parse_list(span),
            Some(
                found @ Token {
                    kind: TokenKind::RParen,
                    ..
                },
            ) => Err(ParseError::UnexpectedToken {
                found,
                expected: "an atom or '('".to_string(),
            }),
            Some(Token {
                kind: TokenKind::Atom(text),
                span,
            }) => Ok(Node::new_atom(Atom::classify(&text), span)),
            None => Err(ParseError::UnexpectedEof("an expression".to_string())), // No tokens left
        }
    }

    /// Parses the elements of a list whose '(' has already been consumed.
    fn parse_list(&mut self, open: Span) -> ParseResult<Node> {
        let mut elements = Vec::new();
        loop {
            if let Some(close) = self.tokens.next_if(|t| t.kind == TokenKind::RParen) {
                return Ok(Node::new(Sexpr::List(elements), open.merge(close.span)));
            }
            if self.tokens.peek().is_none() {
                // Reached EOF before finding ')'
                return Err(ParseError::UnexpectedEof("')'".to_string()));
            }
            elements.push(self.parse_expr()?);
        }
    }

    /// Parses the first top-level expression. Any tokens after it are left
    /// unread and dropped with the parser.
    pub fn parse(mut self) -> ParseResult<Node> {
        let expr = self.parse_expr()?;
        if self.remaining() > 0 {
            trace!(
                "ignoring {} token(s) after first expression {}",
                self.remaining(),
                expr
            );
        }
        Ok(expr)
    }
}

// Helper function to lex and parse a string directly (useful for tests and REPL)
pub fn parse_str(input: &str) -> ParseResult<Node> {
    let tokens = crate::lexer::tokenize(input);
    Parser::new(tokens).parse()
}
