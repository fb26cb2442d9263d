use logos::Logos;
use std::fmt;

use crate::Span;

/// Lexeme kinds. Parentheses are always structural, everything else is a
/// maximal run of non-whitespace, non-parenthesis characters.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"\s+")] // Skip whitespace
pub enum TokenKind {
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[regex(r"[^\s()]+", |lex| lex.slice().to_string())]
    Atom(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    /// The source text of this lexeme.
    pub fn text(&self) -> String {
        self.kind.to_string()
    }
}

// Implement Display for easy printing
impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::LParen => write!(f, "("),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::Atom(s) => write!(f, "{}", s),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' at {}", self.kind, self.span)
    }
}

/// Splits `input` into lexemes. Never fails: the empty or blank input
/// yields an empty vector, and any text logos cannot match is kept as an
/// atom lexeme verbatim.
pub fn tokenize(input: &str) -> Vec<Token> {
    let mut lexer = TokenKind::lexer(input);
    let mut tokens = Vec::new();
    while let Some(result) = lexer.next() {
        let span = Span::from(lexer.span());
        let kind = result.unwrap_or_else(|_| TokenKind::Atom(lexer.slice().to_string()));
        tokens.push(Token { kind, span });
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    // Helper to simplify testing token sequences
    fn assert_tokens(input: &str, expected: Vec<&str>) {
        let texts: Vec<String> = tokenize(input).iter().map(Token::text).collect();
        assert_eq!(texts, expected, "Input: '{}'", input);
    }

    fn atom(s: &str) -> TokenKind {
        TokenKind::Atom(s.to_string())
    }

    #[test]
    fn test_empty_input() {
        assert_tokens("", vec![]);
        assert_tokens("   \t\n ", vec![]);
    }

    #[test]
    fn test_simple_application() {
        assert_tokens("(+ 1 2)", vec!["(", "+", "1", "2", ")"]);
    }

    #[test]
    fn test_parentheses_need_no_padding() {
        assert_tokens("()", vec!["(", ")"]);
        assert_tokens("((a)b)", vec!["(", "(", "a", ")", "b", ")"]);
        assert_tokens("foo(bar)baz", vec!["foo", "(", "bar", ")", "baz"]);
    }

    #[test]
    fn test_sequences_and_whitespace() {
        assert_tokens(
            "  ( define x 10 )  ",
            vec!["(", "define", "x", "10", ")"],
        );
        assert_tokens("(a\tb\nc\r\nd)", vec!["(", "a", "b", "c", "d", ")"]);
    }

    #[test]
    fn test_no_comment_or_string_syntax() {
        // Quotes and semicolons are ordinary characters; parens inside them still split.
        assert_tokens("\"a(b\"", vec!["\"a", "(", "b\""]);
        assert_tokens("; not a comment", vec![";", "not", "a", "comment"]);
        assert_tokens("'x `y ,z", vec!["'x", "`y", ",z"]);
    }

    #[test]
    fn test_kinds() {
        let kinds: Vec<TokenKind> = tokenize("(car xs)").into_iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![TokenKind::LParen, atom("car"), atom("xs"), TokenKind::RParen]
        );
    }

    #[test]
    fn test_unicode_atoms() {
        assert_tokens("(λ 🍕+☕)", vec!["(", "λ", "🍕+☕", ")"]);
    }

    #[test]
    fn test_tokenize_spans() {
        // Verify spans manually for a simple case
        let tokens = tokenize("(+ 1)");

        assert_eq!(tokens.len(), 4);

        assert_eq!(tokens[0].kind, TokenKind::LParen);
        assert_eq!(tokens[0].span, Span { start: 0, end: 1 });

        assert_eq!(tokens[1].kind, atom("+"));
        assert_eq!(tokens[1].span, Span { start: 1, end: 2 });

        assert_eq!(tokens[2].kind, atom("1"));
        assert_eq!(tokens[2].span, Span { start: 3, end: 4 });

        assert_eq!(tokens[3].kind, TokenKind::RParen);
        assert_eq!(tokens[3].span, Span { start: 4, end: 5 });
    }

    #[test]
    fn test_token_display() {
        let tokens = tokenize(" )");
        assert_eq!(tokens[0].to_string(), "')' at 1..2");
    }
}
