use crate::{EnvError, Error, EvalError, ParseError};
use ariadne::{Config, IndexType, Label, Report, ReportKind, Source};
use std::io;
use std::ops::Range;

const SOURCE_ID: &str = "REPL";

pub type Diagnostic = Report<'static, (&'static str, Range<usize>)>;

// Spans are byte offsets into the line.
fn config() -> Config {
    Config::default().with_index_type(IndexType::Byte)
}

impl EvalError {
    /// Writes a report pointing into `input` to stderr.
    pub fn pretty_print(&self, input: &str) -> io::Result<()> {
        self.report().eprint((SOURCE_ID, Source::from(input)))
    }

    pub fn report(&self) -> Diagnostic {
        let span = self.span().to_range();
        let report = match self {
            EvalError::EnvError(EnvError::UnboundVariable(symbol, _)) => {
                Report::build(ReportKind::Error, (SOURCE_ID, span.clone()))
                    .with_message(format!("Unbound symbol `{}`", symbol))
                    .with_label(
                        Label::new((SOURCE_ID, span))
                            .with_message("This symbol is not defined in the environment"),
                    )
            }
            EvalError::NotAProcedure(value, _) => {
                Report::build(ReportKind::Error, (SOURCE_ID, span.clone()))
                    .with_message(format!("Not a procedure: {}", value))
                    .with_label(Label::new((SOURCE_ID, span)).with_message(format!(
                        "This evaluates to a {}, which cannot be called",
                        value.type_name()
                    )))
            }
            EvalError::InvalidArguments(message, _) => {
                Report::build(ReportKind::Error, (SOURCE_ID, span.clone()))
                    .with_message("Invalid arguments:")
                    .with_label(Label::new((SOURCE_ID, span)).with_message(message))
            }
            EvalError::TypeMismatch {
                expected, found, ..
            } => Report::build(ReportKind::Error, (SOURCE_ID, span.clone()))
                .with_message("Type mismatch")
                .with_label(Label::new((SOURCE_ID, span)).with_message(format!(
                    "Expected {}, found {} `{}`",
                    expected,
                    found.type_name(),
                    found
                ))),
            EvalError::NotASymbol(node) => {
                Report::build(ReportKind::Error, (SOURCE_ID, span.clone()))
                    .with_message(format!("Not a symbol: {}", node))
                    .with_label(
                        Label::new((SOURCE_ID, span))
                            .with_message("define can only bind a symbol"),
                    )
            }
            EvalError::InvalidSpecialForm(message, _) => {
                Report::build(ReportKind::Error, (SOURCE_ID, span.clone()))
                    .with_message(format!("Invalid special form: {}", message))
                    .with_label(
                        Label::new((SOURCE_ID, span))
                            .with_message("This special form is malformed or incomplete"),
                    )
            }
            EvalError::EmptyApplication(_) => {
                Report::build(ReportKind::Error, (SOURCE_ID, span.clone()))
                    .with_message("Empty application")
                    .with_label(
                        Label::new((SOURCE_ID, span))
                            .with_message("There is no procedure to call in an empty list"),
                    )
            }
        };
        report.with_config(config()).finish()
    }
}

impl ParseError {
    /// Writes a report pointing into `input` to stderr.
    pub fn pretty_print(&self, input: &str) -> io::Result<()> {
        self.report(input).eprint((SOURCE_ID, Source::from(input)))
    }

    /// Builds the report; `input` locates the end of the line.
    pub fn report(&self, input: &str) -> Diagnostic {
        let report = match self {
            ParseError::UnexpectedToken { found, expected } => {
                Report::build(ReportKind::Error, (SOURCE_ID, found.span.to_range()))
                    .with_message(format!("Unexpected token: {}", found.kind))
                    .with_label(
                        Label::new((SOURCE_ID, found.span.to_range()))
                            .with_message(format!("Expected {expected}")),
                    )
            }
            ParseError::UnexpectedEof(expected) => {
                let idx = input.len();
                Report::build(ReportKind::Error, (SOURCE_ID, idx..idx))
                    .with_message("Unexpected end of input")
                    .with_label(
                        Label::new((SOURCE_ID, idx..idx)).with_message(format!("Expected {expected}")),
                    )
            }
        };
        report.with_config(config()).finish()
    }
}

impl Error {
    pub fn pretty_print(&self, input: &str) -> io::Result<()> {
        match self {
            Error::Parse(e) => e.pretty_print(input),
            Error::Eval(e) => e.pretty_print(input),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Environment, eval_str};

    fn render(report: &Diagnostic, input: &str) -> String {
        let mut out = Vec::new();
        report
            .write((SOURCE_ID, Source::from(input)), &mut out)
            .expect("report renders");
        strip_ansi(&String::from_utf8(out).expect("utf-8 output"))
    }

    fn strip_ansi(text: &str) -> String {
        let mut plain = String::with_capacity(text.len());
        let mut chars = text.chars();
        while let Some(c) = chars.next() {
            if c == '\x1b' {
                for c in chars.by_ref() {
                    if c == 'm' {
                        break;
                    }
                }
            } else {
                plain.push(c);
            }
        }
        plain
    }

    // Column of the label underline, counted in chars from the margin bar.
    fn underline_column(rendered: &str, input: &str) -> (usize, usize) {
        let lines: Vec<&str> = rendered.lines().collect();
        let source_at = lines
            .iter()
            .position(|line| line.contains(input))
            .expect("source line is shown");
        let column = |line: &str, found: usize| {
            let bar = line.chars().position(|c| c == '│').expect("margin bar");
            found - bar
        };
        let source_line = lines[source_at];
        let target = source_line.find("zzz").expect("target in source line");
        let target_col = column(source_line, source_line[..target].chars().count());
        let underline = lines[source_at + 1];
        let mark = underline
            .chars()
            .position(|c| c == '─' || c == '┬')
            .expect("underline drawn");
        (target_col, column(underline, mark))
    }

    #[test]
    fn test_labels_use_byte_offsets_on_non_ascii_lines() {
        let input = "(+ λλ zzz)";
        let mut env = Environment::new_global_populated();
        env.define("λλ".to_string(), crate::Value::Integer(1));
        let err = match eval_str(input, &mut env) {
            Err(Error::Eval(err)) => err,
            other => panic!("expected an evaluation error, got {:?}", other),
        };
        assert_eq!(&input[err.span().to_range()], "zzz");

        let rendered = render(&err.report(), input);
        assert!(rendered.contains("Unbound symbol `zzz`"), "{}", rendered);
        let (target, underline) = underline_column(&rendered, input);
        assert_eq!(target, underline, "{}", rendered);
    }

    #[test]
    fn test_eof_report_points_past_the_input() {
        let input = "(car (list λ";
        let err = match crate::parse_str(input) {
            Err(err) => err,
            Ok(node) => panic!("expected a parse error, got {}", node),
        };
        let rendered = render(&err.report(input), input);
        assert!(rendered.contains("Unexpected end of input"), "{}", rendered);
        assert!(rendered.contains("Expected ')'"), "{}", rendered);
    }
}
