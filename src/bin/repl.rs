use std::borrow::Cow;
use std::cell::RefCell;
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;

use clap::{Parser, ValueEnum};
use cylispy::evaluator::special_form_identifiers;
use cylispy::lexer::tokenize;
use cylispy::{Environment, Error, Token, TokenKind, eval_str};
use env_logger::{Builder, Env};
use log::{LevelFilter, info};
use rustyline::error::ReadlineError;
use rustyline::highlight::{CmdKind, Highlighter};
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{Cmd, Completer, Config, Context, Editor, EventHandler, KeyCode, KeyEvent, Modifiers};
use rustyline::{Helper, Highlighter, Hinter, Validator};

/// Interactive read-eval-print loop for cylispy.
#[derive(Parser, Debug)]
#[command(name = "cylispy", version, about)]
struct Options {
    /// Prompt shown before each line
    #[arg(long, default_value = "cy-lispy > ")]
    prompt: String,

    /// File the line history is loaded from and saved to
    #[arg(long, default_value = "cylispy_history.txt")]
    history: PathBuf,

    /// Do not load or save line history
    #[arg(long)]
    no_history: bool,

    /// Key bindings for line editing
    #[arg(long, value_enum, default_value_t = EditMode::Vi)]
    edit_mode: EditMode,

    /// Exit with a failure status at the first parse or evaluation error
    #[arg(long)]
    fail_fast: bool,

    /// Evaluate one expression, print its result and exit
    #[arg(short, long, value_name = "EXPR")]
    eval: Option<String>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum EditMode {
    Vi,
    Emacs,
}

impl From<EditMode> for rustyline::EditMode {
    fn from(mode: EditMode) -> Self {
        match mode {
            EditMode::Vi => rustyline::EditMode::Vi,
            EditMode::Emacs => rustyline::EditMode::Emacs,
        }
    }
}

struct LispyCompleter {
    env: Rc<RefCell<Environment>>,
}

impl rustyline::completion::Completer for LispyCompleter {
    type Candidate = String;
    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        // Only complete an atom that ends right at the cursor.
        let prefix = match tokenize(&line[..pos]).pop() {
            Some(Token {
                kind: TokenKind::Atom(text),
                span,
            }) if span.end == pos => text,
            _ => return Ok((pos, vec![])),
        };
        let mut candidates: Vec<String> = self
            .env
            .borrow()
            .get_identifiers()
            .union(&special_form_identifiers())
            .filter_map(|id| id.strip_prefix(prefix.as_str()))
            .filter(|rest| !rest.is_empty())
            .map(str::to_string)
            .collect();
        candidates.sort();
        Ok((pos, candidates))
    }
}

#[derive(Completer, Helper, Highlighter, Hinter, Validator)]
struct InputHelper {
    #[rustyline(Validator)]
    validator: ParenValidator,
    #[rustyline(Highlighter)]
    highlighter: ParenHighlighter,
    #[rustyline(Completer)]
    completer: LispyCompleter,
}

struct ParenValidator;

impl Validator for ParenValidator {
    fn validate(&self, ctx: &mut ValidationContext) -> rustyline::Result<ValidationResult> {
        let mut depth = 0usize;
        for (i, c) in ctx.input().char_indices() {
            match c {
                '(' => depth += 1,
                ')' if depth == 0 => {
                    return Ok(ValidationResult::Invalid(Some(format!(
                        "  - Unmatched ')' at position {}",
                        i
                    ))));
                }
                ')' => depth -= 1,
                _ => {}
            }
        }

        if depth > 0 {
            Ok(ValidationResult::Incomplete)
        } else {
            Ok(ValidationResult::Valid(None))
        }
    }
}

struct ParenHighlighter;

impl Highlighter for ParenHighlighter {
    fn highlight<'l>(&self, line: &'l str, pos: usize) -> Cow<'l, str> {
        let cursor = pos.checked_sub(1);
        let mut open = Vec::new();
        let mut unmatched = Vec::new();
        let mut active = None;

        for (i, c) in line.char_indices() {
            match c {
                '(' => open.push(i),
                ')' => match open.pop() {
                    Some(start) if cursor == Some(start) || cursor == Some(i) => {
                        active = Some((start, i))
                    }
                    Some(_) => {}
                    None => unmatched.push(i),
                },
                _ => {}
            }
        }

        if unmatched.is_empty() && active.is_none() {
            return Cow::Borrowed(line);
        }

        let mut highlighted = String::with_capacity(line.len() + 16);
        for (i, c) in line.char_indices() {
            if unmatched.contains(&i) {
                highlighted.push_str(&format!("\x1b[31m{}\x1b[0m", c)); // Red for unmatched closing parens
            } else if active.is_some_and(|(start, end)| i == start || i == end) {
                highlighted.push_str(&format!("\x1b[1;34m{}\x1b[0m", c)); // Blue for the pair at the cursor
            } else {
                highlighted.push(c);
            }
        }
        Cow::Owned(highlighted)
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _kind: CmdKind) -> bool {
        true
    }
}

/// Reads and evaluates one line, printing the result or a diagnostic.
fn run_line(input: &str, env: &RefCell<Environment>) -> Result<(), Error> {
    let result = eval_str(input, &mut env.borrow_mut());
    match result {
        Ok(value) => {
            if let Some(text) = value.rendering() {
                println!("{}", text);
            }
            Ok(())
        }
        Err(err) => {
            if err.pretty_print(input).is_err() {
                eprintln!("{}", err);
            }
            Err(err)
        }
    }
}

fn repl(options: &Options, env: Rc<RefCell<Environment>>) -> rustyline::Result<ExitCode> {
    println!("cylispy REPL v{}", env!("CARGO_PKG_VERSION"));
    println!("Press Ctrl-D to quit.");

    let helper = InputHelper {
        validator: ParenValidator,
        highlighter: ParenHighlighter,
        completer: LispyCompleter { env: env.clone() },
    };
    let config = Config::builder()
        .edit_mode(options.edit_mode.into())
        .build();
    let mut rl = Editor::with_config(config)?;
    rl.set_helper(Some(helper));
    rl.bind_sequence(
        KeyEvent(KeyCode::Char('s'), Modifiers::CTRL),
        EventHandler::Simple(Cmd::Newline),
    );

    let history = (!options.no_history).then_some(options.history.as_path());
    if let Some(path) = history {
        if rl.load_history(path).is_err() {
            info!("no previous history at {}", path.display());
        }
    }

    let mut status = ExitCode::SUCCESS;
    loop {
        match rl.readline(&options.prompt) {
            Ok(line) => {
                rl.add_history_entry(line.as_str())?;
                let trimmed_input = line.trim();
                if trimmed_input.is_empty() {
                    continue;
                }
                if run_line(trimmed_input, &env).is_err() && options.fail_fast {
                    status = ExitCode::FAILURE;
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("Interrupted. Press Ctrl-D to quit.");
            }
            Err(ReadlineError::Eof) => {
                println!("Exiting.");
                break;
            }
            Err(err) => {
                eprintln!("Readline Error: {:?}", err);
                status = ExitCode::FAILURE;
                break;
            }
        }
    }

    if let Some(path) = history {
        rl.save_history(path)?;
    }
    Ok(status)
}

fn main() -> ExitCode {
    Builder::from_env(Env::default().default_filter_or("warn"))
        .filter_module("rustyline", LevelFilter::Warn)
        .init();

    let options = Options::parse();
    let env = Rc::new(RefCell::new(Environment::new_global_populated()));

    if let Some(input) = &options.eval {
        return match run_line(input.trim(), &env) {
            Ok(()) => ExitCode::SUCCESS,
            Err(_) => ExitCode::FAILURE,
        };
    }

    match repl(&options, env) {
        Ok(status) => status,
        Err(err) => {
            eprintln!("Readline Error: {:?}", err);
            ExitCode::FAILURE
        }
    }
}
