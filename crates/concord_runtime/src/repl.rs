//! The interactive REPL.
//!
//! Each request line is submitted to a [`QuizApp`] and its response printed
//! as JSON. Meta-commands inspect the action log, the engine trace, and the
//! provenance of individual records.

use std::fmt::Write as _;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use concord_concepts::{QuizApp, ROUTES};
use concord_engine::{EngineConfig, FlowId};
use concord_foundation::{Error, ErrorKind, Result};
use tracing::debug;

use crate::command::{Command, META_COMMANDS, METHODS};
use crate::editor::{Input, LineEditor, RustylineEditor};
use crate::json::render;
use crate::serialize::save_log;

/// What evaluating one line produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply {
    /// Text to print.
    Text(String),
    /// The user asked to leave.
    Quit,
}

/// The interactive REPL.
pub struct Repl<E: LineEditor = RustylineEditor> {
    /// The line editor for input.
    editor: E,

    /// The application requests are sent to.
    app: QuizApp,

    /// Whether to show the welcome banner.
    show_banner: bool,

    /// Primary prompt.
    prompt: String,
}

impl Repl<RustylineEditor> {
    /// Creates a REPL over a fresh application, using the rustyline editor.
    ///
    /// # Errors
    ///
    /// Returns an error if the editor fails to initialize or the application
    /// fails to register its rules.
    pub fn new(config: EngineConfig) -> Result<Self> {
        let editor = RustylineEditor::new()?;
        Ok(Self::with_editor(editor, QuizApp::new(config)?))
    }
}

impl<E: LineEditor> Repl<E> {
    /// Creates a REPL with the given editor and application.
    pub fn with_editor(mut editor: E, app: QuizApp) -> Self {
        editor.complete_with(completion_words());
        Self {
            editor,
            app,
            show_banner: true,
            prompt: "concord> ".to_string(),
        }
    }

    /// Disables the welcome banner.
    #[must_use]
    pub fn without_banner(mut self) -> Self {
        self.show_banner = false;
        self
    }

    /// Returns the application.
    #[must_use]
    pub const fn app(&self) -> &QuizApp {
        &self.app
    }

    /// Runs the REPL loop until EOF or `:quit`.
    ///
    /// # Errors
    ///
    /// Returns an error if reading input fails.
    pub fn run(&mut self) -> Result<()> {
        if self.show_banner {
            self.print_banner();
        }

        loop {
            let line = match self.editor.read(&self.prompt)? {
                Input::Line(line) => line,
                Input::Cancelled => continue,
                Input::Closed => break,
            };
            if line.trim().is_empty() {
                continue;
            }
            self.editor.remember(&line);

            match self.eval(&line) {
                Ok(Reply::Text(text)) => println!("{text}"),
                Ok(Reply::Quit) => break,
                Err(e) => print_error(&e),
            }
        }

        println!("\nGoodbye!");
        Ok(())
    }

    /// Evaluates one line.
    ///
    /// # Errors
    ///
    /// Returns an error if the line does not parse or the command fails,
    /// including a fatal error from a request's cascade.
    pub fn eval(&mut self, line: &str) -> Result<Reply> {
        let command = Command::parse(line.trim())?;
        debug!(?command, "evaluating");
        let engine = self.app.engine();

        let text = match command {
            Command::Request { method, path, body } => {
                match self.app.request(&method, &path, body)? {
                    Some(payload) => render(&payload),
                    None => "(no response)".to_string(),
                }
            }
            Command::Log(flow) => {
                let records = match flow {
                    Some(n) => engine.flow_records(FlowId(n))?,
                    None => engine.records()?,
                };
                join_lines(records.iter(), "(log is empty)")
            }
            Command::Trace(flow) => {
                let traces = engine.traces(flow.map(FlowId))?;
                let mut text = join_lines(traces.iter(), "(no trace records; try :trace on)");
                if flow.is_none() && !traces.is_empty() {
                    let stats = engine.trace_stats()?;
                    let _ = write!(
                        text,
                        "\n-- {} of at most {} events across {} flows",
                        stats.record_count, stats.max_size, stats.flow_count
                    );
                }
                text
            }
            Command::Tracing(on) => {
                engine.set_tracing(on)?;
                format!("tracing {}", if on { "on" } else { "off" })
            }
            Command::Why(seq) => engine.explain(seq)?,
            Command::Routes => ROUTES
                .iter()
                .map(|(method, template)| format!("{method:<7}{template}"))
                .collect::<Vec<_>>()
                .join("\n"),
            Command::Rules => engine
                .rule_names()?
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n"),
            Command::Export(path) => {
                save_log(engine, &path)?;
                let count = engine.with_log(concord_engine::ActionLog::len)?;
                format!("wrote {count} records to {}", path.display())
            }
            Command::Help => help_text(),
            Command::Quit => return Ok(Reply::Quit),
        };
        Ok(Reply::Text(text))
    }

    /// Evaluates every line of a file, printing replies.
    ///
    /// Blank lines and lines starting with `#` are skipped. Stops at the
    /// first failing line.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or a line fails; the
    /// message names the file and line.
    pub fn eval_file(&mut self, path: &Path) -> Result<()> {
        let source = fs::read_to_string(path).map_err(|e| {
            Error::new(ErrorKind::IoError(format!(
                "failed to read {}: {e}",
                path.display()
            )))
        })?;

        for (number, line) in source.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            match self.eval(trimmed) {
                Ok(Reply::Text(text)) => println!("{text}"),
                Ok(Reply::Quit) => break,
                Err(e) => {
                    return Err(Error::new(ErrorKind::Internal(format!(
                        "{}:{}: {e}",
                        path.display(),
                        number + 1
                    ))));
                }
            }
        }
        Ok(())
    }

    /// Prints the welcome banner.
    #[allow(clippy::unused_self)]
    fn print_banner(&self) {
        println!("\x1b[1;36mConcord\x1b[0m v{}", env!("CARGO_PKG_VERSION"));
        println!("Type requests like `POST /quizzes owner=u1 title=Foo`, or :help.\n");
        let _ = io::stdout().flush();
    }
}

fn completion_words() -> Vec<String> {
    let templates = ROUTES.iter().map(|(_, t)| (*t).to_string());
    METHODS
        .iter()
        .chain(META_COMMANDS)
        .map(|w| (*w).to_string())
        .chain(templates)
        .collect()
}

fn join_lines<T: std::fmt::Display>(items: impl Iterator<Item = T>, empty: &str) -> String {
    let mut out = String::new();
    for item in items {
        if !out.is_empty() {
            out.push('\n');
        }
        let _ = write!(out, "{item}");
    }
    if out.is_empty() {
        empty.to_string()
    } else {
        out
    }
}

fn help_text() -> String {
    "\
METHOD PATH key=value ...   submit a request (e.g. POST /quizzes owner=u1 title=Foo)
:log [FLOW]                 show the action log
:trace [FLOW]               show engine trace events
:trace on|off               start or stop tracing
:why SEQ                    explain why a record exists
:routes                     list known routes
:rules                      list registered rules
:export PATH                write the action log as MessagePack
:quit                       leave"
        .to_string()
}

/// Prints an error to stderr.
fn print_error(error: &Error) {
    eprintln!("\x1b[31mError: {error}\x1b[0m");
}
