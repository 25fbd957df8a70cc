//! Terminal input for the REPL.
//!
//! [`Repl`](crate::Repl) is generic over [`LineEditor`]; the terminal
//! implementation is [`RustylineEditor`].

use std::borrow::Cow;

use concord_foundation::{Error, ErrorKind, Result};
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::{CmdKind, Highlighter};
use rustyline::hint::HistoryHinter;
use rustyline::history::DefaultHistory;
use rustyline::{Completer, Config, Context, Editor, Helper, Hinter, Validator};

/// One read from the terminal.
#[derive(Debug)]
pub enum Input {
    /// A submitted line, without its newline.
    Line(String),
    /// Ctrl+C; the current line is abandoned.
    Cancelled,
    /// Ctrl+D or end of input.
    Closed,
}

/// Source of REPL lines.
pub trait LineEditor {
    /// Prompts and waits for the next line.
    ///
    /// # Errors
    ///
    /// Fails when the terminal cannot be read.
    fn read(&mut self, prompt: &str) -> Result<Input>;

    /// Records a submitted line for history and hints.
    fn remember(&mut self, line: &str);

    /// Replaces the completion vocabulary.
    fn complete_with(&mut self, words: Vec<String>);
}

#[derive(Helper, Completer, Hinter, Validator)]
struct ConcordHelper {
    #[rustyline(Completer)]
    completer: WordCompleter,
    #[rustyline(Hinter)]
    hinter: HistoryHinter,
}

impl Highlighter for ConcordHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        // method or meta-command in bold
        match line.split_once(' ') {
            Some((head, rest)) => Cow::Owned(format!("\x1b[1m{head}\x1b[0m {rest}")),
            None if line.starts_with(':') => Cow::Owned(format!("\x1b[1m{line}\x1b[0m")),
            None => Cow::Borrowed(line),
        }
    }

    fn highlight_prompt<'b, 's: 'b, 'p: 'b>(
        &'s self,
        prompt: &'p str,
        default: bool,
    ) -> Cow<'b, str> {
        if default {
            Cow::Owned(format!("\x1b[1;32m{prompt}\x1b[0m"))
        } else {
            Cow::Borrowed(prompt)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _kind: CmdKind) -> bool {
        true
    }

    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Owned(format!("\x1b[2m{hint}\x1b[0m"))
    }
}

/// Completes methods, route templates, and meta-commands.
struct WordCompleter {
    words: Vec<String>,
}

impl Completer for WordCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let start = line[..pos]
            .rfind(char::is_whitespace)
            .map_or(0, |i| i + 1);
        let word = &line[start..pos];

        let candidates = self
            .words
            .iter()
            .filter(|w| w.starts_with(word))
            .map(|w| Pair {
                display: w.clone(),
                replacement: w.clone(),
            })
            .collect();
        Ok((start, candidates))
    }
}

fn terminal_error(e: ReadlineError) -> Error {
    Error::new(ErrorKind::Internal(format!("terminal: {e}")))
}

/// Interactive editor with history, hints, and completion.
pub struct RustylineEditor {
    editor: Editor<ConcordHelper, DefaultHistory>,
}

impl RustylineEditor {
    /// # Errors
    ///
    /// Fails when the terminal cannot be set up.
    pub fn new() -> Result<Self> {
        let config = Config::builder()
            .auto_add_history(false)
            .max_history_size(500)
            .map_err(terminal_error)?
            .build();

        let helper = ConcordHelper {
            completer: WordCompleter { words: Vec::new() },
            hinter: HistoryHinter::new(),
        };

        let mut editor = Editor::with_config(config).map_err(terminal_error)?;
        editor.set_helper(Some(helper));
        Ok(Self { editor })
    }
}

impl LineEditor for RustylineEditor {
    fn read(&mut self, prompt: &str) -> Result<Input> {
        match self.editor.readline(prompt) {
            Ok(line) => Ok(Input::Line(line)),
            Err(ReadlineError::Interrupted) => Ok(Input::Cancelled),
            Err(ReadlineError::Eof) => Ok(Input::Closed),
            Err(e) => Err(terminal_error(e)),
        }
    }

    fn remember(&mut self, line: &str) {
        if let Err(e) = self.editor.add_history_entry(line) {
            tracing::debug!(error = %e, "history entry dropped");
        }
    }

    fn complete_with(&mut self, words: Vec<String>) {
        if let Some(helper) = self.editor.helper_mut() {
            helper.completer.words = words;
        }
    }
}
