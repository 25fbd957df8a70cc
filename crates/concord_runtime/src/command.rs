//! Parsing of REPL input lines.
//!
//! A line is either a request, `METHOD PATH key=value ...`, or a
//! meta-command starting with `:`. Values may be quoted to include spaces.

use std::path::PathBuf;

use concord_foundation::{Error, Fields, Result};

use crate::json::parse_arg;

/// One parsed input line.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Submit a request.
    Request {
        /// HTTP-style method, upper-cased.
        method: String,
        /// Concrete path.
        path: String,
        /// Body fields from `key=value` arguments.
        body: Fields,
    },
    /// Print the retained action log, or one flow of it.
    Log(Option<u64>),
    /// Print the engine trace, or one flow of it.
    Trace(Option<u64>),
    /// `:trace on` / `:trace off`.
    Tracing(bool),
    /// Explain why a record exists.
    Why(u64),
    /// List the known routes.
    Routes,
    /// List the registered rules.
    Rules,
    /// Write the action log to a file.
    Export(PathBuf),
    /// Print help.
    Help,
    /// Leave the REPL.
    Quit,
}

/// Methods accepted at the start of a request line.
pub const METHODS: &[&str] = &["GET", "POST", "PATCH", "DELETE", "PUT"];

/// Meta-commands, for completion and help.
pub const META_COMMANDS: &[&str] = &[
    ":log", ":trace", ":why", ":routes", ":rules", ":export", ":help", ":quit",
];

impl Command {
    /// Parses one non-empty line.
    ///
    /// # Errors
    /// Returns an error for an unknown method or meta-command, a missing or
    /// malformed argument, or an unterminated quote.
    pub fn parse(line: &str) -> Result<Self> {
        let words = split_words(line)?;
        let Some((head, args)) = words.split_first() else {
            return Err(Error::invalid_argument("empty command"));
        };

        if head.starts_with(':') {
            return parse_meta(head, args);
        }

        let method = head.to_ascii_uppercase();
        if !METHODS.contains(&method.as_str()) {
            return Err(Error::invalid_argument(format!("unknown method: {head}")));
        }
        let Some((path, pairs)) = args.split_first() else {
            return Err(Error::invalid_argument(format!("{method} requires a path")));
        };
        if !path.starts_with('/') {
            return Err(Error::invalid_argument(format!("path must start with '/': {path}")));
        }

        let mut body = Fields::new();
        for pair in pairs {
            let Some((key, value)) = pair.split_once('=') else {
                return Err(Error::invalid_argument(format!("expected key=value, got {pair}")));
            };
            body = body.with(key, parse_arg(value));
        }

        Ok(Self::Request {
            method,
            path: path.clone(),
            body,
        })
    }
}

fn parse_meta(head: &str, args: &[String]) -> Result<Command> {
    let flow = || -> Result<Option<u64>> { args.first().map(|a| parse_number(a)).transpose() };
    match head {
        ":log" => Ok(Command::Log(flow()?)),
        ":trace" => match args.first().map(String::as_str) {
            Some("on") => Ok(Command::Tracing(true)),
            Some("off") => Ok(Command::Tracing(false)),
            _ => Ok(Command::Trace(flow()?)),
        },
        ":why" => {
            let seq = args
                .first()
                .ok_or_else(|| Error::invalid_argument(":why requires a sequence number"))?;
            Ok(Command::Why(parse_number(seq)?))
        }
        ":routes" => Ok(Command::Routes),
        ":rules" => Ok(Command::Rules),
        ":export" => {
            let path = args
                .first()
                .ok_or_else(|| Error::invalid_argument(":export requires a path"))?;
            Ok(Command::Export(PathBuf::from(path)))
        }
        ":help" | ":h" => Ok(Command::Help),
        ":quit" | ":q" | ":exit" => Ok(Command::Quit),
        _ => Err(Error::invalid_argument(format!("unknown command: {head}"))),
    }
}

fn parse_number(text: &str) -> Result<u64> {
    text.trim_start_matches('#')
        .parse()
        .map_err(|_| Error::invalid_argument(format!("not a number: {text}")))
}

/// Splits on whitespace, keeping double-quoted spans together.
///
/// Quotes are kept inside `key="a b"` so the value still reads as a JSON string.
fn split_words(line: &str) -> Result<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;
    let mut escape_next = false;

    for c in line.chars() {
        if escape_next {
            current.push(c);
            escape_next = false;
            continue;
        }
        match c {
            '\\' if in_quote => {
                current.push(c);
                escape_next = true;
            }
            '"' => {
                in_quote = !in_quote;
                current.push(c);
            }
            c if c.is_whitespace() && !in_quote => {
                if !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }

    if in_quote {
        return Err(Error::invalid_argument("unterminated quote"));
    }
    if !current.is_empty() {
        words.push(current);
    }
    Ok(words)
}
