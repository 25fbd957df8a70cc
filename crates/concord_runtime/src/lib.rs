//! REPL, CLI, JSON rendering, and action log export for Concord.
//!
//! This crate provides:
//! - [`Repl`] - Interactive request loop over a [`QuizApp`](concord_concepts::QuizApp)
//! - [`Command`] - Parsing of request lines and meta-commands
//! - [`json`] - Conversion between values and JSON
//! - [`serialize`] - Action log export and import as `MessagePack`

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod command;
pub mod editor;
pub mod json;
pub mod repl;
pub mod serialize;

pub use command::Command;
pub use editor::{Input, LineEditor, RustylineEditor};
pub use repl::{Repl, Reply};
pub use serialize::{LogSnapshot, load_log, save_log};
