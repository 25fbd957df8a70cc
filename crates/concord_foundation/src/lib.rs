//! Core values, variables, binding frames, and errors for Concord.
//!
//! This crate provides:
//! - [`Value`] - The concrete data carried by action records and frames
//! - [`Fields`] - Persistent, key-ordered records of named values
//! - [`Var`] / [`Vars`] - Identity-based pattern variables
//! - [`Frame`] - Immutable variable bindings produced during matching
//! - [`Error`] - Rich error types with context

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod collections;
pub mod error;
pub mod frame;
pub mod types;
pub mod value;
pub mod var;

pub use collections::{Fields, List};
pub use error::{Error, ErrorContext, ErrorKind, SemanticLimit};
pub use frame::Frame;
pub use types::Type;
pub use value::Value;
pub use var::{Var, Vars};

/// Result type alias using Concord's Error.
pub type Result<T> = std::result::Result<T, Error>;
