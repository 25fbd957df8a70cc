//! Errors fatal to a wave.
//!
//! Non-firing outcomes (match failure, guard drop, binding conflict) are not
//! errors and never appear here; only conditions fatal to a wave do.

use std::fmt;

use thiserror::Error;

use crate::types::Type;

/// An [`ErrorKind`] plus where it happened, when known.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct Error {
    /// What went wrong.
    pub kind: ErrorKind,
    /// Filled in by the engine once the failing rule is known.
    pub context: Option<ErrorContext>,
}

impl Error {
    /// Wraps a kind with no location yet.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// Attaches (or replaces) the location.
    #[must_use]
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    /// A field held the wrong type of value.
    #[must_use]
    pub fn type_mismatch(expected: Type, actual: Type) -> Self {
        Self::new(ErrorKind::TypeMismatch { expected, actual })
    }

    /// A required field was absent.
    #[must_use]
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::new(ErrorKind::MissingField(field.into()))
    }

    /// No concept is registered under `concept`.
    #[must_use]
    pub fn unknown_concept(concept: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownConcept(concept.into()))
    }

    /// `concept` has no action named `action`.
    #[must_use]
    pub fn unknown_action(concept: impl Into<String>, action: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownAction {
            concept: concept.into(),
            action: action.into(),
        })
    }

    /// `concept` has no query named `query`.
    #[must_use]
    pub fn unknown_query(concept: impl Into<String>, query: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownQuery {
            concept: concept.into(),
            query: query.into(),
        })
    }

    /// A quiz, question, option, or activation id that does not resolve.
    #[must_use]
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound {
            kind,
            id: id.into(),
        })
    }

    /// A concept rejected its input.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument(message.into()))
    }

    /// Wraps a concept's own error as a failed action.
    #[must_use]
    pub fn action_failed(
        concept: impl Into<String>,
        action: impl Into<String>,
        source: Error,
    ) -> Self {
        Self::new(ErrorKind::ActionFailed {
            concept: concept.into(),
            action: action.into(),
            source: Box::new(source),
        })
    }

    /// A follow-up read a variable nothing bound.
    #[must_use]
    pub fn unbound_variable(name: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnboundVariable(name.into()))
    }

    /// A rule failed validation at registration.
    #[must_use]
    pub fn invalid_rule(rule: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRule {
            rule: rule.into(),
            reason: reason.into(),
        })
    }

    /// A cascade limit tripped.
    #[must_use]
    pub fn limit_exceeded(limit: SemanticLimit) -> Self {
        Self::new(ErrorKind::LimitExceeded(limit))
    }

    /// A broken invariant or environment failure.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal(message.into()))
    }

    /// True when a concept, not the engine, produced the error.
    #[must_use]
    pub fn is_action_failure(&self) -> bool {
        matches!(self.kind, ErrorKind::ActionFailed { .. })
    }

    /// True when a cascade limit cut the flow short.
    #[must_use]
    pub fn is_limit_exceeded(&self) -> bool {
        matches!(self.kind, ErrorKind::LimitExceeded(_))
    }
}

/// What went wrong.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// A field held a value of the wrong type.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// The expected type.
        expected: Type,
        /// The actual type encountered.
        actual: Type,
    },

    /// A required field was absent from a record.
    #[error("missing field: {0}")]
    MissingField(String),

    /// No concept is registered under this name.
    #[error("unknown concept: {0}")]
    UnknownConcept(String),

    /// The concept has no action with this name.
    #[error("unknown action: {concept}.{action}")]
    UnknownAction {
        /// The concept that was addressed.
        concept: String,
        /// The action name that was not found.
        action: String,
    },

    /// The concept has no query with this name.
    #[error("unknown query: {concept}.{query}")]
    UnknownQuery {
        /// The concept that was addressed.
        concept: String,
        /// The query name that was not found.
        query: String,
    },

    /// A concept-level entity does not exist.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// What kind of entity was looked up.
        kind: &'static str,
        /// The identifier that was not found.
        id: String,
    },

    /// A concept rejected its input.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A concept action failed while being dispatched.
    #[error("action {concept}.{action} failed: {source}")]
    ActionFailed {
        /// The concept whose action failed.
        concept: String,
        /// The action that failed.
        action: String,
        /// The concept's own error.
        #[source]
        source: Box<Error>,
    },

    /// A variable was read before anything bound it.
    #[error("unbound variable: {0}")]
    UnboundVariable(String),

    /// A rule failed validation at registration.
    #[error("invalid rule {rule}: {reason}")]
    InvalidRule {
        /// The rule name.
        rule: String,
        /// Why the rule was rejected.
        reason: String,
    },

    /// A cascade limit was hit.
    #[error("limit exceeded: {0}")]
    LimitExceeded(SemanticLimit),

    /// Encoding or decoding failed.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// I/O failed.
    #[error("io error: {0}")]
    IoError(String),

    /// A broken engine invariant or a terminal failure.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Bounds on a single cascade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SemanticLimit {
    /// A cascade ran more waves than allowed.
    MaxCascadeDepth {
        /// The configured limit.
        limit: u32,
        /// The flow whose cascade was cut off.
        flow: u64,
    },
    /// A single flow fired more rule activations than allowed.
    MaxFirings {
        /// The configured limit.
        limit: usize,
        /// The flow whose cascade was cut off.
        flow: u64,
    },
}

impl fmt::Display for SemanticLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MaxCascadeDepth { limit, flow } => {
                write!(f, "max cascade depth ({limit}) exceeded in flow {flow}")
            }
            Self::MaxFirings { limit, flow } => {
                write!(f, "max firings ({limit}) exceeded in flow {flow}")
            }
        }
    }
}

/// Where a wave failed.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// Rule (or entry point) that was executing.
    pub source: Option<String>,
    /// Stack of enclosing scopes, innermost first.
    pub stack: Vec<String>,
}

impl ErrorContext {
    /// An empty location.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Names the rule or entry point.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Pushes an enclosing scope, such as `flow-3, wave 2`.
    #[must_use]
    pub fn with_frame(mut self, frame: impl Into<String>) -> Self {
        self.stack.push(frame.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(source) = &self.source {
            write!(f, "at {source}")?;
        }
        if !self.stack.is_empty() {
            writeln!(f)?;
            for frame in &self.stack {
                writeln!(f, "  in {frame}")?;
            }
        }
        Ok(())
    }
}
