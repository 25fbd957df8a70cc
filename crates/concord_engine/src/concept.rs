//! The concept interface consumed by the engine.
//!
//! A concept is an independent state machine. The engine only knows it
//! through named actions (state-mutating, input record to output record)
//! and named queries (read-only, argument record to rows).

use std::collections::BTreeMap;
use std::fmt;

use concord_foundation::{Error, Fields, Result};

// =============================================================================
// Action and Query References
// =============================================================================

/// Names one action of one concept.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionRef {
    /// The concept's registered name.
    pub concept: &'static str,
    /// The action name.
    pub action: &'static str,
}

impl ActionRef {
    /// Creates an action reference.
    #[must_use]
    pub const fn new(concept: &'static str, action: &'static str) -> Self {
        Self { concept, action }
    }
}

impl fmt::Display for ActionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.concept, self.action)
    }
}

/// Names one query of one concept.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryRef {
    /// The concept's registered name.
    pub concept: &'static str,
    /// The query name.
    pub query: &'static str,
}

impl QueryRef {
    /// Creates a query reference.
    #[must_use]
    pub const fn new(concept: &'static str, query: &'static str) -> Self {
        Self { concept, query }
    }
}

impl fmt::Display for QueryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.concept, self.query)
    }
}

// =============================================================================
// Concept Trait
// =============================================================================

/// An independent module exposing actions and queries.
///
/// Implementations must not know about other concepts. The engine invokes
/// each action at most once per dispatch and never retries.
pub trait Concept: Send {
    /// The name rules use to address this concept.
    fn name(&self) -> &'static str;

    /// Performs a state-mutating action and returns its output bindings.
    ///
    /// # Errors
    /// Returns an error if the action is unknown or the concept rejects the input.
    fn perform(&mut self, action: &str, input: &Fields) -> Result<Fields>;

    /// Runs a pure lookup. Zero rows is a valid answer.
    ///
    /// # Errors
    /// Returns an error if the query is unknown or its arguments are malformed.
    fn query(&self, query: &str, args: &Fields) -> Result<Vec<Fields>>;
}

// =============================================================================
// Concept Registry
// =============================================================================

/// The set of concepts an engine dispatches to, keyed by name.
#[derive(Default)]
pub struct ConceptRegistry {
    concepts: BTreeMap<&'static str, Box<dyn Concept>>,
}

impl ConceptRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a concept, replacing any concept with the same name.
    pub fn register(&mut self, concept: Box<dyn Concept>) {
        self.concepts.insert(concept.name(), concept);
    }

    /// Returns true if a concept with this name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.concepts.contains_key(name)
    }

    /// Returns the registered concept names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.concepts.keys().copied().collect()
    }

    /// Performs an action.
    ///
    /// # Errors
    /// Returns [`UnknownConcept`](concord_foundation::ErrorKind::UnknownConcept) if the
    /// concept is not registered, or wraps the concept's own error in
    /// [`ActionFailed`](concord_foundation::ErrorKind::ActionFailed).
    pub fn perform(&mut self, action: ActionRef, input: &Fields) -> Result<Fields> {
        let concept = self
            .concepts
            .get_mut(action.concept)
            .ok_or_else(|| Error::unknown_concept(action.concept))?;
        concept
            .perform(action.action, input)
            .map_err(|e| Error::action_failed(action.concept, action.action, e))
    }

    /// Runs a query.
    ///
    /// # Errors
    /// Returns an error if the concept is not registered or the query fails.
    pub fn query(&self, query: QueryRef, args: &Fields) -> Result<Vec<Fields>> {
        let concept = self
            .concepts
            .get(query.concept)
            .ok_or_else(|| Error::unknown_concept(query.concept))?;
        concept.query(query.query, args)
    }
}

impl fmt::Debug for ConceptRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConceptRegistry")
            .field("concepts", &self.names())
            .finish()
    }
}
