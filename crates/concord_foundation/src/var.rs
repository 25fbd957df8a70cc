//! Pattern variables.
//!
//! A [`Var`] is identified by a process-wide unique id, never by its name.
//! Two rules may both call a variable `request`; their variables still never
//! unify with each other.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

static NEXT_VAR_ID: AtomicU64 = AtomicU64::new(1);

/// A symbolic placeholder bound to a concrete value during matching.
#[derive(Clone)]
pub struct Var {
    id: u64,
    name: Arc<str>,
}

impl Var {
    /// Creates a variable with a fresh, never-reused identity.
    #[must_use]
    pub fn fresh(name: impl Into<Arc<str>>) -> Self {
        Self {
            id: NEXT_VAR_ID.fetch_add(1, AtomicOrdering::Relaxed),
            name: name.into(),
        }
    }

    /// Returns the variable's unique id.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Returns the display name the rule author gave this variable.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for Var {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Var {}

impl Hash for Var {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for Var {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Var {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl fmt::Debug for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}#{}", self.name, self.id)
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}", self.name)
    }
}

// =============================================================================
// Vars
// =============================================================================

/// The set of variables handed to one rule instantiation.
///
/// Asking for the same name twice returns the same variable; a new `Vars`
/// always hands out new identities.
#[derive(Debug, Default)]
pub struct Vars {
    vars: HashMap<Arc<str>, Var>,
}

impl Vars {
    /// Creates an empty variable set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the variable with this name, creating it on first use.
    pub fn var(&mut self, name: &str) -> Var {
        if let Some(var) = self.vars.get(name) {
            return var.clone();
        }
        let var = Var::fresh(name);
        self.vars.insert(var.name.clone(), var.clone());
        var
    }

    /// Returns several variables at once, in the order named.
    pub fn vars<const N: usize>(&mut self, names: [&str; N]) -> [Var; N] {
        names.map(|name| self.var(name))
    }

    /// Returns the number of distinct variables handed out.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Returns true if no variables were handed out.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}
