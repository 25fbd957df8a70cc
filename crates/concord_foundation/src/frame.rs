//! Binding frames.
//!
//! A [`Frame`] maps variables to concrete values. Frames are immutable:
//! binding or unifying returns a new frame that shares structure with the
//! original, so partial frames can be forked freely during a join.

use std::fmt;

use crate::error::Error;
use crate::value::Value;
use crate::var::Var;
use crate::Result;

/// An immutable set of variable bindings representing one candidate match.
///
/// The empty frame means "no knowledge yet" and matches vacuously.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Frame(im::HashMap<Var, Value>);

impl Frame {
    /// Creates an empty frame.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of bound variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Gets the value bound to a variable.
    #[must_use]
    pub fn get(&self, var: &Var) -> Option<&Value> {
        self.0.get(var)
    }

    /// Returns true if the variable is bound.
    #[must_use]
    pub fn is_bound(&self, var: &Var) -> bool {
        self.0.contains_key(var)
    }

    /// Gets a bound value or fails with an unbound-variable error.
    ///
    /// # Errors
    /// Returns an error if the variable is not bound in this frame.
    pub fn require(&self, var: &Var) -> Result<&Value> {
        self.get(var)
            .ok_or_else(|| Error::unbound_variable(var.to_string()))
    }

    /// Gets a bound string value.
    ///
    /// # Errors
    /// Returns an error if the variable is unbound or not bound to a string.
    pub fn require_str(&self, var: &Var) -> Result<&str> {
        let value = self.require(var)?;
        value
            .as_str()
            .ok_or_else(|| Error::type_mismatch(crate::Type::String, value.value_type()))
    }

    /// Returns a new frame with `var` bound to `value`, replacing any previous binding.
    #[must_use]
    pub fn bind(&self, var: &Var, value: impl Into<Value>) -> Self {
        Self(self.0.update(var.clone(), value.into()))
    }

    /// Unifies `var` with `value`.
    ///
    /// If `var` is unbound, returns a new frame binding it. If it is already
    /// bound to an equal value, returns an unchanged copy. If it is bound to a
    /// different value, the candidate is rejected and `None` is returned.
    #[must_use]
    pub fn unify(&self, var: &Var, value: &Value) -> Option<Self> {
        match self.0.get(var) {
            Some(existing) if existing == value => Some(self.clone()),
            Some(_) => None,
            None => Some(Self(self.0.update(var.clone(), value.clone()))),
        }
    }

    /// Iterates bindings in variable-creation order.
    pub fn iter(&self) -> impl Iterator<Item = (&Var, &Value)> {
        let mut entries: Vec<_> = self.0.iter().collect();
        entries.sort_by(|(a, _), (b, _)| a.cmp(b));
        entries.into_iter()
    }

    /// Snapshot of bindings as `(name, value)` pairs, for tracing.
    #[must_use]
    pub fn to_named_vec(&self) -> Vec<(String, Value)> {
        self.iter()
            .map(|(var, value)| (var.name().to_string(), value.clone()))
            .collect()
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl FromIterator<(Var, Value)> for Frame {
    fn from_iter<I: IntoIterator<Item = (Var, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
