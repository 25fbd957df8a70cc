//! Persistent collections with structural sharing.
//!
//! These are thin wrappers around the `im` crate's persistent data structures.
//! [`Fields`] is the record type carried by every action input, action output,
//! and query row.

use std::fmt;
use std::iter::FromIterator;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::value::Value;
use crate::Result;

// =============================================================================
// List
// =============================================================================

/// Persistent list with structural sharing.
///
/// Cloning is O(1). Modifications return a new list sharing structure
/// with the original.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct List<T: Clone>(im::Vector<T>);

impl<T: Clone> List<T> {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self(im::Vector::new())
    }

    /// Returns the number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Gets an element by index.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.0.get(index)
    }

    /// Returns a new list with the element appended.
    #[must_use]
    pub fn push_back(&self, value: T) -> Self {
        let mut new = self.0.clone();
        new.push_back(value);
        Self(new)
    }

    /// Returns an iterator over the elements.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.0.iter()
    }
}

impl<T: Clone + fmt::Debug> fmt::Debug for List<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}

impl<T: Clone> FromIterator<T> for List<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a, T: Clone> IntoIterator for &'a List<T> {
    type Item = &'a T;
    type IntoIter = im::vector::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// =============================================================================
// Fields
// =============================================================================

/// A persistent record of named values, ordered by field name.
///
/// Iteration order is always sorted by key, which keeps record display and
/// hashing deterministic regardless of insertion order.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Fields(im::OrdMap<Arc<str>, Value>);

impl Fields {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self(im::OrdMap::new())
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the record has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Gets a field's value.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Returns true if the field is present.
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Returns a new record with the field set.
    #[must_use]
    pub fn insert(&self, field: impl Into<Arc<str>>, value: impl Into<Value>) -> Self {
        Self(self.0.update(field.into(), value.into()))
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, field: impl Into<Arc<str>>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    /// Returns a new record without the field.
    #[must_use]
    pub fn remove(&self, field: &str) -> Self {
        Self(self.0.without(field))
    }

    /// Iterates fields in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&Arc<str>, &Value)> {
        self.0.iter()
    }

    /// Iterates field names in key order.
    pub fn keys(&self) -> impl Iterator<Item = &Arc<str>> {
        self.0.keys()
    }

    /// Gets a field or fails with [`ErrorKind::MissingField`](crate::ErrorKind::MissingField).
    ///
    /// # Errors
    /// Returns an error if the field is absent.
    pub fn require(&self, field: &str) -> Result<&Value> {
        self.get(field).ok_or_else(|| Error::missing_field(field))
    }

    /// Gets a string field.
    ///
    /// # Errors
    /// Returns an error if the field is absent or not a string.
    pub fn get_str(&self, field: &str) -> Result<&str> {
        let value = self.require(field)?;
        value
            .as_str()
            .ok_or_else(|| Error::type_mismatch(crate::Type::String, value.value_type()))
    }

    /// Gets an integer field.
    ///
    /// # Errors
    /// Returns an error if the field is absent or not an integer.
    pub fn get_int(&self, field: &str) -> Result<i64> {
        let value = self.require(field)?;
        value
            .as_int()
            .ok_or_else(|| Error::type_mismatch(crate::Type::Int, value.value_type()))
    }

    /// Gets a boolean field.
    ///
    /// # Errors
    /// Returns an error if the field is absent or not a boolean.
    pub fn get_bool(&self, field: &str) -> Result<bool> {
        let value = self.require(field)?;
        value
            .as_bool()
            .ok_or_else(|| Error::type_mismatch(crate::Type::Bool, value.value_type()))
    }
}

impl fmt::Debug for Fields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.iter()).finish()
    }
}

impl fmt::Display for Fields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (k, v)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{k}: {v}")?;
        }
        write!(f, "}}")
    }
}

impl<K: Into<Arc<str>>, V: Into<Value>> FromIterator<(K, V)> for Fields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Builds a [`Fields`] record from `"name" => value` pairs.
///
/// ```
/// use concord_foundation::{fields, Value};
///
/// let input = fields! { "owner" => "u1", "title" => "Foo" };
/// assert_eq!(input.get("owner"), Some(&Value::from("u1")));
/// ```
#[macro_export]
macro_rules! fields {
    () => {
        $crate::Fields::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {
        $crate::Fields::new()$(.with($key, $value))+
    };
}
