//! Guard and query execution.
//!
//! A guard receives the candidate frames of one rule activation and returns
//! the frames that survive, possibly enriched with query rows or derived
//! values. Returning fewer frames is a silent drop, not an error.

use std::sync::Arc;

use concord_foundation::{Error, Fields, Frame, Result, Value, Var};

use crate::concept::{ConceptRegistry, QueryRef};
use crate::pattern::Term;

// =============================================================================
// Guard Context
// =============================================================================

/// Read-only access to concepts while a guard runs.
///
/// Guards can only query; actions require the dispatcher's exclusive access.
#[derive(Clone, Copy, Debug)]
pub struct GuardContext<'a> {
    concepts: &'a ConceptRegistry,
}

impl<'a> GuardContext<'a> {
    /// Creates a context over a concept registry.
    #[must_use]
    pub fn new(concepts: &'a ConceptRegistry) -> Self {
        Self { concepts }
    }

    /// Runs a query directly.
    ///
    /// # Errors
    /// Returns an error if the concept or query is unknown or the query fails.
    pub fn query(&self, query: QueryRef, args: &Fields) -> Result<Vec<Fields>> {
        self.concepts.query(query, args)
    }
}

// =============================================================================
// Frames
// =============================================================================

/// An ordered sequence of candidate frames.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Frames(Vec<Frame>);

impl Frames {
    /// Creates an empty sequence.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a sequence holding one frame.
    #[must_use]
    pub fn single(frame: Frame) -> Self {
        Self(vec![frame])
    }

    /// Returns the number of frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if every frame was dropped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates the frames in order.
    pub fn iter(&self) -> impl Iterator<Item = &Frame> {
        self.0.iter()
    }

    /// Transforms each frame.
    #[must_use]
    pub fn map(self, f: impl FnMut(Frame) -> Frame) -> Self {
        Self(self.0.into_iter().map(f).collect())
    }

    /// Transforms each frame with a fallible function.
    ///
    /// # Errors
    /// Returns the first error produced by `f`.
    pub fn try_map(self, f: impl FnMut(Frame) -> Result<Frame>) -> Result<Self> {
        self.0.into_iter().map(f).collect::<Result<_>>().map(Self)
    }

    /// Keeps the frames for which `keep` returns true.
    #[must_use]
    pub fn filter(self, mut keep: impl FnMut(&Frame) -> bool) -> Self {
        Self(self.0.into_iter().filter(|frame| keep(frame)).collect())
    }

    /// Transforms each frame, dropping those mapped to `None`.
    #[must_use]
    pub fn filter_map(self, f: impl FnMut(Frame) -> Option<Frame>) -> Self {
        Self(self.0.into_iter().filter_map(f).collect())
    }

    /// Fallible [`filter_map`](Self::filter_map).
    ///
    /// # Errors
    /// Returns the first error produced by `f`.
    pub fn try_filter_map(self, mut f: impl FnMut(Frame) -> Result<Option<Frame>>) -> Result<Self> {
        let mut out = Vec::with_capacity(self.0.len());
        for frame in self.0 {
            if let Some(next) = f(frame)? {
                out.push(next);
            }
        }
        Ok(Self(out))
    }

    /// Relational join of every frame against a query.
    ///
    /// For each frame, `args` are evaluated (variables must be bound) and the
    /// query is run once. Each returned row yields one output frame with the
    /// `outputs` fields bound to the given variables. A frame whose query
    /// returns no rows is dropped; a row that lacks an output field or
    /// conflicts with an existing binding is skipped.
    ///
    /// # Errors
    /// Returns an error if an argument variable is unbound or the query fails.
    pub fn query(
        self,
        ctx: &GuardContext<'_>,
        query: QueryRef,
        args: &[(&str, Term)],
        outputs: &[(&str, &Var)],
    ) -> Result<Self> {
        let mut out = Vec::with_capacity(self.0.len());
        for frame in self.0 {
            let mut arg_fields = Fields::new();
            for (field, term) in args {
                let value = match term {
                    Term::Lit(v) => v.clone(),
                    Term::Var(var) => frame.require(var)?.clone(),
                };
                arg_fields = arg_fields.with(Arc::<str>::from(*field), value);
            }

            for row in ctx.query(query, &arg_fields)? {
                if let Some(joined) = splice_row(&frame, &row, outputs) {
                    out.push(joined);
                }
            }
        }
        Ok(Self(out))
    }

    /// Binds `var` in every frame to a value computed from that frame.
    ///
    /// # Errors
    /// Returns the first error produced by `f`.
    pub fn derive(self, var: &Var, mut f: impl FnMut(&Frame) -> Result<Value>) -> Result<Self> {
        self.try_map(|frame| {
            let value = f(&frame)?;
            Ok(frame.bind(var, value))
        })
    }
}

fn splice_row(frame: &Frame, row: &Fields, outputs: &[(&str, &Var)]) -> Option<Frame> {
    let mut frame = frame.clone();
    for (field, var) in outputs {
        frame = frame.unify(var, row.get(field)?)?;
    }
    Some(frame)
}

impl From<Vec<Frame>> for Frames {
    fn from(frames: Vec<Frame>) -> Self {
        Self(frames)
    }
}

impl FromIterator<Frame> for Frames {
    fn from_iter<I: IntoIterator<Item = Frame>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Frames {
    type Item = Frame;
    type IntoIter = std::vec::IntoIter<Frame>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Looks up the first row's field, or returns `default` when the query was empty.
///
/// Guards use this to make a fallback explicit instead of silently reading
/// an absent row.
#[must_use]
pub fn first_or(rows: &[Fields], field: &str, default: Value) -> Value {
    rows.first()
        .and_then(|row| row.get(field))
        .cloned()
        .unwrap_or(default)
}

/// Fails with [`NotFound`](concord_foundation::ErrorKind::NotFound) when a
/// query that must return a row returned none.
///
/// # Errors
/// Returns an error if `rows` is empty.
pub fn require_row<'r>(rows: &'r [Fields], kind: &'static str, id: &str) -> Result<&'r Fields> {
    rows.first().ok_or_else(|| Error::not_found(kind, id))
}
