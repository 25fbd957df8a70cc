//! Action patterns and the join engine.
//!
//! An [`ActionPattern`] names one action and constrains any subset of its
//! input and output fields. The [`Matcher`] unifies an ordered list of
//! patterns against the action log with a left-deep nested join, so
//! variables shared between patterns act as join keys.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use concord_foundation::{Fields, Frame, Value, Var};

use crate::concept::ActionRef;
use crate::log::{ActionLog, ActionRecord, FlowId};

// =============================================================================
// Terms
// =============================================================================

/// One side of a field constraint: a literal filter or a variable to bind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Term {
    /// Record value must equal this exactly.
    Lit(Value),
    /// Record value is bound to (or must agree with) this variable.
    Var(Var),
}

impl Term {
    /// Unifies this term with a concrete value under `frame`.
    ///
    /// Returns `None` on a literal mismatch or a binding conflict.
    #[must_use]
    pub fn unify(&self, value: &Value, frame: &Frame) -> Option<Frame> {
        match self {
            Self::Lit(lit) => (lit == value).then(|| frame.clone()),
            Self::Var(var) => frame.unify(var, value),
        }
    }

    /// Returns the variable if this term is one.
    #[must_use]
    pub fn as_var(&self) -> Option<&Var> {
        match self {
            Self::Var(v) => Some(v),
            Self::Lit(_) => None,
        }
    }
}

impl From<Var> for Term {
    fn from(var: Var) -> Self {
        Self::Var(var)
    }
}

impl From<&Var> for Term {
    fn from(var: &Var) -> Self {
        Self::Var(var.clone())
    }
}

impl From<Value> for Term {
    fn from(value: Value) -> Self {
        Self::Lit(value)
    }
}

impl From<&str> for Term {
    fn from(s: &str) -> Self {
        Self::Lit(Value::from(s))
    }
}

impl From<bool> for Term {
    fn from(b: bool) -> Self {
        Self::Lit(Value::Bool(b))
    }
}

impl From<i64> for Term {
    fn from(n: i64) -> Self {
        Self::Lit(Value::Int(n))
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lit(Value::String(s)) => write!(f, "{s:?}"),
            Self::Lit(v) => write!(f, "{v}"),
            Self::Var(v) => write!(f, "{v}"),
        }
    }
}

// =============================================================================
// Action Pattern
// =============================================================================

/// A trigger clause: an action plus constraints on its input and output fields.
///
/// Fields not mentioned are unconstrained. A mentioned field that is absent
/// from the record means the record does not match.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionPattern {
    /// The action this pattern observes.
    pub action: ActionRef,
    /// Constraints on the record's input fields.
    pub input: Vec<(Arc<str>, Term)>,
    /// Constraints on the record's output fields.
    pub output: Vec<(Arc<str>, Term)>,
}

impl ActionPattern {
    /// Creates a pattern that matches every record of `action`.
    #[must_use]
    pub fn new(action: ActionRef) -> Self {
        Self {
            action,
            input: Vec::new(),
            output: Vec::new(),
        }
    }

    /// Adds an input field constraint.
    #[must_use]
    pub fn input(mut self, field: impl Into<Arc<str>>, term: impl Into<Term>) -> Self {
        self.input.push((field.into(), term.into()));
        self
    }

    /// Adds an output field constraint.
    #[must_use]
    pub fn output(mut self, field: impl Into<Arc<str>>, term: impl Into<Term>) -> Self {
        self.output.push((field.into(), term.into()));
        self
    }

    /// Every variable this pattern can bind.
    pub fn vars(&self) -> impl Iterator<Item = &Var> {
        self.input
            .iter()
            .chain(&self.output)
            .filter_map(|(_, term)| term.as_var())
    }

    /// Matches a single record under an existing partial frame.
    #[must_use]
    pub fn match_record(&self, record: &ActionRecord, frame: &Frame) -> Option<Frame> {
        if record.action != self.action {
            return None;
        }
        let frame = unify_fields(&self.input, &record.input, frame)?;
        unify_fields(&self.output, &record.output, &frame)
    }
}

fn unify_fields(constraints: &[(Arc<str>, Term)], fields: &Fields, frame: &Frame) -> Option<Frame> {
    let mut frame = frame.clone();
    for (field, term) in constraints {
        let value = fields.get(field)?;
        frame = term.unify(value, &frame)?;
    }
    Some(frame)
}

impl fmt::Display for ActionPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let render = |f: &mut fmt::Formatter<'_>, fields: &[(Arc<str>, Term)]| -> fmt::Result {
            write!(f, "{{")?;
            for (i, (k, t)) in fields.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{k}: {t}")?;
            }
            write!(f, "}}")
        };
        write!(f, "{} ", self.action)?;
        render(f, &self.input)?;
        write!(f, " -> ")?;
        render(f, &self.output)
    }
}

// =============================================================================
// Matcher
// =============================================================================

/// One complete trigger match: a fully bound frame plus the records it joined.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Match {
    /// Bindings produced by all trigger patterns.
    pub frame: Frame,
    /// Sequence numbers of the matched records, one per pattern, in pattern order.
    pub records: Vec<u64>,
}

/// Which records a pattern position may draw from during a semi-naive pass.
#[derive(Clone, Copy)]
enum Window {
    /// Only records appended before the delta.
    Old,
    /// Exactly the delta record being seeded.
    Seed(u64),
    /// Any record of the flow.
    All,
}

/// Left-deep join of trigger patterns against the action log.
pub struct Matcher;

struct Join<'a> {
    patterns: &'a [ActionPattern],
    windows: &'a [Window],
    log: &'a ActionLog,
    flow: FlowId,
    cutoff: u64,
}

impl Join<'_> {
    fn run(&self, depth: usize, frame: Frame, chosen: &mut Vec<u64>, out: &mut Vec<Match>) {
        let Some(pattern) = self.patterns.get(depth) else {
            out.push(Match {
                frame,
                records: chosen.clone(),
            });
            return;
        };

        let window = self.windows[depth];
        let seeded;
        let seqs: &[u64] = if let Window::Seed(seq) = window {
            seeded = [seq];
            &seeded
        } else {
            self.log.candidates(self.flow, pattern.action)
        };

        for &seq in seqs {
            if matches!(window, Window::Old) && seq >= self.cutoff {
                break;
            }
            let Some(record) = self.log.get(seq) else {
                continue;
            };
            if let Some(next) = pattern.match_record(record, &frame) {
                chosen.push(seq);
                self.run(depth + 1, next, chosen, out);
                chosen.pop();
            }
        }
    }
}

impl Matcher {
    /// Enumerates every match of `patterns` over all records of `flow`.
    ///
    /// Results are ordered by the sequence numbers of the matched records.
    #[must_use]
    pub fn match_all(patterns: &[ActionPattern], log: &ActionLog, flow: FlowId) -> Vec<Match> {
        let windows = vec![Window::All; patterns.len()];
        let join = Join {
            patterns,
            windows: &windows,
            log,
            flow,
            cutoff: 0,
        };
        let mut out = Vec::new();
        join.run(0, Frame::new(), &mut Vec::new(), &mut out);
        out
    }

    /// Enumerates the matches that use at least one record from `delta`.
    ///
    /// `delta` must be the contiguous run of sequence numbers appended during
    /// the previous wave. Each combination is produced exactly once: a match
    /// is seeded at the first pattern position bound to a delta record, with
    /// earlier positions restricted to records older than the delta.
    #[must_use]
    pub fn match_delta(
        patterns: &[ActionPattern],
        log: &ActionLog,
        flow: FlowId,
        delta: &[u64],
    ) -> Vec<Match> {
        let Some(&cutoff) = delta.first() else {
            return Vec::new();
        };
        let delta_set: HashSet<u64> = delta.iter().copied().collect();
        let mut out = Vec::new();
        let mut chosen = Vec::with_capacity(patterns.len());

        for (seed_pos, pattern) in patterns.iter().enumerate() {
            for &seq in log.candidates(flow, pattern.action) {
                if !delta_set.contains(&seq) {
                    continue;
                }
                let windows: Vec<Window> = (0..patterns.len())
                    .map(|j| match j.cmp(&seed_pos) {
                        Ordering::Less => Window::Old,
                        Ordering::Equal => Window::Seed(seq),
                        Ordering::Greater => Window::All,
                    })
                    .collect();
                let join = Join {
                    patterns,
                    windows: &windows,
                    log,
                    flow,
                    cutoff,
                };
                join.run(0, Frame::new(), &mut chosen, &mut out);
            }
        }

        out.sort_by(|a, b| a.records.cmp(&b.records));
        out
    }
}
