//! The action record log.
//!
//! Every completed action invocation becomes an immutable [`ActionRecord`]
//! with a monotonic sequence number. The log is the substrate the matcher
//! joins against; it is indexed by (flow, action) so a wave never scans
//! records that cannot match.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use concord_foundation::Fields;

use crate::concept::ActionRef;

// =============================================================================
// Flow Id
// =============================================================================

/// Identifies the cascade started by one top-level submission.
///
/// Records carry the flow that produced them and trigger joins never cross
/// flows, so two structurally identical requests cannot see each other's
/// records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FlowId(pub u64);

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "flow-{}", self.0)
    }
}

// =============================================================================
// Action Record
// =============================================================================

/// Why a record exists: the rule firing that dispatched it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cause {
    /// Name of the rule that fired.
    pub rule: Arc<str>,
    /// Wave of the cascade in which it fired (1-based).
    pub wave: u32,
    /// Sequence numbers of the records bound to the rule's trigger patterns, in pattern order.
    pub triggers: Vec<u64>,
}

/// A completed action invocation.
#[derive(Clone, Debug, PartialEq)]
pub struct ActionRecord {
    /// Global sequence number (monotonic, never reused).
    pub seq: u64,
    /// The flow this record belongs to.
    pub flow: FlowId,
    /// Which action was invoked.
    pub action: ActionRef,
    /// Realized input values.
    pub input: Fields,
    /// Realized output values.
    pub output: Fields,
    /// The rule firing that produced it, or `None` for a submitted action.
    pub cause: Option<Cause>,
}

impl fmt::Display for ActionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} [{}] {} {} -> {}",
            self.seq, self.flow, self.action, self.input, self.output
        )
    }
}

// =============================================================================
// Action Log
// =============================================================================

/// Append-only sequence of action records.
#[derive(Clone, Debug, Default)]
pub struct ActionLog {
    records: BTreeMap<u64, Arc<ActionRecord>>,
    by_flow_action: HashMap<(FlowId, ActionRef), Vec<u64>>,
    by_flow: HashMap<FlowId, Vec<u64>>,
    next_seq: u64,
}

impl ActionLog {
    /// Creates an empty log. The first record gets sequence number 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_seq: 1,
            ..Self::default()
        }
    }

    /// Appends a record and returns its sequence number. Never fails.
    pub fn append(
        &mut self,
        flow: FlowId,
        action: ActionRef,
        input: Fields,
        output: Fields,
        cause: Option<Cause>,
    ) -> u64 {
        let seq = self.next_seq.max(1);
        self.next_seq = seq + 1;

        let record = ActionRecord {
            seq,
            flow,
            action,
            input,
            output,
            cause,
        };
        self.records.insert(seq, Arc::new(record));
        self.by_flow_action
            .entry((flow, action))
            .or_default()
            .push(seq);
        self.by_flow.entry(flow).or_default().push(seq);
        seq
    }

    /// Gets a record by sequence number.
    #[must_use]
    pub fn get(&self, seq: u64) -> Option<&Arc<ActionRecord>> {
        self.records.get(&seq)
    }

    /// Returns all retained records with `seq >= cursor`, oldest first.
    pub fn scan_since(&self, cursor: u64) -> impl Iterator<Item = &Arc<ActionRecord>> {
        self.records.range(cursor..).map(|(_, r)| r)
    }

    /// Sequence numbers of a flow's records for one action, oldest first.
    #[must_use]
    pub fn candidates(&self, flow: FlowId, action: ActionRef) -> &[u64] {
        self.by_flow_action
            .get(&(flow, action))
            .map_or(&[], Vec::as_slice)
    }

    /// Sequence numbers of all of a flow's records, oldest first.
    #[must_use]
    pub fn flow_records(&self, flow: FlowId) -> &[u64] {
        self.by_flow.get(&flow).map_or(&[], Vec::as_slice)
    }

    /// Drops every record of a flow. Used only by the discard-completed-flows
    /// retention policy once the flow's cascade has finished.
    pub fn discard_flow(&mut self, flow: FlowId) -> usize {
        let Some(seqs) = self.by_flow.remove(&flow) else {
            return 0;
        };
        for seq in &seqs {
            self.records.remove(seq);
        }
        self.by_flow_action.retain(|(f, _), _| *f != flow);
        seqs.len()
    }

    /// The sequence number the next append will receive.
    #[must_use]
    pub fn next_seq(&self) -> u64 {
        self.next_seq.max(1)
    }

    /// Number of retained records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if no records are retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterates all retained records, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ActionRecord>> {
        self.records.values()
    }
}
