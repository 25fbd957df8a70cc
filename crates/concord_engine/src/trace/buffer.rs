//! Bounded storage for trace records.

use std::collections::{HashMap, HashSet, VecDeque};

use super::record::{TraceEvent, TraceRecord};

/// Default number of records kept.
pub const DEFAULT_BUFFER_SIZE: usize = 10_000;

// =============================================================================
// Trace Buffer
// =============================================================================

/// A fixed-size buffer holding the most recent trace records.
///
/// When full, the oldest record is discarded.
#[derive(Clone, Debug)]
pub struct TraceBuffer {
    records: VecDeque<TraceRecord>,
    max_size: usize,
    next_id: u64,
}

impl TraceBuffer {
    /// Creates a buffer holding at most `max_size` records.
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        Self {
            records: VecDeque::new(),
            max_size,
            next_id: 0,
        }
    }

    /// Pushes an event and returns its record ID.
    pub fn push(&mut self, flow: u64, wave: u32, timestamp_ns: u64, event: TraceEvent) -> u64 {
        let id = self.next_id;
        self.next_id += 1;

        self.records.push_back(TraceRecord {
            id,
            flow,
            wave,
            timestamp_ns,
            event,
        });
        if self.records.len() > self.max_size {
            let excess = self.records.len() - self.max_size;
            self.records.drain(..excess);
        }
        id
    }

    /// Returns the number of records held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when nothing is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Removes all records. IDs keep increasing.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Iterates records, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &TraceRecord> {
        self.records.iter()
    }

    /// Records belonging to one flow.
    #[must_use]
    pub fn records_for_flow(&self, flow: u64) -> Vec<&TraceRecord> {
        self.records.iter().filter(|r| r.flow == flow).collect()
    }

    /// Summary statistics.
    #[must_use]
    pub fn stats(&self) -> TraceBufferStats {
        let mut event_counts: HashMap<&'static str, usize> = HashMap::new();
        let flows: HashSet<u64> = self.records.iter().map(|r| r.flow).collect();
        for kind in self.records.iter().map(TraceRecord::event_type) {
            *event_counts.entry(kind).or_default() += 1;
        }

        TraceBufferStats {
            record_count: self.records.len(),
            max_size: self.max_size,
            flow_count: flows.len(),
            event_counts,
        }
    }
}

impl Default for TraceBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_SIZE)
    }
}

/// Counts describing what a [`TraceBuffer`] currently holds.
#[derive(Clone, Debug)]
pub struct TraceBufferStats {
    /// Number of records held.
    pub record_count: usize,
    /// Maximum buffer size.
    pub max_size: usize,
    /// Number of distinct flows with records in the buffer.
    pub flow_count: usize,
    /// Records per event type.
    pub event_counts: HashMap<&'static str, usize>,
}
