//! Provenance queries over the action log.
//!
//! Every record dispatched by a rule carries a [`Cause`]: the rule, the wave,
//! and the trigger records it joined. Following causes backwards answers
//! "why does this record exist".

use std::collections::{BTreeSet, VecDeque};
use std::fmt::Write as _;
use std::sync::Arc;

use concord_foundation::{Error, Result};

use crate::log::{ActionLog, ActionRecord, Cause};

/// Read-only provenance view of a log.
#[derive(Clone, Copy, Debug)]
pub struct Provenance<'a> {
    log: &'a ActionLog,
}

impl<'a> Provenance<'a> {
    /// Creates a view over `log`.
    #[must_use]
    pub fn new(log: &'a ActionLog) -> Self {
        Self { log }
    }

    fn record(&self, seq: u64) -> Result<&'a Arc<ActionRecord>> {
        self.log
            .get(seq)
            .ok_or_else(|| Error::not_found("record", seq.to_string()))
    }

    /// The direct cause of a record, or `None` for a submitted record.
    ///
    /// # Errors
    /// Returns an error if the record is not in the log.
    pub fn cause(&self, seq: u64) -> Result<Option<&'a Cause>> {
        Ok(self.record(seq)?.cause.as_ref())
    }

    /// The record and all of its transitive causes, oldest first.
    ///
    /// Ancestors that have been discarded from the log are skipped.
    ///
    /// # Errors
    /// Returns an error if the record itself is not in the log.
    pub fn lineage(&self, seq: u64) -> Result<Vec<Arc<ActionRecord>>> {
        self.record(seq)?;

        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([seq]);
        while let Some(next) = queue.pop_front() {
            if !seen.insert(next) {
                continue;
            }
            if let Some(Cause { triggers, .. }) = self.log.get(next).and_then(|r| r.cause.as_ref())
            {
                queue.extend(triggers.iter().copied());
            }
        }

        Ok(seen
            .into_iter()
            .filter_map(|s| self.log.get(s).cloned())
            .collect())
    }

    /// The submitted record that started the record's flow.
    ///
    /// # Errors
    /// Returns an error if the record is not in the log.
    pub fn root(&self, seq: u64) -> Result<Option<Arc<ActionRecord>>> {
        let record = self.record(seq)?;
        Ok(self
            .log
            .flow_records(record.flow)
            .iter()
            .filter_map(|s| self.log.get(*s))
            .find(|r| r.cause.is_none())
            .cloned())
    }

    /// Records that used `seq` as a trigger, oldest first.
    #[must_use]
    pub fn consequences(&self, seq: u64) -> Vec<u64> {
        let Some(record) = self.log.get(seq) else {
            return Vec::new();
        };
        self.log
            .flow_records(record.flow)
            .iter()
            .copied()
            .filter(|s| {
                self.log
                    .get(*s)
                    .and_then(|r| r.cause.as_ref())
                    .is_some_and(|c| c.triggers.contains(&seq))
            })
            .collect()
    }

    /// Human-readable explanation of a record's lineage, followed by the
    /// records it triggered.
    ///
    /// # Errors
    /// Returns an error if the record is not in the log.
    pub fn explain(&self, seq: u64) -> Result<String> {
        let mut out = String::new();
        for record in self.lineage(seq)? {
            let _ = write!(out, "{record}");
            match &record.cause {
                Some(cause) => {
                    let _ = writeln!(
                        out,
                        "  <= {} (wave {}, triggers {:?})",
                        cause.rule, cause.wave, cause.triggers
                    );
                }
                None => {
                    let _ = writeln!(out, "  <= submitted");
                }
            }
        }
        let later = self.consequences(seq);
        if !later.is_empty() {
            let _ = writeln!(out, "  => led to {later:?}");
        }
        Ok(out)
    }
}
