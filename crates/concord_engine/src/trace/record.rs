//! Trace event and record types.

use std::fmt;
use std::sync::Arc;

use concord_foundation::Value;

use crate::concept::ActionRef;

// =============================================================================
// Trace Event
// =============================================================================

/// Events recorded while a cascade runs.
#[derive(Clone, Debug, PartialEq)]
pub enum TraceEvent {
    /// A submission opened a flow.
    FlowStart {
        /// The submitted action.
        action: ActionRef,
    },

    /// A flow's cascade finished.
    FlowEnd {
        /// False if the cascade stopped on a fatal error.
        success: bool,
        /// Number of waves that ran.
        waves: u32,
    },

    /// A wave began matching.
    WaveStart {
        /// Number of records in the delta.
        delta: usize,
    },

    /// A wave finished dispatching.
    WaveEnd {
        /// Records appended during the wave.
        appended: usize,
    },

    /// A rule's trigger matched a new combination of records.
    RuleMatched {
        /// The rule name.
        rule: Arc<str>,
        /// Sequence numbers of the matched records.
        records: Vec<u64>,
        /// Bindings produced by the trigger.
        bindings: Vec<(String, Value)>,
    },

    /// A rule's guard dropped every frame of an activation.
    GuardDropped {
        /// The rule name.
        rule: Arc<str>,
    },

    /// A rule dispatched its follow-ups for one frame.
    RuleFired {
        /// The rule name.
        rule: Arc<str>,
        /// Records appended by the follow-ups.
        appended: Vec<u64>,
    },

    /// An action record was appended.
    ActionRecorded {
        /// The new record's sequence number.
        seq: u64,
        /// The invoked action.
        action: ActionRef,
    },
}

impl TraceEvent {
    /// Returns a short name for the event type.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::FlowStart { .. } => "flow-start",
            Self::FlowEnd { .. } => "flow-end",
            Self::WaveStart { .. } => "wave-start",
            Self::WaveEnd { .. } => "wave-end",
            Self::RuleMatched { .. } => "rule-matched",
            Self::GuardDropped { .. } => "guard-dropped",
            Self::RuleFired { .. } => "rule-fired",
            Self::ActionRecorded { .. } => "action-recorded",
        }
    }
}

impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FlowStart { action } => write!(f, "flow start {action}"),
            Self::FlowEnd { success, waves } => {
                let status = if *success { "ok" } else { "failed" };
                write!(f, "flow end ({status}, {waves} waves)")
            }
            Self::WaveStart { delta } => write!(f, "wave start ({delta} new records)"),
            Self::WaveEnd { appended } => write!(f, "wave end ({appended} appended)"),
            Self::RuleMatched {
                rule,
                records,
                bindings,
            } => {
                write!(f, "matched {rule} on {records:?}")?;
                for (name, value) in bindings {
                    write!(f, " ?{name}={value}")?;
                }
                Ok(())
            }
            Self::GuardDropped { rule } => write!(f, "guard dropped {rule}"),
            Self::RuleFired { rule, appended } => write!(f, "fired {rule} -> {appended:?}"),
            Self::ActionRecorded { seq, action } => write!(f, "recorded #{seq} {action}"),
        }
    }
}

// =============================================================================
// Trace Record
// =============================================================================

/// A trace event stamped with its flow and wave.
#[derive(Clone, Debug, PartialEq)]
pub struct TraceRecord {
    /// Unique record ID within the engine's lifetime.
    pub id: u64,
    /// The flow the event belongs to.
    pub flow: u64,
    /// The wave the event belongs to (0 outside any wave).
    pub wave: u32,
    /// Nanoseconds since the tracer was created.
    pub timestamp_ns: u64,
    /// The event itself.
    pub event: TraceEvent,
}

impl TraceRecord {
    /// Returns the event type name.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        self.event.event_type()
    }
}

impl fmt::Display for TraceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[flow {} wave {}] {}", self.flow, self.wave, self.event)
    }
}
