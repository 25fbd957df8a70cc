//! Follow-up dispatch.
//!
//! The dispatcher evaluates a rule's follow-up templates against one frame,
//! invokes each action on its concept, folds declared outputs back into the
//! frame, and appends an action record per invocation.

use concord_foundation::{Fields, Frame, Result};
use tracing::trace;

use crate::concept::{ActionRef, ConceptRegistry};
use crate::log::{ActionLog, Cause, FlowId};
use crate::rule::SyncRule;

/// Invokes actions for one flow and records them.
#[derive(Debug)]
pub struct Dispatcher<'a> {
    concepts: &'a mut ConceptRegistry,
    log: &'a mut ActionLog,
    flow: FlowId,
}

impl<'a> Dispatcher<'a> {
    /// Creates a dispatcher writing records for `flow`.
    pub fn new(concepts: &'a mut ConceptRegistry, log: &'a mut ActionLog, flow: FlowId) -> Self {
        Self {
            concepts,
            log,
            flow,
        }
    }

    /// Invokes one action and appends its record.
    ///
    /// Nothing is appended if the action fails.
    ///
    /// # Errors
    /// Returns the concept's error, wrapped as an action failure.
    pub fn invoke(
        &mut self,
        action: ActionRef,
        input: Fields,
        cause: Option<Cause>,
    ) -> Result<(u64, Fields)> {
        let output = self.concepts.perform(action, &input)?;
        let seq = self
            .log
            .append(self.flow, action, input, output.clone(), cause);
        trace!(seq, %action, "recorded action");
        Ok((seq, output))
    }

    /// Runs every follow-up of `rule` for one surviving frame, in order.
    ///
    /// Sequence numbers of appended records are pushed to `appended` as they
    /// are written, so a caller still sees them if a later follow-up fails.
    /// Returns the frame with all declared outputs folded in.
    ///
    /// # Errors
    /// Returns an error if an input expression references an unbound
    /// variable, an action fails, or an action's output lacks a declared field.
    pub fn dispatch(
        &mut self,
        rule: &SyncRule,
        frame: Frame,
        cause: &Cause,
        appended: &mut Vec<u64>,
    ) -> Result<Frame> {
        let mut frame = frame;
        for template in &rule.then {
            let input = template.realize(&frame)?;
            let (seq, output) = self.invoke(template.action, input, Some(cause.clone()))?;
            appended.push(seq);

            for (field, var) in &template.output {
                frame = frame.bind(var, output.require(field)?.clone());
            }
        }
        Ok(frame)
    }
}
