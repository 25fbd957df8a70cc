//! The synchronization engine.
//!
//! [`SyncEngine::submit`] is the sole entry point that starts a cascade. Each
//! submission opens a new flow, records the submitted action, and then runs
//! waves until no rule fires:
//!
//! 1. **Match**: every rule with a trigger on an action in the delta (the
//!    records appended by the previous wave) is joined against the flow's
//!    records. Combinations that already fired are skipped.
//! 2. **Guard**: each new activation's frame is passed through the rule's
//!    guard. Dropped frames are silent.
//! 3. **Dispatch**: surviving frames run their follow-ups in rule order. The
//!    appended records form the next delta.
//!
//! The engine state sits behind one lock held for a whole cascade, so
//! cascades of concurrent submissions never interleave.

use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use concord_foundation::{Error, ErrorContext, Fields, Result, SemanticLimit, Vars};
use tracing::{debug, debug_span, info, warn};

use crate::concept::{ActionRef, Concept, ConceptRegistry, QueryRef};
use crate::config::{EngineConfig, Retention};
use crate::dispatch::Dispatcher;
use crate::guard::{Frames, GuardContext};
use crate::log::{ActionLog, ActionRecord, Cause, FlowId};
use crate::pattern::{Match, Matcher};
use crate::provenance::Provenance;
use crate::rule::{RuleId, RuleSet, SyncRule};
use crate::trace::{TraceBufferStats, TraceEvent, TraceRecord, Tracer};

// =============================================================================
// Flow Report
// =============================================================================

/// Summary of one completed cascade.
#[derive(Clone, Debug, PartialEq)]
pub struct FlowReport {
    /// The flow id.
    pub flow: FlowId,
    /// Sequence number of the submitted action's record.
    pub root: u64,
    /// Output of the submitted action.
    pub output: Fields,
    /// Number of waves run, including the final quiet one.
    pub waves: u32,
    /// Number of frames dispatched.
    pub firings: usize,
    /// Every record appended by the flow, root included, in order.
    pub records: Vec<u64>,
}

// =============================================================================
// Engine State
// =============================================================================

#[derive(Debug)]
struct EngineState {
    concepts: ConceptRegistry,
    rules: RuleSet,
    log: ActionLog,
    tracer: Tracer,
    last_flow: u64,
}

/// Book-keeping for a single flow's cascade.
struct Cascade {
    flow: FlowId,
    wave: u32,
    firings: usize,
    records: Vec<u64>,
    fired: HashSet<(RuleId, Vec<u64>)>,
}

impl Cascade {
    fn new(flow: FlowId) -> Self {
        Self {
            flow,
            wave: 0,
            firings: 0,
            records: Vec::new(),
            fired: HashSet::new(),
        }
    }

    fn context(&self, source: &str) -> ErrorContext {
        ErrorContext::new()
            .with_source(source)
            .with_frame(format!("{}, wave {}", self.flow, self.wave))
    }
}

/// A new trigger combination waiting for its guard.
struct Activation {
    id: RuleId,
    rule: Arc<SyncRule>,
    matched: Match,
}

impl EngineState {
    fn run_flow(
        &mut self,
        config: &EngineConfig,
        cascade: &mut Cascade,
        action: ActionRef,
        input: Fields,
    ) -> Result<(u64, Fields)> {
        let (root, output) = Dispatcher::new(&mut self.concepts, &mut self.log, cascade.flow)
            .invoke(action, input, None)
            .map_err(|e| e.with_context(cascade.context("submit")))?;
        cascade.records.push(root);
        self.tracer
            .record(|| TraceEvent::ActionRecorded { seq: root, action });

        self.run_waves(config, cascade, root)?;
        Ok((root, output))
    }

    fn run_waves(&mut self, config: &EngineConfig, cascade: &mut Cascade, root: u64) -> Result<()> {
        let flow = cascade.flow;
        let mut delta = vec![root];

        while !delta.is_empty() {
            cascade.wave += 1;
            let wave = cascade.wave;

            self.tracer.set_position(flow.0, wave);
            self.tracer.record(|| TraceEvent::WaveStart { delta: delta.len() });
            debug!(wave, delta = delta.len(), "wave start");

            // A quiescent final wave never counts against the depth.
            let activations = self.match_phase(cascade, &delta);
            if !activations.is_empty() && wave > config.max_cascade_depth {
                return Err(Error::limit_exceeded(SemanticLimit::MaxCascadeDepth {
                    limit: config.max_cascade_depth,
                    flow: flow.0,
                })
                .with_context(cascade.context("cascade")));
            }
            let ready = self.guard_phase(cascade, activations)?;
            delta = self.dispatch_phase(config, cascade, ready)?;

            let appended = delta.len();
            self.tracer.record(|| TraceEvent::WaveEnd { appended });
            debug!(wave, appended, "wave end");
        }
        Ok(())
    }

    fn match_phase(&self, cascade: &mut Cascade, delta: &[u64]) -> Vec<Activation> {
        let actions: BTreeSet<ActionRef> = delta
            .iter()
            .filter_map(|seq| self.log.get(*seq))
            .map(|record| record.action)
            .collect();

        let mut activations = Vec::new();
        for id in self.rules.triggered_by(actions) {
            let Some(rule) = self.rules.get(id).cloned() else {
                continue;
            };
            for matched in Matcher::match_delta(&rule.when, &self.log, cascade.flow, delta) {
                if !cascade.fired.insert((id, matched.records.clone())) {
                    continue;
                }
                debug!(rule = %rule.name, records = ?matched.records, "rule matched");
                activations.push(Activation {
                    id,
                    rule: Arc::clone(&rule),
                    matched,
                });
            }
        }
        activations
    }

    fn guard_phase(
        &mut self,
        cascade: &Cascade,
        activations: Vec<Activation>,
    ) -> Result<Vec<(Arc<SyncRule>, Vec<u64>, Frames)>> {
        let ctx = GuardContext::new(&self.concepts);
        let tracer = &mut self.tracer;
        let mut ready = Vec::with_capacity(activations.len());

        for Activation { id, rule, matched } in activations {
            tracer.record(|| TraceEvent::RuleMatched {
                rule: Arc::clone(&rule.name),
                records: matched.records.clone(),
                bindings: matched.frame.to_named_vec(),
            });

            let frames = match &rule.guard {
                Some(guard) => (guard.as_ref())(Frames::single(matched.frame), &ctx)
                    .map_err(|e| e.with_context(cascade.context(&rule.name)))?,
                None => Frames::single(matched.frame),
            };

            if frames.is_empty() {
                debug!(rule = %rule.name, rule_id = id.0, "guard dropped all frames");
                tracer.record(|| TraceEvent::GuardDropped {
                    rule: Arc::clone(&rule.name),
                });
                continue;
            }
            ready.push((rule, matched.records, frames));
        }
        Ok(ready)
    }

    fn dispatch_phase(
        &mut self,
        config: &EngineConfig,
        cascade: &mut Cascade,
        ready: Vec<(Arc<SyncRule>, Vec<u64>, Frames)>,
    ) -> Result<Vec<u64>> {
        let mut appended = Vec::new();
        let mut dispatcher = Dispatcher::new(&mut self.concepts, &mut self.log, cascade.flow);
        let tracer = &mut self.tracer;

        for (rule, triggers, frames) in ready {
            let cause = Cause {
                rule: Arc::clone(&rule.name),
                wave: cascade.wave,
                triggers,
            };
            for frame in frames {
                cascade.firings += 1;
                if cascade.firings > config.max_firings_per_flow {
                    cascade.records.extend_from_slice(&appended);
                    return Err(Error::limit_exceeded(SemanticLimit::MaxFirings {
                        limit: config.max_firings_per_flow,
                        flow: cascade.flow.0,
                    })
                    .with_context(cascade.context(&rule.name)));
                }

                let start = appended.len();
                let result = dispatcher.dispatch(&rule, frame, &cause, &mut appended);
                let new = appended[start..].to_vec();
                for (&seq, template) in new.iter().zip(&rule.then) {
                    let action = template.action;
                    tracer.record(|| TraceEvent::ActionRecorded { seq, action });
                }
                if let Err(err) = result {
                    cascade.records.extend_from_slice(&appended);
                    return Err(err.with_context(cascade.context(&rule.name)));
                }
                tracer.record(|| TraceEvent::RuleFired {
                    rule: Arc::clone(&rule.name),
                    appended: new,
                });
            }
        }

        cascade.records.extend_from_slice(&appended);
        Ok(appended)
    }
}

// =============================================================================
// Sync Engine
// =============================================================================

/// Composes concepts through registered synchronization rules.
///
/// The engine is `Send + Sync`; share it behind an `Arc` to accept
/// submissions from several threads.
#[derive(Debug)]
pub struct SyncEngine {
    config: EngineConfig,
    state: Mutex<EngineState>,
}

impl Default for SyncEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl SyncEngine {
    /// Creates an engine with no concepts and no rules.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        let tracer = Tracer::new(config.tracer.clone());
        Self {
            config,
            state: Mutex::new(EngineState {
                concepts: ConceptRegistry::new(),
                rules: RuleSet::new(),
                log: ActionLog::new(),
                tracer,
                last_flow: 0,
            }),
        }
    }

    /// The engine's configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn lock(&self) -> Result<MutexGuard<'_, EngineState>> {
        self.state
            .lock()
            .map_err(|_| Error::internal("engine state lock poisoned"))
    }

    /// Registers a concept, replacing any concept with the same name.
    ///
    /// # Errors
    /// Returns an error if the engine lock is poisoned.
    pub fn register_concept(&self, concept: impl Concept + 'static) -> Result<()> {
        let mut state = self.lock()?;
        debug!(concept = concept.name(), "registered concept");
        state.concepts.register(Box::new(concept));
        Ok(())
    }

    /// Validates and registers a rule. Re-registering a name replaces the rule.
    ///
    /// # Errors
    /// Returns an error if the rule is invalid or the engine lock is poisoned.
    pub fn register(&self, rule: SyncRule) -> Result<RuleId> {
        let mut state = self.lock()?;
        let name = Arc::clone(&rule.name);
        let id = state.rules.register(rule)?;
        debug!(rule = %name, rule_id = id.0, "registered rule");
        Ok(id)
    }

    /// Builds a rule from a factory given fresh variables, then registers it.
    ///
    /// # Errors
    /// Returns an error if the rule is invalid or the engine lock is poisoned.
    pub fn register_rule(&self, factory: impl FnOnce(&mut Vars) -> SyncRule) -> Result<RuleId> {
        let mut vars = Vars::new();
        self.register(factory(&mut vars))
    }

    /// Submits an action and runs its cascade to quiescence.
    ///
    /// Returns the submitted action's own output.
    ///
    /// # Errors
    /// Returns the first fatal error of the cascade: a failed action, an
    /// unbound follow-up variable, a failed query, or a tripped limit.
    /// Records appended before the error are kept.
    pub fn submit(&self, action: ActionRef, input: Fields) -> Result<Fields> {
        self.submit_with_report(action, input).map(|report| report.output)
    }

    /// Like [`submit`](Self::submit), but returns a summary of the cascade.
    ///
    /// # Errors
    /// See [`submit`](Self::submit).
    pub fn submit_with_report(&self, action: ActionRef, input: Fields) -> Result<FlowReport> {
        let mut guard = self.lock()?;
        let state = &mut *guard;

        state.last_flow += 1;
        let flow = FlowId(state.last_flow);
        let span = debug_span!("flow", flow = flow.0, %action);
        let _enter = span.enter();

        state.tracer.set_position(flow.0, 0);
        state.tracer.record(|| TraceEvent::FlowStart { action });

        let mut cascade = Cascade::new(flow);
        let result = state.run_flow(&self.config, &mut cascade, action, input);

        let success = result.is_ok();
        let waves = cascade.wave;
        state.tracer.set_position(flow.0, 0);
        state.tracer.record(|| TraceEvent::FlowEnd { success, waves });

        if self.config.retention == Retention::DiscardCompletedFlows {
            state.log.discard_flow(flow);
        }

        match result {
            Ok((root, output)) => {
                info!(
                    flow = flow.0,
                    waves,
                    firings = cascade.firings,
                    records = cascade.records.len(),
                    "flow complete"
                );
                Ok(FlowReport {
                    flow,
                    root,
                    output,
                    waves,
                    firings: cascade.firings,
                    records: cascade.records,
                })
            }
            Err(err) => {
                warn!(flow = flow.0, waves, error = %err, "flow aborted");
                Err(err)
            }
        }
    }

    /// Runs a concept query outside any cascade.
    ///
    /// # Errors
    /// Returns an error if the query fails or the engine lock is poisoned.
    pub fn query(&self, query: QueryRef, args: &Fields) -> Result<Vec<Fields>> {
        self.lock()?.concepts.query(query, args)
    }

    /// Clears rules, the action log, and recorded traces. Concepts stay registered.
    ///
    /// # Errors
    /// Returns an error if the engine lock is poisoned.
    pub fn reset(&self) -> Result<()> {
        let mut state = self.lock()?;
        state.rules.clear();
        state.log = ActionLog::new();
        state.tracer.clear();
        state.last_flow = 0;
        debug!("engine reset");
        Ok(())
    }

    /// Runs `f` with read access to the action log.
    ///
    /// # Errors
    /// Returns an error if the engine lock is poisoned.
    pub fn with_log<R>(&self, f: impl FnOnce(&ActionLog) -> R) -> Result<R> {
        Ok(f(&self.lock()?.log))
    }

    /// Snapshot of every retained record, oldest first.
    ///
    /// # Errors
    /// Returns an error if the engine lock is poisoned.
    pub fn records(&self) -> Result<Vec<Arc<ActionRecord>>> {
        self.with_log(|log| log.iter().cloned().collect())
    }

    /// Snapshot of one flow's records, oldest first.
    ///
    /// # Errors
    /// Returns an error if the engine lock is poisoned.
    pub fn flow_records(&self, flow: FlowId) -> Result<Vec<Arc<ActionRecord>>> {
        self.with_log(|log| {
            log.flow_records(flow)
                .iter()
                .filter_map(|seq| log.get(*seq).cloned())
                .collect()
        })
    }

    /// A record and all of its transitive causes, oldest first.
    ///
    /// # Errors
    /// Returns an error if the record is unknown or the engine lock is poisoned.
    pub fn lineage(&self, seq: u64) -> Result<Vec<Arc<ActionRecord>>> {
        self.with_log(|log| Provenance::new(log).lineage(seq))?
    }

    /// Human-readable lineage of a record.
    ///
    /// # Errors
    /// Returns an error if the record is unknown or the engine lock is poisoned.
    pub fn explain(&self, seq: u64) -> Result<String> {
        self.with_log(|log| Provenance::new(log).explain(seq))?
    }

    /// Names of registered rules in registration order.
    ///
    /// # Errors
    /// Returns an error if the engine lock is poisoned.
    pub fn rule_names(&self) -> Result<Vec<Arc<str>>> {
        Ok(self
            .lock()?
            .rules
            .iter()
            .map(|(_, rule)| Arc::clone(&rule.name))
            .collect())
    }

    /// Turns the in-engine tracer on or off.
    ///
    /// # Errors
    /// Returns an error if the engine lock is poisoned.
    pub fn set_tracing(&self, enabled: bool) -> Result<()> {
        let mut state = self.lock()?;
        if enabled {
            state.tracer.enable();
        } else {
            state.tracer.disable();
        }
        Ok(())
    }

    /// Snapshot of recorded trace events, oldest first, optionally for one flow.
    ///
    /// # Errors
    /// Returns an error if the engine lock is poisoned.
    pub fn traces(&self, flow: Option<FlowId>) -> Result<Vec<TraceRecord>> {
        let state = self.lock()?;
        let buffer = state.tracer.buffer();
        Ok(match flow {
            Some(FlowId(n)) => buffer.records_for_flow(n).into_iter().cloned().collect(),
            None => buffer.iter().cloned().collect(),
        })
    }

    /// Counts over the retained trace events.
    ///
    /// # Errors
    /// Returns an error if the engine lock is poisoned.
    pub fn trace_stats(&self) -> Result<TraceBufferStats> {
        Ok(self.lock()?.tracer.buffer().stats())
    }
}
