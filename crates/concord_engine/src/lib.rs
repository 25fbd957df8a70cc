//! Synchronization engine for Concord.
//!
//! This crate provides:
//! - [`Concept`] / [`ConceptRegistry`] - The interface concepts expose to the engine
//! - [`ActionLog`] - Append-only, flow-indexed log of completed actions
//! - [`ActionPattern`] / [`Matcher`] - Trigger patterns and the left-deep join
//! - [`SyncRule`] / [`RuleSet`] - Declarative rules and their validation
//! - [`Frames`] / [`GuardContext`] - Guard-stage enrichment and filtering
//! - [`Dispatcher`] - Follow-up invocation and record appends
//! - [`SyncEngine`] - The wave loop tying it together
//! - [`Provenance`] and [`trace`] - Why a record exists and what a cascade did

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod concept;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod guard;
pub mod log;
pub mod pattern;
pub mod provenance;
pub mod rule;
pub mod trace;

pub use concept::{ActionRef, Concept, ConceptRegistry, QueryRef};
pub use config::{EngineConfig, Retention};
pub use dispatch::Dispatcher;
pub use engine::{FlowReport, SyncEngine};
pub use guard::{Frames, GuardContext, first_or, require_row};
pub use log::{ActionLog, ActionRecord, Cause, FlowId};
pub use pattern::{ActionPattern, Match, Matcher, Term};
pub use provenance::Provenance;
pub use rule::{ActionTemplate, Expr, GuardFn, RuleId, RuleSet, SyncRule};
pub use trace::{TraceBufferStats, TraceEvent, TraceRecord, Tracer, TracerConfig};
