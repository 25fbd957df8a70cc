//! Concord - Declarative synchronization of independent concepts
//!
//! This crate re-exports all layers of the Concord system for convenient access.
//! For detailed documentation, see the individual layer crates.
//!
//! # Architecture
//!
//! ```text
//! Layer 3: concord_runtime    - REPL, CLI, JSON rendering, log export
//! Layer 2: concord_concepts   - API, Quiz, Activation concepts and their syncs
//! Layer 1: concord_engine     - Action log, matcher, guards, dispatcher, wave loop
//! Layer 0: concord_foundation - Core types (Value, Fields, Var, Frame, Error)
//! ```

pub use concord_concepts as concepts;
pub use concord_engine as engine;
pub use concord_foundation as foundation;
pub use concord_runtime as runtime;
