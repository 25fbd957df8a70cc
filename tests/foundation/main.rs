//! Integration tests for Layer 0: Foundation
//!
//! Tests for core types: Value, Fields, Var, Frame, and Error.

mod errors;
mod frames;
mod values;
