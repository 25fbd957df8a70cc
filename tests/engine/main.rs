//! Integration tests for Layer 1: Engine
//!
//! Tests for joins, guard execution, cascades, and provenance.

mod cascade;
mod guards;
mod matching;
mod support;
