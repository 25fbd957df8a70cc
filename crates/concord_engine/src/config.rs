//! Engine configuration.

use crate::trace::TracerConfig;

/// Default cap on waves per cascade.
pub const DEFAULT_MAX_CASCADE_DEPTH: u32 = 32;

/// Default cap on rule firings per flow.
pub const DEFAULT_MAX_FIRINGS_PER_FLOW: usize = 10_000;

/// What happens to a flow's records once its cascade ends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Retention {
    /// Keep every record for the engine's lifetime.
    #[default]
    Unbounded,
    /// Drop a flow's records after its cascade, successful or not.
    ///
    /// Joins never cross flows, so these records can no longer match.
    DiscardCompletedFlows,
}

/// Configuration for a [`SyncEngine`](crate::SyncEngine).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Waves after which a cascade is aborted with a limit error.
    pub max_cascade_depth: u32,
    /// Rule firings after which a flow is aborted with a limit error.
    pub max_firings_per_flow: usize,
    /// Log retention policy.
    pub retention: Retention,
    /// In-engine tracer settings.
    pub tracer: TracerConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_cascade_depth: DEFAULT_MAX_CASCADE_DEPTH,
            max_firings_per_flow: DEFAULT_MAX_FIRINGS_PER_FLOW,
            retention: Retention::Unbounded,
            tracer: TracerConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration with tracing enabled.
    #[must_use]
    pub fn debug() -> Self {
        Self {
            tracer: TracerConfig::new().enabled(),
            ..Self::default()
        }
    }

    /// Builder method to set the cascade depth limit.
    #[must_use]
    pub fn with_max_cascade_depth(mut self, depth: u32) -> Self {
        self.max_cascade_depth = depth;
        self
    }

    /// Builder method to set the per-flow firing limit.
    #[must_use]
    pub fn with_max_firings_per_flow(mut self, firings: usize) -> Self {
        self.max_firings_per_flow = firings;
        self
    }

    /// Builder method to set the retention policy.
    #[must_use]
    pub fn with_retention(mut self, retention: Retention) -> Self {
        self.retention = retention;
        self
    }

    /// Builder method to set the tracer configuration.
    #[must_use]
    pub fn with_tracer(mut self, tracer: TracerConfig) -> Self {
        self.tracer = tracer;
        self
    }
}
