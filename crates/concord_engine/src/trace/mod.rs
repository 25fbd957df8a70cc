//! In-engine tracing of cascades.
//!
//! The tracer records flow, wave, and rule events into a ring buffer. It is
//! disabled by default and does no work when off: [`Tracer::record`] takes a
//! closure so events are only built when tracing is enabled.

pub mod buffer;
pub mod record;

pub use buffer::{DEFAULT_BUFFER_SIZE, TraceBuffer, TraceBufferStats};
pub use record::{TraceEvent, TraceRecord};

use std::time::Instant;

// =============================================================================
// Tracer Configuration
// =============================================================================

/// Whether the tracer runs, and how much it keeps.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TracerConfig {
    /// Off by default.
    pub enabled: bool,
    /// Maximum records kept in the buffer.
    pub buffer_size: usize,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl TracerConfig {
    /// Creates a disabled configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Turns tracing on.
    #[must_use]
    pub fn enabled(mut self) -> Self {
        self.enabled = true;
        self
    }

    /// Sets how many records are kept.
    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }
}

// =============================================================================
// Tracer
// =============================================================================

/// Records cascade events into a ring buffer.
#[derive(Debug)]
pub struct Tracer {
    config: TracerConfig,
    buffer: TraceBuffer,
    flow: u64,
    wave: u32,
    epoch: Instant,
}

impl Tracer {
    /// Creates a tracer with the given configuration.
    #[must_use]
    pub fn new(config: TracerConfig) -> Self {
        let buffer = TraceBuffer::new(config.buffer_size);
        Self {
            config,
            buffer,
            flow: 0,
            wave: 0,
            epoch: Instant::now(),
        }
    }

    /// A tracer that records nothing until enabled.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(TracerConfig::default())
    }

    /// True while events are being recorded.
    #[must_use]
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Starts recording.
    pub fn enable(&mut self) {
        self.set_enabled(true);
    }

    /// Stops recording; held records stay.
    pub fn disable(&mut self) {
        self.set_enabled(false);
    }

    fn set_enabled(&mut self, on: bool) {
        self.config.enabled = on;
    }

    /// Sets the flow and wave stamped on subsequent records.
    pub fn set_position(&mut self, flow: u64, wave: u32) {
        self.flow = flow;
        self.wave = wave;
    }

    /// Records an event if tracing is enabled.
    #[inline]
    pub fn record(&mut self, event: impl FnOnce() -> TraceEvent) {
        if !self.config.enabled {
            return;
        }
        let elapsed = self.epoch.elapsed().as_nanos();
        let timestamp_ns = u64::try_from(elapsed).unwrap_or(u64::MAX);
        self.buffer.push(self.flow, self.wave, timestamp_ns, event());
    }

    /// The underlying buffer.
    #[must_use]
    pub fn buffer(&self) -> &TraceBuffer {
        &self.buffer
    }

    /// Clears recorded events.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for Tracer {
    fn default() -> Self {
        Self::disabled()
    }
}
