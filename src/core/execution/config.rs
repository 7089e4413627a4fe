//! Configuration for wiresim engine execution
//!
//! This module provides the knobs that bound a simulation run: how often the
//! pending work may repeat before the run is declared oscillating, and how
//! wide a port may be.

use serde::{Deserialize, Serialize};

/// Default number of repeated pending sets tolerated by `step_all`
pub const DEFAULT_OSCILLATION_THRESHOLD: usize = 10;

/// Widest supported port, bounded by the integer form of a value
pub const DEFAULT_MAX_BIT_SIZE: usize = 64;

/// Configuration for engine execution
///
/// Deserialises from a partial document; missing fields take their default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Total number of times `step_all` may meet a pending set it has
    /// already seen before it reports an oscillation
    pub oscillation_threshold: usize,
    /// Largest port width a component may declare
    pub max_bit_size: usize,
}

impl SimulatorConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self {
            oscillation_threshold: DEFAULT_OSCILLATION_THRESHOLD,
            max_bit_size: DEFAULT_MAX_BIT_SIZE,
        }
    }

    /// Set the oscillation threshold
    ///
    /// # Arguments
    /// * `threshold` - Repeats tolerated before `step_all` gives up. Zero is
    ///   treated as one.
    pub fn with_oscillation_threshold(mut self, threshold: usize) -> Self {
        self.oscillation_threshold = threshold;
        self
    }

    /// Set the maximum port width
    ///
    /// # Arguments
    /// * `bits` - Widest allowed port. Values above 64 are clamped since
    ///   wider values cannot be read as integers.
    pub fn with_max_bit_size(mut self, bits: usize) -> Self {
        self.max_bit_size = bits.min(DEFAULT_MAX_BIT_SIZE);
        self
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self::new()
    }
}
