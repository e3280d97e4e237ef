use serde::Serialize;

use crate::config::EnvironmentConfig;

/// The shared environment scalar.
///
/// Behaviors read it through [`crate::behavior::Shared`]; only the
/// accumulation step writes it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Environment {
    value: f64,
    min: f64,
    max: f64,
}

impl Environment {
    /// Start at `config.initial`, clamped to the range.
    pub fn new(config: EnvironmentConfig) -> Self {
        Self {
            value: config.initial.clamp(config.min, config.max),
            min: config.min,
            max: config.max,
        }
    }

    /// Current raw value.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Lower clamp.
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Upper clamp.
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Where the value sits in its range, `0.0..=1.0`.
    pub fn level(&self) -> f64 {
        let span = self.max - self.min;
        if span <= 0.0 {
            return 1.0;
        }
        (self.value - self.min) / span
    }

    /// Add `delta` and clamp into range. Returns the change actually applied.
    pub fn apply(&mut self, delta: f64) -> f64 {
        let before = self.value;
        self.value = (self.value + delta).clamp(self.min, self.max);
        self.value - before
    }
}
