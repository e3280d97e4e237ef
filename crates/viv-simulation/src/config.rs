use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// Width and height of the simulated area. Positions are kept within
/// `0.0..=width` and `0.0..=height`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// World width.
    pub width: f64,
    /// World height.
    pub height: f64,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
        }
    }
}

impl Bounds {
    /// Bounds spanning `0..=width` by `0..=height`.
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Clamp a point into the area.
    pub fn clamp(&self, x: f64, y: f64) -> (f64, f64) {
        (x.clamp(0.0, self.width), y.clamp(0.0, self.height))
    }

    /// Whether a point lies inside the bounds.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        (0.0..=self.width).contains(&x) && (0.0..=self.height).contains(&y)
    }
}

/// Range and starting value of the shared environment scalar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// Lower clamp.
    pub min: f64,
    /// Upper clamp.
    pub max: f64,
    /// Starting value.
    pub initial: f64,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 100.0,
            initial: 50.0,
        }
    }
}

/// Configuration for a simulation run.
///
/// Every field has a default, so a JSON document only needs to name the
/// values it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// RNG seed for deterministic simulation.
    pub seed: u64,
    /// Target ticks per second of wall time.
    pub tick_rate: f64,
    /// Upper bound on the `dt` handed to the pipeline, in seconds.
    pub max_dt: f64,
    /// Cell size of the spatial grids.
    pub cell_size: f64,
    /// World extent entities are clamped to.
    pub bounds: Bounds,
    /// Simulated seconds in one full day/night cycle. 0 disables the cycle.
    pub day_length: f64,
    /// Simulated seconds between periodic spawns.
    pub spawn_interval: f64,
    /// Range and starting value of the shared environment.
    pub environment: EnvironmentConfig,
    /// Maximum event log size (oldest events dropped when exceeded). 0 = unlimited.
    pub max_events: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            tick_rate: 60.0,
            max_dt: 0.1,
            cell_size: 150.0,
            bounds: Bounds::default(),
            day_length: 120.0,
            spawn_interval: 5.0,
            environment: EnvironmentConfig::default(),
            max_events: 0,
        }
    }
}

impl SimConfig {
    /// Parse a JSON document and validate the result.
    pub fn from_json_str(json: &str) -> SimResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the scheduler or pipeline cannot run with.
    pub fn validate(&self) -> SimResult<()> {
        let positive = |name: &str, value: f64| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(SimError::InvalidConfig(format!(
                    "{name} must be positive, got {value}"
                )))
            }
        };
        positive("tick_rate", self.tick_rate)?;
        positive("max_dt", self.max_dt)?;
        positive("cell_size", self.cell_size)?;
        positive("bounds.width", self.bounds.width)?;
        positive("bounds.height", self.bounds.height)?;
        positive("spawn_interval", self.spawn_interval)?;
        if !(self.day_length.is_finite() && self.day_length >= 0.0) {
            return Err(SimError::InvalidConfig(format!(
                "day_length must be non-negative, got {}",
                self.day_length
            )));
        }
        let env = &self.environment;
        if !(env.min <= env.initial && env.initial <= env.max) {
            return Err(SimError::InvalidConfig(format!(
                "environment initial {} outside {}..={}",
                env.initial, env.min, env.max
            )));
        }
        Ok(())
    }

    /// Set the RNG seed for deterministic simulation.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the target tick rate in ticks per second.
    pub fn with_tick_rate(mut self, tick_rate: f64) -> Self {
        self.tick_rate = tick_rate;
        self
    }

    /// Set the largest `dt` a single tick may consume.
    pub fn with_max_dt(mut self, max_dt: f64) -> Self {
        self.max_dt = max_dt;
        self
    }

    /// Set the spatial grid cell size.
    pub fn with_cell_size(mut self, cell_size: f64) -> Self {
        self.cell_size = cell_size;
        self
    }

    /// Set the world extent.
    pub fn with_bounds(mut self, width: f64, height: f64) -> Self {
        self.bounds = Bounds::new(width, height);
        self
    }

    /// Set the length of a full day/night cycle.
    pub fn with_day_length(mut self, seconds: f64) -> Self {
        self.day_length = seconds;
        self
    }

    /// Set the default periodic spawn interval.
    pub fn with_spawn_interval(mut self, seconds: f64) -> Self {
        self.spawn_interval = seconds;
        self
    }

    /// Set the environment range and starting value.
    pub fn with_environment(mut self, min: f64, max: f64, initial: f64) -> Self {
        self.environment = EnvironmentConfig { min, max, initial };
        self
    }

    /// Set the maximum event log size (0 = unlimited).
    pub fn with_max_events(mut self, max: usize) -> Self {
        self.max_events = max;
        self
    }
}
