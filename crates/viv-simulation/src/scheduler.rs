//! Fixed-timestep frame loop.
//!
//! The host calls [`Scheduler::frame`] from whatever callback drives it (an
//! animation frame, a timer, a synthetic clock in tests) with the current
//! wall time in milliseconds. A frame that arrives before the minimum frame
//! interval has passed is skipped. Otherwise every subsystem is updated
//! once with `dt = elapsed / 1000`, capped at the configured maximum, and
//! the last-tick timestamp advances by whole frame intervals so fractional
//! leftover time carries into the next frame.

use std::any::Any;
use std::fmt;

use tracing::trace;

use crate::config::SimConfig;
use crate::error::{SimError, SimResult};

/// Something the scheduler drives once per executed frame.
pub trait Subsystem {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Advance by `dt` seconds. Errors abort the frame and reach the caller.
    fn update(&mut self, dt: f64) -> SimResult<()>;

    /// Downcast support for [`Scheduler::get`].
    fn as_any(&self) -> &dyn Any;

    /// Downcast support for [`Scheduler::get_mut`].
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Drives registered subsystems at a capped frame rate.
pub struct Scheduler {
    interval_ms: f64,
    max_dt: f64,
    last_ms: f64,
    running: bool,
    frames: u64,
    subsystems: Vec<Box<dyn Subsystem>>,
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.subsystems.iter().map(|s| s.name()).collect();
        f.debug_struct("Scheduler")
            .field("interval_ms", &self.interval_ms)
            .field("max_dt", &self.max_dt)
            .field("running", &self.running)
            .field("frames", &self.frames)
            .field("subsystems", &names)
            .finish()
    }
}

impl Scheduler {
    /// Create a stopped scheduler targeting `tick_rate` frames per second.
    pub fn new(tick_rate: f64, max_dt: f64) -> SimResult<Self> {
        if !(tick_rate.is_finite() && tick_rate > 0.0) {
            return Err(SimError::InvalidConfig(format!(
                "tick_rate must be positive, got {tick_rate}"
            )));
        }
        if !(max_dt.is_finite() && max_dt > 0.0) {
            return Err(SimError::InvalidConfig(format!(
                "max_dt must be positive, got {max_dt}"
            )));
        }
        Ok(Self {
            interval_ms: 1000.0 / tick_rate,
            max_dt,
            last_ms: 0.0,
            running: false,
            frames: 0,
            subsystems: Vec::new(),
        })
    }

    /// Create a stopped scheduler from a run configuration.
    pub fn from_config(config: &SimConfig) -> SimResult<Self> {
        Self::new(config.tick_rate, config.max_dt)
    }

    /// Register a subsystem. Subsystems are updated in registration order.
    pub fn add<S: Subsystem + 'static>(&mut self, subsystem: S) {
        self.subsystems.push(Box::new(subsystem));
    }

    /// Begin accepting frames, measuring the first one from `now_ms`.
    /// Starting a running scheduler has no effect.
    pub fn start(&mut self, now_ms: f64) {
        if self.running {
            return;
        }
        self.running = true;
        self.last_ms = now_ms;
    }

    /// Stop accepting frames. Stopping a stopped scheduler has no effect.
    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Whether frames are being accepted.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Minimum wall time between executed frames.
    pub fn interval_ms(&self) -> f64 {
        self.interval_ms
    }

    /// Upper bound on the `dt` handed to subsystems.
    pub fn max_dt(&self) -> f64 {
        self.max_dt
    }

    /// Frames executed so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Handle one host callback. Returns the `dt` handed to the subsystems,
    /// or `None` if the frame was skipped or the scheduler is stopped.
    pub fn frame(&mut self, now_ms: f64) -> SimResult<Option<f64>> {
        if !self.running {
            return Ok(None);
        }
        let elapsed = now_ms - self.last_ms;
        if elapsed < self.interval_ms {
            trace!(elapsed, interval = self.interval_ms, "frame skipped");
            return Ok(None);
        }

        let dt = (elapsed / 1000.0).min(self.max_dt);
        self.last_ms += elapsed - (elapsed % self.interval_ms);
        self.frames += 1;

        for subsystem in &mut self.subsystems {
            subsystem.update(dt)?;
        }
        Ok(Some(dt))
    }

    /// Borrow a subsystem by concrete type.
    pub fn get<T: Subsystem + 'static>(&self) -> Option<&T> {
        self.subsystems
            .iter()
            .find_map(|s| s.as_any().downcast_ref::<T>())
    }

    /// Borrow a subsystem by concrete type, mutably.
    pub fn get_mut<T: Subsystem + 'static>(&mut self) -> Option<&mut T> {
        self.subsystems
            .iter_mut()
            .find_map(|s| s.as_any_mut().downcast_mut::<T>())
    }
}
