use std::fmt;

use serde::{Deserialize, Serialize};

/// Half of the day/night cycle an instant falls in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DayPhase {
    /// Light half of the cycle.
    Day,
    /// Dark half of the cycle.
    Night,
}

impl fmt::Display for DayPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Day => write!(f, "day"),
            Self::Night => write!(f, "night"),
        }
    }
}

/// Tracks simulation time: a monotonic tick counter and the simulated
/// seconds elapsed since the run started.
///
/// Each day lasts `day_length` simulated seconds; the first half is day,
/// the second half night. A `day_length` of zero keeps the clock in
/// perpetual daylight.
#[derive(Debug, Clone)]
pub struct SimClock {
    tick: u64,
    elapsed: f64,
    last_dt: f64,
    day_length: f64,
}

impl SimClock {
    /// A clock at tick zero with the given cycle length in seconds.
    pub fn new(day_length: f64) -> Self {
        Self {
            tick: 0,
            elapsed: 0.0,
            last_dt: 0.0,
            day_length,
        }
    }

    /// Advance the clock by one tick of `dt` seconds. Returns the new tick number.
    pub fn advance(&mut self, dt: f64) -> u64 {
        self.tick += 1;
        self.elapsed += dt;
        self.last_dt = dt;
        self.tick
    }

    /// Ticks completed so far.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Simulated seconds since the start of the run.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// The `dt` of the most recent tick.
    pub fn last_dt(&self) -> f64 {
        self.last_dt
    }

    /// Seconds per full day/night cycle.
    pub fn day_length(&self) -> f64 {
        self.day_length
    }

    /// Position within the current day, `0.0..1.0`.
    pub fn time_of_day(&self) -> f64 {
        if self.day_length <= 0.0 {
            return 0.0;
        }
        (self.elapsed % self.day_length) / self.day_length
    }

    /// Number of completed days.
    pub fn day(&self) -> u64 {
        if self.day_length <= 0.0 {
            return 0;
        }
        (self.elapsed / self.day_length).floor() as u64
    }

    /// Phase at the current elapsed time.
    pub fn phase(&self) -> DayPhase {
        if self.time_of_day() < 0.5 {
            DayPhase::Day
        } else {
            DayPhase::Night
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_initial_state() {
        let clock = SimClock::new(10.0);
        assert_eq!(clock.tick(), 0);
        assert_eq!(clock.elapsed(), 0.0);
        assert_eq!(clock.phase(), DayPhase::Day);
    }

    #[test]
    fn clock_advance_accumulates_dt() {
        let mut clock = SimClock::new(10.0);
        clock.advance(0.5);
        clock.advance(0.25);
        assert_eq!(clock.advance(0.25), 3);
        assert!((clock.elapsed() - 1.0).abs() < f64::EPSILON);
        assert!((clock.last_dt() - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn phase_follows_half_days() {
        let mut clock = SimClock::new(10.0);
        clock.advance(4.0);
        assert_eq!(clock.phase(), DayPhase::Day);
        clock.advance(2.0);
        assert_eq!(clock.phase(), DayPhase::Night);
        clock.advance(5.0);
        assert_eq!(clock.phase(), DayPhase::Day);
        assert_eq!(clock.day(), 1);
    }

    #[test]
    fn zero_day_length_stays_day() {
        let mut clock = SimClock::new(0.0);
        clock.advance(1000.0);
        assert_eq!(clock.phase(), DayPhase::Day);
        assert_eq!(clock.day(), 0);
    }
}
