//! Entity behavior and the capabilities a body may declare.
//!
//! The body type `B` of an [`Entity`] is a closed set of variants supplied
//! by the application. It implements [`Behavior`] and opts into the
//! decision, pairing and accumulation steps by returning a capability from
//! [`Behavior::as_decider`], [`Behavior::as_breeder`] or
//! [`Behavior::as_contributor`].

use viv_core::{CoreResult, Entity, Intent, Teardown};

use crate::clock::DayPhase;
use crate::event::World;

/// Read-only view of the shared state handed to every behavior.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shared {
    /// Ticks completed before this one.
    pub tick: u64,
    /// Simulated seconds since the start of the run.
    pub time: f64,
    /// Seconds covered by this tick.
    pub dt: f64,
    /// Current value of the environment scalar.
    pub environment: f64,
    /// The environment scalar normalized to `0.0..=1.0`.
    pub environment_level: f64,
    /// Current day phase.
    pub phase: DayPhase,
}

/// What the per-entity update decided about the entity's survival.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transition {
    /// Keep living.
    #[default]
    Live,
    /// Die and be queued for removal.
    Die,
}

/// Per-variant behavior of an entity body.
pub trait Behavior: Teardown + Sized {
    /// Advance the body's own state by `dt` seconds.
    fn update(&mut self, _dt: f64, _shared: &Shared) -> Transition {
        Transition::Live
    }

    /// Decision capability, if the variant steers itself.
    fn as_decider(&self) -> Option<&dyn Decider<Self>> {
        None
    }

    /// Breeding capability, if the variant pairs up.
    fn as_breeder(&self) -> Option<&dyn Breeder> {
        None
    }

    /// Environment contribution, if the variant has one.
    fn as_contributor(&self) -> Option<&dyn Contributor> {
        None
    }
}

/// A body that chooses an [`Intent`] each tick.
///
/// Deciders only see the world; the decision step writes the returned
/// intent to the acting entity and nothing else.
pub trait Decider<B> {
    /// Choose the next intent for `me`.
    ///
    /// Wiring errors from [`Senses::nearest`] must be returned, not read as
    /// an empty neighbourhood; they abort the tick.
    fn decide(&self, me: &Entity<B>, senses: &Senses<'_, B>) -> CoreResult<Intent>;
}

/// A body that pairs with a nearby member of its species.
pub trait Breeder {
    /// Age in seconds before pairing is possible.
    fn maturity(&self) -> f64;
}

/// A body that feeds the environment scalar.
pub trait Contributor {
    /// Change to the environment per second. Negative values consume.
    fn contribution(&self) -> f64;

    /// Expired contributors are queued for removal by the accumulation step.
    fn expired(&self) -> bool {
        false
    }
}

/// What a decider can perceive.
pub struct Senses<'a, B> {
    world: &'a World<B>,
    shared: &'a Shared,
    roll: f64,
}

impl<'a, B> Senses<'a, B> {
    /// Bundle a read-only world view for one decision.
    pub fn new(world: &'a World<B>, shared: &'a Shared, roll: f64) -> Self {
        Self { world, shared, roll }
    }

    /// The registry, read-only.
    pub fn world(&self) -> &'a World<B> {
        self.world
    }

    /// Tick-wide shared values.
    pub fn shared(&self) -> &Shared {
        self.shared
    }

    /// A uniform random number in `0.0..1.0`, drawn for this entity this tick.
    pub fn roll(&self) -> f64 {
        self.roll
    }

    /// The nearest live entity in `grid` strictly within `radius` of `me`
    /// that satisfies `filter`. `me` is never returned.
    pub fn nearest<F>(&self, me: &Entity<B>, grid: &str, radius: f64, filter: F) -> CoreResult<Option<&'a Entity<B>>>
    where
        F: Fn(&Entity<B>) -> bool,
    {
        let key = me.key();
        let world = self.world;
        world.nearest_in(grid, me.x, me.y, radius, |other| {
            other.key() != key && other.alive && !world.is_queued(other.key()) && filter(other)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Rock;
    impl Teardown for Rock {}
    impl Behavior for Rock {}

    #[test]
    fn default_behavior_has_no_capabilities() {
        let shared = Shared {
            tick: 0,
            time: 0.0,
            dt: 0.1,
            environment: 0.0,
            environment_level: 0.0,
            phase: DayPhase::Day,
        };
        let mut rock = Rock;
        assert_eq!(rock.update(0.1, &shared), Transition::Live);
        assert!(rock.as_decider().is_none());
        assert!(rock.as_breeder().is_none());
        assert!(rock.as_contributor().is_none());
    }
}
