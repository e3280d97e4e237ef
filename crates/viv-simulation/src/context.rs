use rand::rngs::StdRng;
use viv_core::{DispatchReport, Entity, EntityKey, Topic};

use crate::behavior::Shared;
use crate::clock::SimClock;
use crate::config::SimConfig;
use crate::deferred::DeferredQueue;
use crate::environment::Environment;
use crate::event::{SimEventKind, World};
use crate::spawn::{SPAWN_REQUESTED, SpawnRequest};

/// Mutable context passed to each system during a tick.
pub struct SimContext<'a, B> {
    /// The entity registry.
    pub world: &'a mut World<B>,
    /// Clock as of the start of this tick.
    pub clock: &'a SimClock,
    /// Run configuration.
    pub config: &'a SimConfig,
    /// The shared environment scalar.
    pub environment: &'a mut Environment,
    /// Time-delayed effects.
    pub deferred: &'a mut DeferredQueue<B>,
    /// Seeded random source for this run.
    pub rng: &'a mut StdRng,
    /// Subscriber failures seen by publishes made through this context.
    pub dispatch_failures: &'a mut usize,
    /// Seconds covered by this tick.
    pub dt: f64,
}

impl<B> SimContext<'_, B> {
    /// The tick being executed.
    pub fn tick(&self) -> u64 {
        self.clock.tick()
    }

    /// Snapshot of the state behaviors may read.
    pub fn shared(&self) -> Shared {
        Shared {
            tick: self.clock.tick(),
            time: self.clock.elapsed(),
            dt: self.dt,
            environment: self.environment.value(),
            environment_level: self.environment.level(),
            phase: self.clock.phase(),
        }
    }

    /// Publish on the simulation bus.
    pub fn publish(&mut self, topic: Topic, payload: SimEventKind) -> DispatchReport {
        let report = self.world.bus().publish(topic, payload);
        *self.dispatch_failures += report.failures.len();
        report
    }

    /// Ask the spawn authority for a new entity. The request is fulfilled
    /// once the current step returns.
    pub fn request_spawn(&mut self, request: SpawnRequest) -> DispatchReport {
        self.publish(SPAWN_REQUESTED, SimEventKind::SpawnRequested(request))
    }

    /// Run `action` on `target` after `delay` simulated seconds, provided
    /// the target is still live by then.
    pub fn defer<F>(&mut self, delay: f64, target: EntityKey, label: impl Into<String>, action: F)
    where
        F: FnOnce(&mut Entity<B>) + 'static,
    {
        let due = self.clock.elapsed() + delay;
        self.deferred.schedule(due, target, label, action);
    }
}
