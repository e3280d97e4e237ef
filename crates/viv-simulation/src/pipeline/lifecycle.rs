use std::collections::HashSet;

use tracing::debug;
use viv_core::EntityKey;

use crate::behavior::{Behavior, Transition};
use crate::context::SimContext;
use crate::error::SimResult;
use crate::system::System;

/// Ages every entity, runs its per-entity update, and queues the dead.
///
/// An entity dies when it outlives its species lifespan, when its update
/// returns [`Transition::Die`], or when something else already cleared its
/// `alive` flag.
#[derive(Debug, Default)]
pub struct LifecycleStep {
    deaths: usize,
}

impl LifecycleStep {
    /// Create the step.
    pub fn new() -> Self {
        Self::default()
    }

    /// Entities this step has marked for removal over the whole run.
    pub fn deaths(&self) -> usize {
        self.deaths
    }
}

impl<B: Behavior + 'static> System<B> for LifecycleStep {
    fn name(&self) -> &str {
        "lifecycle"
    }

    fn tick(&mut self, ctx: &mut SimContext<'_, B>) -> SimResult<()> {
        let dt = ctx.dt;
        let shared = ctx.shared();
        let queued: HashSet<EntityKey> = ctx.world.queued_keys().iter().copied().collect();

        let mut dead: Vec<EntityKey> = Vec::new();
        for entity in ctx.world.entities_mut() {
            let key = entity.key();
            if queued.contains(&key) {
                continue;
            }
            if entity.alive {
                entity.age += dt;
                if entity.is_expired() {
                    debug!(%key, age = entity.age, "lifespan reached");
                    entity.alive = false;
                } else if entity.body.update(dt, &shared) == Transition::Die {
                    debug!(%key, "entity died");
                    entity.alive = false;
                }
            }
            if !entity.alive {
                dead.push(key);
            }
        }

        self.deaths += dead.len();
        for key in dead {
            ctx.world.queue_removal(key);
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
