use rand::Rng;
use viv_core::{EntityKey, Intent};

use crate::behavior::{Behavior, Senses};
use crate::context::SimContext;
use crate::error::SimResult;
use crate::system::System;

/// Asks every live decider for its intent.
///
/// Intents are gathered against an immutable view of the registry and
/// written afterwards, so a decider can neither observe a neighbour's new
/// intent nor touch anything but its own.
#[derive(Debug, Default)]
pub struct DecisionStep;

impl DecisionStep {
    /// Create the step.
    pub fn new() -> Self {
        Self
    }
}

impl<B: Behavior + 'static> System<B> for DecisionStep {
    fn name(&self) -> &str {
        "decision"
    }

    fn tick(&mut self, ctx: &mut SimContext<'_, B>) -> SimResult<()> {
        let shared = ctx.shared();
        let world = &*ctx.world;
        let rng = &mut *ctx.rng;

        let mut intents: Vec<(EntityKey, Intent)> = Vec::new();
        for entity in world.entities() {
            if !entity.alive || world.is_queued(entity.key()) {
                continue;
            }
            let Some(decider) = entity.body.as_decider() else {
                continue;
            };
            let senses = Senses::new(world, &shared, rng.random::<f64>());
            intents.push((entity.key(), decider.decide(entity, &senses)?));
        }

        for (key, intent) in intents {
            if let Some(entity) = ctx.world.get_mut(key) {
                entity.intent = intent;
            }
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
