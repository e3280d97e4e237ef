use viv_core::EntityKey;

use crate::behavior::Behavior;
use crate::context::SimContext;
use crate::error::SimResult;
use crate::system::System;

/// Sums every live contributor's effect on the environment scalar, applies
/// it once clamped to the configured range, and queues contributors that
/// report themselves expired.
#[derive(Debug, Default)]
pub struct AccumulationStep {
    last_delta: f64,
}

impl AccumulationStep {
    /// Create the step.
    pub fn new() -> Self {
        Self::default()
    }

    /// Change actually applied on the most recent tick, after clamping.
    pub fn last_delta(&self) -> f64 {
        self.last_delta
    }
}

impl<B: Behavior + 'static> System<B> for AccumulationStep {
    fn name(&self) -> &str {
        "accumulation"
    }

    fn tick(&mut self, ctx: &mut SimContext<'_, B>) -> SimResult<()> {
        let mut total = 0.0;
        let mut expired: Vec<EntityKey> = Vec::new();
        for entity in ctx.world.entities() {
            if !entity.alive || ctx.world.is_queued(entity.key()) {
                continue;
            }
            let Some(contributor) = entity.body.as_contributor() else {
                continue;
            };
            total += contributor.contribution() * ctx.dt;
            if contributor.expired() {
                expired.push(entity.key());
            }
        }

        self.last_delta = ctx.environment.apply(total);
        for key in expired {
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
