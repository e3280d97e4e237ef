use std::collections::HashSet;

use viv_core::EntityKey;

use crate::behavior::Behavior;
use crate::context::SimContext;
use crate::error::SimResult;
use crate::system::System;

/// Applies each entity's intent to its position, keeps it inside the world
/// bounds, and reconciles the spatial grid it is filed in.
#[derive(Debug, Default)]
pub struct MovementStep;

impl MovementStep {
    /// Create the step.
    pub fn new() -> Self {
        Self
    }
}

impl<B: Behavior + 'static> System<B> for MovementStep {
    fn name(&self) -> &str {
        "movement"
    }

    fn tick(&mut self, ctx: &mut SimContext<'_, B>) -> SimResult<()> {
        let dt = ctx.dt;
        let bounds = ctx.config.bounds;
        let queued: HashSet<EntityKey> = ctx.world.queued_keys().iter().copied().collect();

        let mut moved: Vec<(EntityKey, f64, f64)> = Vec::new();
        for entity in ctx.world.entities_mut() {
            if !entity.alive || entity.intent.is_idle() || queued.contains(&entity.key()) {
                continue;
            }
            let (previous_x, previous_y) = (entity.x, entity.y);
            let (x, y) = bounds.clamp(
                entity.x + entity.intent.vx * dt,
                entity.y + entity.intent.vy * dt,
            );
            entity.x = x;
            entity.y = y;
            moved.push((entity.key(), previous_x, previous_y));
        }

        for (key, previous_x, previous_y) in moved {
            let Some(grid) = ctx.world.grid_of(key).map(str::to_owned) else {
                continue;
            };
            ctx.world
                .update_spatial_position(key, previous_x, previous_y, &grid)?;
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
