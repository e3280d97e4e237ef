use tracing::debug;

use crate::behavior::Behavior;
use crate::context::SimContext;
use crate::error::SimResult;
use crate::system::System;

/// Reclaims every entity queued for removal since the previous flush.
///
/// Runs first in the pipeline so every later step of the tick sees pools
/// that contain no entity marked for death in an earlier tick.
#[derive(Debug, Default)]
pub struct FlushStep {
    reclaimed: usize,
}

impl FlushStep {
    /// Create the step.
    pub fn new() -> Self {
        Self::default()
    }

    /// Entities reclaimed over the whole run.
    pub fn reclaimed(&self) -> usize {
        self.reclaimed
    }
}

impl<B: Behavior + 'static> System<B> for FlushStep {
    fn name(&self) -> &str {
        "flush"
    }

    fn tick(&mut self, ctx: &mut SimContext<'_, B>) -> SimResult<()> {
        let removed = ctx.world.flush_removals();
        if removed > 0 {
            debug!(removed, tick = ctx.tick(), "removals flushed");
        }
        self.reclaimed += removed;
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
