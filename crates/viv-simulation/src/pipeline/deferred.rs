use tracing::debug;

use crate::behavior::Behavior;
use crate::context::SimContext;
use crate::error::SimResult;
use crate::system::System;

/// Runs deferred tasks that have fallen due.
#[derive(Debug, Default)]
pub struct DeferredStep {
    ran: usize,
    dropped: usize,
}

impl DeferredStep {
    /// Create the step.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tasks run so far.
    pub fn ran(&self) -> usize {
        self.ran
    }

    /// Tasks discarded because their target was gone by the time they fell due.
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

impl<B: Behavior + 'static> System<B> for DeferredStep {
    fn name(&self) -> &str {
        "deferred"
    }

    fn tick(&mut self, ctx: &mut SimContext<'_, B>) -> SimResult<()> {
        let report = ctx.deferred.run_due(ctx.clock.elapsed(), ctx.world);
        if report.ran + report.dropped > 0 {
            debug!(ran = report.ran, dropped = report.dropped, "deferred tasks processed");
        }
        self.ran += report.ran;
        self.dropped += report.dropped;
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
