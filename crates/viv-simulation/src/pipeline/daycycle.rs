use tracing::info;

use crate::behavior::Behavior;
use crate::clock::DayPhase;
use crate::context::SimContext;
use crate::error::SimResult;
use crate::event::{PHASE_CHANGED, SimEventKind};
use crate::system::System;

/// Tracks the day/night phase and announces each transition on
/// [`PHASE_CHANGED`].
#[derive(Debug, Default)]
pub struct DayCycleStep {
    phase: Option<DayPhase>,
    transitions: usize,
}

impl DayCycleStep {
    /// Create the step.
    pub fn new() -> Self {
        Self::default()
    }

    /// Phase seen on the last tick.
    pub fn phase(&self) -> Option<DayPhase> {
        self.phase
    }

    /// Transitions published so far.
    pub fn transitions(&self) -> usize {
        self.transitions
    }
}

impl<B: Behavior + 'static> System<B> for DayCycleStep {
    fn name(&self) -> &str {
        "daycycle"
    }

    fn init(&mut self, ctx: &mut SimContext<'_, B>) -> SimResult<()> {
        self.phase = Some(ctx.clock.phase());
        Ok(())
    }

    fn tick(&mut self, ctx: &mut SimContext<'_, B>) -> SimResult<()> {
        let now = ctx.clock.phase();
        if let Some(previous) = self.phase
            && previous != now
        {
            info!(from = %previous, to = %now, day = ctx.clock.day(), "phase changed");
            self.transitions += 1;
            ctx.publish(
                PHASE_CHANGED,
                SimEventKind::PhaseChanged {
                    from: previous,
                    to: now,
                },
            );
        }
        self.phase = Some(now);
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
