use crate::context::SimContext;
use crate::error::SimResult;

/// One step of the per-tick pipeline.
///
/// Systems are executed in registration order. Each system receives
/// a mutable context providing access to the registry, clock, environment,
/// deferred queue, and RNG.
pub trait System<B>: std::fmt::Debug {
    /// Human-readable name for this system. Names identify insertion points
    /// for [`crate::Simulation::insert_system_after`].
    fn name(&self) -> &str;

    /// Called once per tick.
    fn tick(&mut self, ctx: &mut SimContext<'_, B>) -> SimResult<()>;

    /// Called once before the first tick. Optional setup hook.
    fn init(&mut self, _ctx: &mut SimContext<'_, B>) -> SimResult<()> {
        Ok(())
    }

    /// Support downcasting to concrete types.
    fn as_any(&self) -> &dyn std::any::Any;

    /// Support downcasting to concrete types.
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;
}
