//! The per-tick pipeline steps, in the order [`install_standard`] registers
//! them:
//!
//! 1. [`FlushStep`] reclaims entities queued for removal.
//! 2. [`DecisionStep`] lets deciders choose an intent.
//! 3. [`MovementStep`] applies intents and reconciles grid membership.
//! 4. [`PairingStep`] matches breeders and requests offspring.
//! 5. [`AccumulationStep`] folds contributions into the environment.
//! 6. [`LifecycleStep`] ages entities and runs per-entity updates.
//! 7. [`SpawnerStep`] issues periodic spawns.
//! 8. [`DayCycleStep`] tracks the day/night phase.
//! 9. [`DeferredStep`] runs due deferred tasks.
//! 10. [`Presentation`] hands a read-only frame to a presenter.
//!
//! Applications add their own steps with
//! [`Simulation::insert_system_after`] using the step names.

mod accumulation;
mod daycycle;
mod decision;
mod deferred;
mod flush;
mod lifecycle;
mod movement;
mod pairing;
mod presentation;
mod spawner;

pub use accumulation::AccumulationStep;
pub use daycycle::DayCycleStep;
pub use decision::DecisionStep;
pub use deferred::DeferredStep;
pub use flush::FlushStep;
pub use lifecycle::LifecycleStep;
pub use movement::MovementStep;
pub use pairing::PairingStep;
pub use presentation::{
    Census, EntitySnapshot, Frame, Presentation, Presenter, Snapshot, SnapshotPresenter,
};
pub use spawner::{SpawnSchedule, SpawnerStep};

use crate::behavior::Behavior;
use crate::simulation::Simulation;

/// Register the full pipeline on `sim`, with the given periodic spawner and
/// a [`SnapshotPresenter`] capturing every `snapshot_every` ticks.
pub fn install_standard<B: Behavior + 'static>(
    sim: &mut Simulation<B>,
    spawner: SpawnerStep,
    snapshot_every: u64,
) {
    sim.add_system(FlushStep::new());
    sim.add_system(DecisionStep::new());
    sim.add_system(MovementStep::new());
    sim.add_system(PairingStep::new());
    sim.add_system(AccumulationStep::new());
    sim.add_system(LifecycleStep::new());
    sim.add_system(spawner);
    sim.add_system(DayCycleStep::new());
    sim.add_system(DeferredStep::new());
    sim.add_system(Presentation::new(SnapshotPresenter::new(snapshot_every)));
}
