use std::sync::Arc;

use rand::Rng;
use serde_json::json;
use viv_core::{CoreError, SpeciesId};

use crate::behavior::Behavior;
use crate::context::SimContext;
use crate::error::SimResult;
use crate::spawn::SpawnRequest;
use crate::system::System;

/// A species spawned every `interval` simulated seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnSchedule {
    /// Species to spawn.
    pub species: SpeciesId,
    /// Simulated seconds between spawns.
    pub interval: f64,
    accumulated: f64,
}

impl SpawnSchedule {
    /// A schedule with nothing accumulated yet.
    pub fn new(species: SpeciesId, interval: f64) -> Self {
        Self {
            species,
            interval,
            accumulated: 0.0,
        }
    }

    /// Simulated seconds accumulated towards the next spawn.
    pub fn accumulated(&self) -> f64 {
        self.accumulated
    }
}

/// Requests periodic spawns at random positions.
///
/// Time is accumulated per schedule and drained in whole intervals, so the
/// number of spawns over a run depends on simulated time only, never on
/// how that time was sliced into ticks. Spawns due while the species is at
/// its cap are skipped rather than deferred.
#[derive(Debug, Default)]
pub struct SpawnerStep {
    schedules: Vec<SpawnSchedule>,
    requested: usize,
}

impl SpawnerStep {
    /// A spawner with no schedules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a periodic spawn of `species`.
    pub fn with_schedule(mut self, species: SpeciesId, interval: f64) -> Self {
        self.schedules.push(SpawnSchedule::new(species, interval));
        self
    }

    /// Configured schedules.
    pub fn schedules(&self) -> &[SpawnSchedule] {
        &self.schedules
    }

    /// Spawn requests issued over the whole run.
    pub fn requested(&self) -> usize {
        self.requested
    }
}

impl<B: Behavior + 'static> System<B> for SpawnerStep {
    fn name(&self) -> &str {
        "spawner"
    }

    fn init(&mut self, ctx: &mut SimContext<'_, B>) -> SimResult<()> {
        for schedule in &self.schedules {
            if ctx.world.species(schedule.species).is_none() {
                return Err(CoreError::UnknownSpecies(schedule.species).into());
            }
        }
        Ok(())
    }

    fn tick(&mut self, ctx: &mut SimContext<'_, B>) -> SimResult<()> {
        let bounds = ctx.config.bounds;
        for schedule in &mut self.schedules {
            if !(schedule.interval.is_finite() && schedule.interval > 0.0) {
                continue;
            }
            schedule.accumulated += ctx.dt;
            if schedule.accumulated < schedule.interval {
                continue;
            }
            let whole = (schedule.accumulated / schedule.interval).floor();
            schedule.accumulated = (schedule.accumulated - whole * schedule.interval).max(0.0);

            let species_id = schedule.species;
            let species = ctx
                .world
                .species(species_id)
                .map(Arc::clone)
                .ok_or(CoreError::UnknownSpecies(species_id))?;
            // Requests are fulfilled after this step, so the room is fixed here.
            let room = species.cap.saturating_sub(ctx.world.population(species_id));
            let due = (whole as usize).min(room);

            for _ in 0..due {
                let x = ctx.rng.random_range(0.0..=bounds.width);
                let y = ctx.rng.random_range(0.0..=bounds.height);
                ctx.request_spawn(
                    SpawnRequest::new(species_id, x, y).with_context(json!({ "cause": "periodic" })),
                );
                self.requested += 1;
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
