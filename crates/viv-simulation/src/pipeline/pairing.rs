use std::collections::HashSet;
use std::sync::Arc;

use serde_json::json;
use tracing::debug;
use viv_core::{Entity, EntityKey, nearest_within};

use crate::behavior::Behavior;
use crate::context::SimContext;
use crate::error::SimResult;
use crate::event::World;
use crate::spawn::SpawnRequest;
use crate::system::System;

/// Matches mature breeders with the nearest eligible partner of their
/// species and asks the spawn authority for an offspring at the midpoint.
///
/// An entity pairs at most once per tick. Both partners enter their
/// species' mating cooldown whether or not the species has room for the
/// offspring; the request is skipped when the species is at its cap.
#[derive(Debug, Default)]
pub struct PairingStep {
    pairs: usize,
}

impl PairingStep {
    /// Create the step.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pairs formed over the whole run.
    pub fn pairs(&self) -> usize {
        self.pairs
    }
}

fn eligible<B: Behavior>(world: &World<B>, entity: &Entity<B>) -> bool {
    entity.alive
        && entity.mate_cooldown <= 0.0
        && entity.species.mate_radius > 0.0
        && !world.is_queued(entity.key())
        && entity
            .body
            .as_breeder()
            .is_some_and(|b| entity.age >= b.maturity())
}

impl<B: Behavior + 'static> System<B> for PairingStep {
    fn name(&self) -> &str {
        "pairing"
    }

    fn tick(&mut self, ctx: &mut SimContext<'_, B>) -> SimResult<()> {
        let dt = ctx.dt;
        for entity in ctx.world.entities_mut() {
            if entity.mate_cooldown > 0.0 {
                entity.mate_cooldown = (entity.mate_cooldown - dt).max(0.0);
            }
        }

        let world = &*ctx.world;
        let mut paired: HashSet<EntityKey> = HashSet::new();
        let mut pairs: Vec<(EntityKey, EntityKey, f64, f64)> = Vec::new();
        for entity in world.entities() {
            let key = entity.key();
            if paired.contains(&key) || !eligible(world, entity) {
                continue;
            }
            let radius = entity.species.mate_radius;
            let candidates: Vec<&Entity<B>> = match world.grid_of(key) {
                Some(grid) => world.query_within(grid, entity.x, entity.y, radius)?,
                None => world.pool(&entity.species.pool)?.iter().collect(),
            };
            let partner = nearest_within(
                entity.x,
                entity.y,
                candidates.into_iter().filter(|other| {
                    other.key() != key
                        && other.species_id() == entity.species_id()
                        && !paired.contains(&other.key())
                        && eligible(world, other)
                }),
                radius,
            );
            if let Some(partner) = partner {
                paired.insert(key);
                paired.insert(partner.key());
                pairs.push((
                    key,
                    partner.key(),
                    (entity.x + partner.x) / 2.0,
                    (entity.y + partner.y) / 2.0,
                ));
            }
        }

        for (a, b, x, y) in pairs {
            let Some(species) = ctx.world.get(a).map(|e| Arc::clone(&e.species)) else {
                continue;
            };
            for key in [a, b] {
                if let Some(entity) = ctx.world.get_mut(key) {
                    entity.mate_cooldown = species.mate_cooldown;
                }
            }
            self.pairs += 1;
            if !ctx.world.can_spawn(&species) {
                debug!(species = %species.name, "pairing without offspring; species at cap");
                continue;
            }
            debug!(%a, %b, "pair formed");
            ctx.request_spawn(
                SpawnRequest::new(species.id, x, y)
                    .with_parents([a, b])
                    .with_context(json!({ "cause": "pairing" })),
            );
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
