use std::sync::Arc;

use tracing::debug;
use viv_core::{CoreError, Entity, EntityKey};
use viv_simulation::{SimError, SimResult, SpawnAuthority, SpawnRequest, World};

use super::creature::Creature;
use super::{FLORA_POOL, HERD_POOL, PACK_POOL};

/// Hunger a grazer is born with.
const NEWBORN_HUNGER: f64 = 0.3;

/// Builds creatures for spawn requests. The body variant follows the pool
/// the species lives in.
#[derive(Debug, Default)]
pub struct EcosystemAuthority;

impl EcosystemAuthority {
    pub fn new() -> Self {
        Self
    }
}

/// The body a member of `pool` starts with, if the pool is inhabited.
pub fn newborn(pool: &str) -> Option<Creature> {
    match pool {
        FLORA_POOL => Some(Creature::Plant { vigor: 1.0 }),
        HERD_POOL => Some(Creature::Grazer {
            hunger: NEWBORN_HUNGER,
        }),
        PACK_POOL => Some(Creature::Hunter { hunger: 0.0 }),
        _ => None,
    }
}

impl SpawnAuthority<Creature> for EcosystemAuthority {
    fn fulfil(&mut self, request: &SpawnRequest, world: &mut World<Creature>) -> SimResult<Option<EntityKey>> {
        let species = world
            .species(request.species)
            .map(Arc::clone)
            .ok_or(CoreError::UnknownSpecies(request.species))?;
        if !world.can_spawn(&species) {
            return Ok(None);
        }
        let body = newborn(&species.pool).ok_or_else(|| {
            SimError::system("ecosystem", format!("no creature lives in pool \"{}\"", species.pool))
        })?;

        let id = world.next_id(species.id);
        let pool = species.pool.clone();
        let indexed = species.indexed;
        let name = species.name.clone();
        let key = world.add_to_pool(Entity::new(id, species, request.x, request.y, body), &pool, indexed)?;
        debug!(%key, species = %name, cause = %request.context["cause"], "creature born");
        Ok(Some(key))
    }
}
