//! The demo ecosystem: plants feeding a shared pasture, grazers living off
//! it, and hunters living off the grazers.

pub mod authority;
pub mod creature;
pub mod predation;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;
use tracing::info;
use viv_core::{RegistryConfig, SpeciesTable};
use viv_simulation::pipeline::{SpawnerStep, install_standard};
use viv_simulation::{SimConfig, SimError, SimResult, Simulation, SpawnRequest};

pub use authority::EcosystemAuthority;
pub use creature::Creature;
pub use predation::{PREDATION, PredationStep};

pub const FLORA_POOL: &str = "flora";
pub const HERD_POOL: &str = "herd";
pub const PACK_POOL: &str = "pack";

pub const FLORA_GRID: &str = "flora";
pub const FAUNA_GRID: &str = "fauna";

/// Species table used when no `--species` file is given.
pub const DEFAULT_SPECIES: &str = r#"[
  {
    "id": 1,
    "name": "plant",
    "cap": 60,
    "pool": "flora",
    "lifespan": 90.0
  },
  {
    "id": 2,
    "name": "grazer",
    "cap": 30,
    "pool": "herd",
    "speed": 40.0,
    "lifespan": 120.0,
    "sense_radius": 200.0,
    "mate_radius": 25.0,
    "mate_cooldown": 8.0
  },
  {
    "id": 3,
    "name": "hunter",
    "cap": 8,
    "pool": "pack",
    "speed": 55.0,
    "lifespan": 150.0,
    "sense_radius": 260.0
  }
]"#;

/// Parse [`DEFAULT_SPECIES`].
pub fn default_species() -> SimResult<SpeciesTable> {
    Ok(SpeciesTable::from_json_str(DEFAULT_SPECIES)?)
}

/// Grids and pools of the ecosystem. Plants are filed in the flora grid;
/// grazers and hunters share the fauna grid.
pub fn registry_config(species: SpeciesTable, cell_size: f64) -> RegistryConfig {
    RegistryConfig::new(species)
        .with_grid(FLORA_GRID, cell_size)
        .with_grid(FAUNA_GRID, cell_size)
        .with_indexed_pool(FLORA_POOL, FLORA_GRID)
        .with_indexed_pool(HERD_POOL, FAUNA_GRID)
        .with_indexed_pool(PACK_POOL, FAUNA_GRID)
}

/// Assemble a ready-to-run ecosystem.
///
/// Every species must live in one of the three pools. The standard pipeline
/// is installed with predation right after movement, plant species respawn
/// every `spawn_interval` seconds, and each species starts at half its cap
/// at seeded random positions.
pub fn build(config: SimConfig, species: SpeciesTable) -> SimResult<Simulation<Creature>> {
    for descriptor in species.iter() {
        if authority::newborn(&descriptor.pool).is_none() {
            return Err(SimError::InvalidConfig(format!(
                "species \"{}\" lives in pool \"{}\"; expected one of {FLORA_POOL}, {HERD_POOL}, {PACK_POOL}",
                descriptor.name, descriptor.pool
            )));
        }
    }

    let mut spawner = SpawnerStep::new();
    for descriptor in species.iter().filter(|d| d.pool == FLORA_POOL) {
        spawner = spawner.with_schedule(descriptor.id, config.spawn_interval);
    }
    let initial: Vec<_> = species.iter().map(|d| (d.id, d.cap / 2)).collect();

    let mut rng = StdRng::seed_from_u64(config.seed);
    let bounds = config.bounds;
    let registry = registry_config(species, config.cell_size);

    let mut sim = Simulation::new(config, registry)?.with_authority(EcosystemAuthority::new());
    sim.watch(PREDATION);
    install_standard(&mut sim, spawner, 1);
    sim.insert_system_after("movement", PredationStep::new())?;

    for (id, count) in initial {
        for _ in 0..count {
            let x = rng.random_range(0.0..=bounds.width);
            let y = rng.random_range(0.0..=bounds.height);
            sim.spawn(SpawnRequest::new(id, x, y).with_context(json!({ "cause": "initial" })))?;
        }
    }
    info!(entities = sim.world().len(), "ecosystem populated");
    Ok(sim)
}
