//! The entity registry: named pools, per-species id allocation, population
//! caps, spatial-grid membership, and the deferred-removal queue.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::bus::{NotificationBus, Topic};
use crate::entity::{Entity, EntityId, EntityKey, Teardown};
use crate::error::{CoreError, CoreResult};
use crate::grid::SpatialGrid;
use crate::species::{SpeciesDescriptor, SpeciesId, SpeciesTable};

/// Topic of [`RegistryEvent::Spawned`].
pub const SPAWNED: Topic = Topic("spawned");
/// Topic of [`RegistryEvent::Removed`].
pub const REMOVED: Topic = Topic("removed");

/// Notifications the registry publishes on its bus.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RegistryEvent {
    /// An entity joined a pool.
    Spawned {
        /// The new entity.
        key: EntityKey,
        /// Pool it joined.
        pool: String,
        /// Spawn position.
        x: f64,
        /// Spawn position.
        y: f64,
    },
    /// An entity was reclaimed by the removal flush.
    Removed {
        /// The reclaimed entity.
        key: EntityKey,
        /// Pool it left.
        pool: String,
    },
}

impl RegistryEvent {
    /// The topic this event is published on.
    pub fn topic(&self) -> Topic {
        match self {
            Self::Spawned { .. } => SPAWNED,
            Self::Removed { .. } => REMOVED,
        }
    }

    /// The entity the event is about.
    pub fn key(&self) -> EntityKey {
        match self {
            Self::Spawned { key, .. } | Self::Removed { key, .. } => *key,
        }
    }
}

/// A pool and the grid (if any) its members are indexed in.
#[derive(Debug, Clone)]
pub struct PoolSpec {
    /// Pool name, unique within the registry.
    pub name: String,
    /// Grid the pool's members may be indexed into.
    pub grid: Option<String>,
}

/// A named spatial grid.
#[derive(Debug, Clone)]
pub struct GridSpec {
    /// Grid name, unique within the registry.
    pub name: String,
    /// Side length of a bucket. Must be finite and positive.
    pub cell_size: f64,
}

/// Everything a registry needs at construction.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Spatial grids to create.
    pub grids: Vec<GridSpec>,
    /// Pools to create, in iteration order.
    pub pools: Vec<PoolSpec>,
    /// Species the registry may hold.
    pub species: SpeciesTable,
}

impl RegistryConfig {
    /// A configuration with no grids and no pools.
    pub fn new(species: SpeciesTable) -> Self {
        Self {
            grids: Vec::new(),
            pools: Vec::new(),
            species,
        }
    }

    /// Declare a spatial grid with the given cell size.
    pub fn with_grid(mut self, name: impl Into<String>, cell_size: f64) -> Self {
        self.grids.push(GridSpec {
            name: name.into(),
            cell_size,
        });
        self
    }

    /// Declare a pool whose members are never spatially indexed.
    pub fn with_pool(mut self, name: impl Into<String>) -> Self {
        self.pools.push(PoolSpec {
            name: name.into(),
            grid: None,
        });
        self
    }

    /// Declare a pool whose members may be indexed in `grid`.
    pub fn with_indexed_pool(mut self, name: impl Into<String>, grid: impl Into<String>) -> Self {
        self.pools.push(PoolSpec {
            name: name.into(),
            grid: Some(grid.into()),
        });
        self
    }
}

#[derive(Debug)]
struct Pool<B> {
    name: String,
    grid: Option<usize>,
    entities: Vec<Entity<B>>,
}

#[derive(Debug)]
struct NamedGrid {
    name: String,
    grid: SpatialGrid,
}

/// Owner of every live entity.
///
/// Pools keep insertion order. Removal is always deferred: callers queue
/// entities with [`Registry::queue_removal`] and the pipeline reclaims them
/// in one pass with [`Registry::flush_removals`], so no pass over a pool
/// ever observes it being spliced.
#[derive(Debug)]
pub struct Registry<B, P = RegistryEvent> {
    pools: Vec<Pool<B>>,
    grids: Vec<NamedGrid>,
    species: SpeciesTable,
    /// Entity to index of its owning pool.
    owners: HashMap<EntityKey, usize>,
    /// Entity to index of the grid it is filed in.
    indexed: HashMap<EntityKey, usize>,
    /// Registered members per species, kept in step with the pools.
    populations: HashMap<SpeciesId, usize>,
    next_ids: HashMap<SpeciesId, u32>,
    removal_queue: Vec<EntityKey>,
    queued: HashSet<EntityKey>,
    bus: Rc<NotificationBus<P>>,
    dispatch_failures: usize,
}

impl<B, P> Registry<B, P>
where
    B: Teardown,
    P: From<RegistryEvent>,
{
    /// Build a registry, rejecting inconsistent wiring: duplicate names,
    /// invalid cell sizes, pools bound to unknown grids, and species that
    /// name an unknown pool or ask for indexing in a pool without a grid.
    pub fn new(config: RegistryConfig, bus: Rc<NotificationBus<P>>) -> CoreResult<Self> {
        let mut grids: Vec<NamedGrid> = Vec::with_capacity(config.grids.len());
        for spec in config.grids {
            if !(spec.cell_size.is_finite() && spec.cell_size > 0.0) {
                return Err(CoreError::InvalidCellSize {
                    grid: spec.name,
                    size: spec.cell_size,
                });
            }
            if grids.iter().any(|g| g.name == spec.name) {
                return Err(CoreError::DuplicateGrid(spec.name));
            }
            grids.push(NamedGrid {
                name: spec.name,
                grid: SpatialGrid::new(spec.cell_size),
            });
        }

        let mut pools: Vec<Pool<B>> = Vec::with_capacity(config.pools.len());
        for spec in config.pools {
            if pools.iter().any(|p| p.name == spec.name) {
                return Err(CoreError::DuplicatePool(spec.name));
            }
            let grid = match spec.grid {
                Some(name) => Some(
                    grids
                        .iter()
                        .position(|g| g.name == name)
                        .ok_or(CoreError::UnknownGrid(name))?,
                ),
                None => None,
            };
            pools.push(Pool {
                name: spec.name,
                grid,
                entities: Vec::new(),
            });
        }

        for descriptor in config.species.iter() {
            let pool = pools
                .iter()
                .find(|p| p.name == descriptor.pool)
                .ok_or_else(|| CoreError::UnknownPool(descriptor.pool.clone()))?;
            if descriptor.indexed && pool.grid.is_none() {
                return Err(CoreError::PoolNotIndexed(pool.name.clone()));
            }
        }

        Ok(Self {
            pools,
            grids,
            species: config.species,
            owners: HashMap::new(),
            indexed: HashMap::new(),
            populations: HashMap::new(),
            next_ids: HashMap::new(),
            removal_queue: Vec::new(),
            queued: HashSet::new(),
            bus,
            dispatch_failures: 0,
        })
    }

    // -----------------------------------------------------------------------
    // Creation
    // -----------------------------------------------------------------------

    /// Allocate the next serial number for a species.
    pub fn next_id(&mut self, species: SpeciesId) -> EntityId {
        let next = self.next_ids.entry(species).or_insert(1);
        let id = EntityId(*next);
        *next += 1;
        id
    }

    /// True while the species has fewer registered members than its cap.
    ///
    /// Spawn authorities must check this before constructing an entity;
    /// [`Registry::add_to_pool`] itself does not refuse over-cap additions.
    pub fn can_spawn(&self, descriptor: &SpeciesDescriptor) -> bool {
        self.population(descriptor.id) < descriptor.cap
    }

    /// Append an entity to a pool, optionally filing it in the pool's grid,
    /// and publish [`RegistryEvent::Spawned`].
    pub fn add_to_pool(&mut self, entity: Entity<B>, pool: &str, index: bool) -> CoreResult<EntityKey> {
        let pool_idx = self.pool_index(pool)?;
        let grid_idx = if index {
            Some(
                self.pools[pool_idx]
                    .grid
                    .ok_or_else(|| CoreError::PoolNotIndexed(pool.to_string()))?,
            )
        } else {
            None
        };

        let key = entity.key();
        if self.owners.contains_key(&key) {
            return Err(CoreError::DuplicateEntity(key));
        }

        // Keep allocation ahead of externally chosen ids.
        let next = self.next_ids.entry(key.species).or_insert(1);
        *next = (*next).max(key.id.0 + 1);

        let (x, y) = (entity.x, entity.y);
        if let Some(g) = grid_idx {
            self.grids[g].grid.add(key, x, y);
            self.indexed.insert(key, g);
        }
        self.pools[pool_idx].entities.push(entity);
        self.owners.insert(key, pool_idx);
        *self.populations.entry(key.species).or_insert(0) += 1;

        debug!(%key, pool, x, y, "entity spawned");
        self.publish(RegistryEvent::Spawned {
            key,
            pool: pool.to_string(),
            x,
            y,
        });
        Ok(key)
    }

    // -----------------------------------------------------------------------
    // Removal
    // -----------------------------------------------------------------------

    /// Mark an entity for reclamation at the next flush. Queuing the same
    /// entity again, or one that is no longer registered, has no effect
    /// beyond the first call. Returns `true` if the entity was newly queued.
    pub fn queue_removal(&mut self, key: EntityKey) -> bool {
        if self.queued.insert(key) {
            self.removal_queue.push(key);
            true
        } else {
            false
        }
    }

    /// Reclaim every queued entity: remove it from its pool and grid, run
    /// its teardown hook, and publish [`RegistryEvent::Removed`]. Stale
    /// entries are skipped silently. Returns the number of entities removed.
    pub fn flush_removals(&mut self) -> usize {
        if self.removal_queue.is_empty() {
            return 0;
        }
        let queue = std::mem::take(&mut self.removal_queue);
        self.queued.clear();

        let mut removed = 0;
        for key in queue {
            let Some(pool_idx) = self.owners.remove(&key) else {
                debug!(%key, "removal of unregistered entity ignored");
                continue;
            };
            let pool = &mut self.pools[pool_idx];
            let Some(position) = pool.entities.iter().position(|e| e.key() == key) else {
                continue;
            };
            let mut entity = pool.entities.remove(position);
            let pool_name = pool.name.clone();

            if let Some(g) = self.indexed.remove(&key) {
                self.grids[g].grid.remove(key);
            }
            if let Some(count) = self.populations.get_mut(&key.species) {
                *count = count.saturating_sub(1);
            }

            entity.body.teardown(key);
            debug!(%key, pool = %pool_name, "entity removed");
            self.publish(RegistryEvent::Removed {
                key,
                pool: pool_name,
            });
            removed += 1;
        }
        removed
    }

    // -----------------------------------------------------------------------
    // Spatial membership
    // -----------------------------------------------------------------------

    /// Reconcile `grid` after an entity moved away from
    /// `(previous_x, previous_y)` to its current position. Does nothing if
    /// the bucket is unchanged or the entity is not filed in that grid.
    /// Returns `true` if the entity changed bucket.
    pub fn update_spatial_position(
        &mut self,
        key: EntityKey,
        previous_x: f64,
        previous_y: f64,
        grid: &str,
    ) -> CoreResult<bool> {
        let grid_idx = self.grid_index(grid)?;
        let (x, y) = {
            let entity = self.get(key).ok_or(CoreError::EntityNotFound(key))?;
            (entity.x, entity.y)
        };
        if self.indexed.get(&key) != Some(&grid_idx) {
            return Ok(false);
        }
        Ok(self.grids[grid_idx]
            .grid
            .update(key, previous_x, previous_y, x, y))
    }

    /// Set an entity's position and reconcile whatever grid it is filed in.
    pub fn move_entity(&mut self, key: EntityKey, x: f64, y: f64) -> CoreResult<()> {
        let (previous_x, previous_y) = {
            let entity = self.get_mut(key).ok_or(CoreError::EntityNotFound(key))?;
            let previous = (entity.x, entity.y);
            entity.x = x;
            entity.y = y;
            previous
        };
        if let Some(&g) = self.indexed.get(&key) {
            self.grids[g].grid.update(key, previous_x, previous_y, x, y);
        }
        Ok(())
    }

    fn publish(&mut self, event: RegistryEvent) {
        let report = self.bus.publish(event.topic(), P::from(event));
        self.dispatch_failures += report.failures.len();
    }
}

impl<B, P> Registry<B, P> {
    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    /// Look up an entity by key.
    pub fn get(&self, key: EntityKey) -> Option<&Entity<B>> {
        let pool = &self.pools[*self.owners.get(&key)?];
        pool.entities.iter().find(|e| e.key() == key)
    }

    /// Look up an entity by key for mutation.
    pub fn get_mut(&mut self, key: EntityKey) -> Option<&mut Entity<B>> {
        let pool_idx = *self.owners.get(&key)?;
        self.pools[pool_idx]
            .entities
            .iter_mut()
            .find(|e| e.key() == key)
    }

    /// Whether the entity is held by a pool.
    pub fn contains(&self, key: EntityKey) -> bool {
        self.owners.contains_key(&key)
    }

    /// Whether the entity waits for the next flush.
    pub fn is_queued(&self, key: EntityKey) -> bool {
        self.queued.contains(&key)
    }

    /// Number of entities waiting for the next flush.
    pub fn pending_removals(&self) -> usize {
        self.removal_queue.len()
    }

    /// Entities awaiting the next flush, in queue order.
    pub fn queued_keys(&self) -> &[EntityKey] {
        &self.removal_queue
    }

    /// Registered, alive, and not queued for removal.
    pub fn is_live(&self, key: EntityKey) -> bool {
        !self.queued.contains(&key) && self.get(key).is_some_and(|e| e.alive)
    }

    /// Name of the pool holding an entity.
    pub fn pool_of(&self, key: EntityKey) -> Option<&str> {
        self.owners
            .get(&key)
            .map(|&idx| self.pools[idx].name.as_str())
    }

    /// Name of the grid an entity is filed in.
    pub fn grid_of(&self, key: EntityKey) -> Option<&str> {
        self.indexed
            .get(&key)
            .map(|&idx| self.grids[idx].name.as_str())
    }

    /// Members of a pool, in insertion order.
    pub fn pool(&self, name: &str) -> CoreResult<&[Entity<B>]> {
        let idx = self.pool_index(name)?;
        Ok(&self.pools[idx].entities)
    }

    /// Configured pool names, in configuration order.
    pub fn pool_names(&self) -> impl Iterator<Item = &str> {
        self.pools.iter().map(|p| p.name.as_str())
    }

    /// Every registered entity, pool by pool in configuration order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity<B>> {
        self.pools.iter().flat_map(|p| p.entities.iter())
    }

    /// Mutable access to every entity. Callers that change a position must
    /// reconcile the grid with [`Registry::update_spatial_position`].
    pub fn entities_mut(&mut self) -> impl Iterator<Item = &mut Entity<B>> {
        self.pools.iter_mut().flat_map(|p| p.entities.iter_mut())
    }

    /// Keys of every registered entity, in iteration order.
    pub fn keys(&self) -> Vec<EntityKey> {
        self.entities().map(Entity::key).collect()
    }

    /// Total number of registered entities.
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    /// `true` if no pool holds an entity.
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    // -----------------------------------------------------------------------
    // Species and populations
    // -----------------------------------------------------------------------

    /// Look up a species descriptor.
    pub fn species(&self, id: SpeciesId) -> Option<&Arc<SpeciesDescriptor>> {
        self.species.get(id)
    }

    /// All species the registry knows.
    pub fn species_table(&self) -> &SpeciesTable {
        &self.species
    }

    /// Registered members of a species, from the cached count.
    pub fn population(&self, species: SpeciesId) -> usize {
        self.populations.get(&species).copied().unwrap_or(0)
    }

    /// Registered members of a species, counted by scanning every pool.
    pub fn count_live(&self, species: SpeciesId) -> usize {
        self.entities()
            .filter(|e| e.species_id() == species)
            .count()
    }

    // -----------------------------------------------------------------------
    // Spatial queries
    // -----------------------------------------------------------------------

    /// Borrow a grid by name.
    pub fn grid(&self, name: &str) -> CoreResult<&SpatialGrid> {
        let idx = self.grid_index(name)?;
        Ok(&self.grids[idx].grid)
    }

    /// Entities filed in `grid` whose exact distance from `(x, y)` is at
    /// most `radius`, in bucket order.
    pub fn query_within(&self, grid: &str, x: f64, y: f64, radius: f64) -> CoreResult<Vec<&Entity<B>>> {
        let radius_sq = radius * radius;
        Ok(self
            .grid(grid)?
            .query(x, y, radius)
            .into_iter()
            .filter_map(|key| self.get(key))
            .filter(|e| e.distance_sq_to(x, y) <= radius_sq)
            .collect())
    }

    /// The closest entity in `grid` strictly within `max_distance` of
    /// `(x, y)` that satisfies `filter`.
    pub fn nearest_in<F>(
        &self,
        grid: &str,
        x: f64,
        y: f64,
        max_distance: f64,
        filter: F,
    ) -> CoreResult<Option<&Entity<B>>>
    where
        F: Fn(&Entity<B>) -> bool,
    {
        let candidates = self
            .grid(grid)?
            .query(x, y, max_distance)
            .into_iter()
            .filter_map(|key| self.get(key))
            .filter(|e| filter(e));
        Ok(nearest_within(x, y, candidates, max_distance))
    }

    /// The bus registry notices are published on.
    pub fn bus(&self) -> &Rc<NotificationBus<P>> {
        &self.bus
    }

    /// Subscriber failures observed while publishing registry events.
    pub fn dispatch_failures(&self) -> usize {
        self.dispatch_failures
    }

    fn pool_index(&self, name: &str) -> CoreResult<usize> {
        self.pools
            .iter()
            .position(|p| p.name == name)
            .ok_or_else(|| CoreError::UnknownPool(name.to_string()))
    }

    fn grid_index(&self, name: &str) -> CoreResult<usize> {
        self.grids
            .iter()
            .position(|g| g.name == name)
            .ok_or_else(|| CoreError::UnknownGrid(name.to_string()))
    }
}

/// The candidate closest to `(x, y)` whose distance is strictly less than
/// `max_distance`. On equal distances the first candidate encountered wins.
pub fn nearest_within<'a, B: 'a>(
    x: f64,
    y: f64,
    candidates: impl IntoIterator<Item = &'a Entity<B>>,
    max_distance: f64,
) -> Option<&'a Entity<B>> {
    let mut best: Option<(&Entity<B>, f64)> = None;
    let limit = max_distance * max_distance;
    for candidate in candidates {
        let d = candidate.distance_sq_to(x, y);
        if d >= limit {
            continue;
        }
        match best {
            Some((_, best_d)) if d >= best_d => {}
            _ => best = Some((candidate, d)),
        }
    }
    best.map(|(e, _)| e)
}
