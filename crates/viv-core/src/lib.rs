//! Core types for Vivarium: species, entities, the notification bus, the
//! spatial grid, and the entity registry.
//!
//! This crate holds the data model the simulation pipeline operates on. It
//! knows nothing about ticks or behaviors; see `viv-simulation` for those.

/// Topic-based synchronous publish/subscribe.
pub mod bus;
/// Entity identifiers, intents, and the entity record.
pub mod entity;
/// Error types used throughout the crate.
pub mod error;
/// Uniform-grid spatial index.
pub mod grid;
/// Pools, population caps, and deferred removal.
pub mod registry;
/// Species descriptors and the species table.
pub mod species;

pub use bus::{
    DispatchReport, HandlerError, HandlerResult, Notification, NotificationBus, Subscription, Topic,
};
pub use entity::{Entity, EntityId, EntityKey, Intent, Teardown};
pub use error::{CoreError, CoreResult};
pub use grid::{CellKey, SpatialGrid};
pub use registry::{
    GridSpec, PoolSpec, REMOVED, Registry, RegistryConfig, RegistryEvent, SPAWNED, nearest_within,
};
pub use species::{SpeciesDescriptor, SpeciesId, SpeciesTable};
