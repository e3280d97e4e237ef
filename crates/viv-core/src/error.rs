use crate::entity::EntityKey;
use crate::species::SpeciesId;

/// Alias for `Result<T, CoreError>`.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised by the registry, grid, and species table.
///
/// Capacity exhaustion and removal of stale entities are not errors:
/// the former is reported by [`crate::Registry::can_spawn`], the latter is
/// a silent no-op.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// An operation named a pool that was never configured.
    #[error("unknown pool: \"{0}\"")]
    UnknownPool(String),

    /// An operation named a spatial grid that was never configured.
    #[error("unknown grid: \"{0}\"")]
    UnknownGrid(String),

    /// Spatial indexing was requested for a pool that has no grid.
    #[error("pool \"{0}\" is not bound to a spatial grid")]
    PoolNotIndexed(String),

    /// Two pools were configured with the same name.
    #[error("pool configured twice: \"{0}\"")]
    DuplicatePool(String),

    /// Two grids were configured with the same name.
    #[error("grid configured twice: \"{0}\"")]
    DuplicateGrid(String),

    /// Two species descriptors share an id.
    #[error("species id {0} defined twice")]
    DuplicateSpecies(SpeciesId),

    /// A species descriptor declared a population cap of zero.
    #[error("species {0} has a population cap of zero")]
    ZeroCap(SpeciesId),

    /// A species id is not present in the species table.
    #[error("unknown species: {0}")]
    UnknownSpecies(SpeciesId),

    /// Grid cell sizes must be finite and strictly positive.
    #[error("invalid cell size {size} for grid \"{grid}\"")]
    InvalidCellSize {
        /// The grid being configured.
        grid: String,
        /// The rejected cell size.
        size: f64,
    },

    /// The entity is already held by a pool.
    #[error("entity already registered: {0}")]
    DuplicateEntity(EntityKey),

    /// The entity is not held by any pool.
    #[error("entity not registered: {0}")]
    EntityNotFound(EntityKey),

    /// A species table could not be parsed.
    #[error("invalid species table: {0}")]
    SpeciesTable(#[from] serde_json::Error),
}
