//! Creation requests and the authority that fulfils them.
//!
//! Pipeline steps never construct entities. They publish a
//! [`SpawnRequest`] on [`SPAWN_REQUESTED`]; the simulation collects
//! requests through a bus subscription and, once the requesting step has
//! finished, hands each one to the application's [`SpawnAuthority`].

use serde::Serialize;
use viv_core::{EntityKey, SpeciesId, Topic};

use crate::error::SimResult;
use crate::event::World;

/// Topic carrying [`crate::event::SimEventKind::SpawnRequested`].
pub const SPAWN_REQUESTED: Topic = Topic("spawn.requested");

/// A request to create one entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpawnRequest {
    /// Species of the requested entity.
    pub species: SpeciesId,
    /// Requested horizontal position.
    pub x: f64,
    /// Requested vertical position.
    pub y: f64,
    /// Entities that produced this one, if any.
    pub parents: Vec<EntityKey>,
    /// Free-form data for the authority.
    pub context: serde_json::Value,
}

impl SpawnRequest {
    /// A request with no parents and no context.
    pub fn new(species: SpeciesId, x: f64, y: f64) -> Self {
        Self {
            species,
            x,
            y,
            parents: Vec::new(),
            context: serde_json::Value::Null,
        }
    }

    /// Record the entities that caused the request.
    pub fn with_parents(mut self, parents: impl IntoIterator<Item = EntityKey>) -> Self {
        self.parents = parents.into_iter().collect();
        self
    }

    /// Attach free-form context for the authority.
    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = context;
        self
    }
}

/// The sole constructor of entities.
///
/// Implementations must consult [`viv_core::Registry::can_spawn`] before
/// building an entity and return `Ok(None)` when the species is at its cap.
pub trait SpawnAuthority<B> {
    /// Build the requested entity and register it. Returns `Ok(None)` when the species is at cap.
    fn fulfil(&mut self, request: &SpawnRequest, world: &mut World<B>) -> SimResult<Option<EntityKey>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use viv_core::EntityId;

    #[test]
    fn builder_sets_parents_and_context() {
        let a = EntityKey::new(SpeciesId(1), EntityId(1));
        let b = EntityKey::new(SpeciesId(1), EntityId(2));
        let request = SpawnRequest::new(SpeciesId(1), 3.0, 4.0)
            .with_parents([a, b])
            .with_context(serde_json::json!({ "cause": "pairing" }));
        assert_eq!(request.parents, vec![a, b]);
        assert_eq!(request.context["cause"], "pairing");
    }
}
