use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::species::{SpeciesDescriptor, SpeciesId};

/// Serial number of an entity, unique within its species.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registry-wide handle of an entity: its species plus its serial number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityKey {
    /// Species the entity belongs to.
    pub species: SpeciesId,
    /// Per-species sequence number.
    pub id: EntityId,
}

impl EntityKey {
    /// Build a key from its parts.
    pub fn new(species: SpeciesId, id: EntityId) -> Self {
        Self { species, id }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.species, self.id)
    }
}

/// What an entity wants to do this tick. Written only by the decision phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    /// Desired velocity in world units per second.
    pub vx: f64,
    /// Vertical velocity in units per second.
    pub vy: f64,
    /// The entity this intent is aimed at, if any.
    pub target: Option<EntityKey>,
}

impl Intent {
    /// Stand still.
    pub fn idle() -> Self {
        Self::default()
    }

    /// Head toward `(tx, ty)` from `(x, y)` at `speed`, stopping on arrival.
    pub fn toward(x: f64, y: f64, tx: f64, ty: f64, speed: f64) -> Self {
        let dx = tx - x;
        let dy = ty - y;
        let dist = (dx * dx + dy * dy).sqrt();
        if dist < f64::EPSILON {
            return Self::idle();
        }
        Self {
            vx: dx / dist * speed,
            vy: dy / dist * speed,
            target: None,
        }
    }

    /// Attach a target to this intent.
    pub fn aimed_at(mut self, target: EntityKey) -> Self {
        self.target = Some(target);
        self
    }

    /// `true` for an intent with no velocity and no target.
    pub fn is_idle(&self) -> bool {
        self.vx == 0.0 && self.vy == 0.0
    }
}

/// Hook invoked by the registry when an entity is reclaimed.
pub trait Teardown {
    /// Release whatever the entity body holds. Called exactly once, during
    /// the removal flush, after the entity has left its pool and grid.
    fn teardown(&mut self, _key: EntityKey) {}
}

impl Teardown for () {}

/// A simulated object held by exactly one pool.
///
/// `B` is the entity body: the behavior-capable variant supplied by the
/// composing application.
#[derive(Debug, Clone)]
pub struct Entity<B> {
    /// Per-species id allocated by the registry.
    pub id: EntityId,
    /// Horizontal position. Written only by the movement step.
    pub x: f64,
    /// Vertical position. Written only by the movement step.
    pub y: f64,
    /// The species this entity was spawned as.
    pub species: Arc<SpeciesDescriptor>,
    /// Cleared when the entity dies; the entity stays registered until flushed.
    pub alive: bool,
    /// Seconds since creation.
    pub age: f64,
    /// Latest decision. Written only by the decision step.
    pub intent: Intent,
    /// Seconds until this entity may pair again.
    pub mate_cooldown: f64,
    /// Variant-specific state and behavior.
    pub body: B,
}

impl<B> Entity<B> {
    /// Create a live entity of age zero with an idle intent.
    pub fn new(id: EntityId, species: Arc<SpeciesDescriptor>, x: f64, y: f64, body: B) -> Self {
        Self {
            id,
            x,
            y,
            species,
            alive: true,
            age: 0.0,
            intent: Intent::idle(),
            mate_cooldown: 0.0,
            body,
        }
    }

    /// The registry-wide handle of this entity.
    pub fn key(&self) -> EntityKey {
        EntityKey::new(self.species.id, self.id)
    }

    /// Id of the entity's species.
    pub fn species_id(&self) -> SpeciesId {
        self.species.id
    }

    /// Squared distance to a point.
    pub fn distance_sq_to(&self, x: f64, y: f64) -> f64 {
        let dx = self.x - x;
        let dy = self.y - y;
        dx * dx + dy * dy
    }

    /// Euclidean distance to a point.
    pub fn distance_to(&self, x: f64, y: f64) -> f64 {
        self.distance_sq_to(x, y).sqrt()
    }

    /// True once the entity has outlived its species lifespan.
    pub fn is_expired(&self) -> bool {
        self.species.lifespan.is_some_and(|lifespan| self.age > lifespan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deer() -> Arc<SpeciesDescriptor> {
        Arc::new(SpeciesDescriptor::new(2, "deer", 4, "fauna").with_lifespan(10.0))
    }

    #[test]
    fn entity_key_display() {
        let key = EntityKey::new(SpeciesId(2), EntityId(15));
        assert_eq!(key.to_string(), "#2/15");
    }

    #[test]
    fn new_entity_is_alive_and_idle() {
        let e = Entity::new(EntityId(1), deer(), 3.0, 4.0, ());
        assert!(e.alive);
        assert!(e.intent.is_idle());
        assert_eq!(e.key(), EntityKey::new(SpeciesId(2), EntityId(1)));
        assert!((e.distance_to(0.0, 0.0) - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn expiry_follows_species_lifespan() {
        let mut e = Entity::new(EntityId(1), deer(), 0.0, 0.0, ());
        e.age = 10.0;
        assert!(!e.is_expired());
        e.age = 10.5;
        assert!(e.is_expired());

        let immortal = Arc::new(SpeciesDescriptor::new(9, "stone", 1, "flora"));
        let mut rock = Entity::new(EntityId(1), immortal, 0.0, 0.0, ());
        rock.age = 1e9;
        assert!(!rock.is_expired());
    }

    #[test]
    fn intent_toward_normalizes_speed() {
        let intent = Intent::toward(0.0, 0.0, 30.0, 40.0, 10.0);
        assert!((intent.vx - 6.0).abs() < 1e-9);
        assert!((intent.vy - 8.0).abs() < 1e-9);
        assert!(Intent::toward(1.0, 1.0, 1.0, 1.0, 10.0).is_idle());
    }
}
