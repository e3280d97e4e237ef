use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Identifier of a species descriptor. Unique within a [`SpeciesTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpeciesId(pub u32);

impl fmt::Display for SpeciesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Immutable configuration shared by every entity of one species.
///
/// Descriptors carry data only. Behavior lives in the entity body, which
/// reads these parameters but never mutates them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesDescriptor {
    /// Unique id within a species table.
    pub id: SpeciesId,
    /// Display name.
    pub name: String,
    /// Maximum number of simultaneously registered members.
    pub cap: usize,
    /// Pool that members of this species are appended to.
    pub pool: String,
    /// Whether members are indexed in the pool's spatial grid.
    #[serde(default = "default_true")]
    pub indexed: bool,
    /// Movement speed in world units per second.
    #[serde(default)]
    pub speed: f64,
    /// Age in seconds after which a member dies. `None` never ages out.
    #[serde(default)]
    pub lifespan: Option<f64>,
    /// Radius within which a member perceives others.
    #[serde(default)]
    pub sense_radius: f64,
    /// Radius within which two members may pair.
    #[serde(default)]
    pub mate_radius: f64,
    /// Seconds a member must wait between pairings.
    #[serde(default)]
    pub mate_cooldown: f64,
}

fn default_true() -> bool {
    true
}

impl SpeciesDescriptor {
    /// Create a descriptor with the given id, name, cap, and pool. Every
    /// behavioral parameter starts at its neutral value.
    pub fn new(id: u32, name: impl Into<String>, cap: usize, pool: impl Into<String>) -> Self {
        Self {
            id: SpeciesId(id),
            name: name.into(),
            cap,
            pool: pool.into(),
            indexed: true,
            speed: 0.0,
            lifespan: None,
            sense_radius: 0.0,
            mate_radius: 0.0,
            mate_cooldown: 0.0,
        }
    }

    /// Set the travel speed in units per second.
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    /// Set the lifespan in seconds.
    pub fn with_lifespan(mut self, lifespan: f64) -> Self {
        self.lifespan = Some(lifespan);
        self
    }

    /// Set how far members can sense others.
    pub fn with_sense_radius(mut self, radius: f64) -> Self {
        self.sense_radius = radius;
        self
    }

    /// Set the pairing radius and the cooldown between pairings.
    pub fn with_mating(mut self, radius: f64, cooldown: f64) -> Self {
        self.mate_radius = radius;
        self.mate_cooldown = cooldown;
        self
    }

    /// Keep members out of the spatial grid.
    pub fn unindexed(mut self) -> Self {
        self.indexed = false;
        self
    }
}

/// Ordered collection of species descriptors, looked up by id.
#[derive(Debug, Clone, Default)]
pub struct SpeciesTable {
    species: Vec<Arc<SpeciesDescriptor>>,
}

impl SpeciesTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from descriptors, rejecting duplicate ids and zero caps.
    pub fn from_descriptors(
        descriptors: impl IntoIterator<Item = SpeciesDescriptor>,
    ) -> CoreResult<Self> {
        let mut table = Self::new();
        for descriptor in descriptors {
            table.insert(descriptor)?;
        }
        Ok(table)
    }

    /// Parse a JSON array of descriptors.
    pub fn from_json_str(json: &str) -> CoreResult<Self> {
        let descriptors: Vec<SpeciesDescriptor> = serde_json::from_str(json)?;
        Self::from_descriptors(descriptors)
    }

    /// Serialize the table back to a JSON array.
    pub fn to_json_pretty(&self) -> CoreResult<String> {
        let descriptors: Vec<&SpeciesDescriptor> = self.species.iter().map(|s| &**s).collect();
        Ok(serde_json::to_string_pretty(&descriptors)?)
    }

    /// Add a descriptor. Returns the shared handle stored in the table.
    pub fn insert(&mut self, descriptor: SpeciesDescriptor) -> CoreResult<Arc<SpeciesDescriptor>> {
        if descriptor.cap == 0 {
            return Err(CoreError::ZeroCap(descriptor.id));
        }
        if self.get(descriptor.id).is_some() {
            return Err(CoreError::DuplicateSpecies(descriptor.id));
        }
        let shared = Arc::new(descriptor);
        self.species.push(Arc::clone(&shared));
        Ok(shared)
    }

    /// Look up a descriptor by id.
    pub fn get(&self, id: SpeciesId) -> Option<&Arc<SpeciesDescriptor>> {
        self.species.iter().find(|s| s.id == id)
    }

    /// Find a descriptor by name (case-insensitive).
    pub fn find_by_name(&self, name: &str) -> Option<&Arc<SpeciesDescriptor>> {
        self.species
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }

    /// Descriptors in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<SpeciesDescriptor>> {
        self.species.iter()
    }

    /// Number of descriptors.
    pub fn len(&self) -> usize {
        self.species.len()
    }

    /// `true` if the table holds no descriptor.
    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }
}
