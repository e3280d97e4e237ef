use serde::Serialize;
use viv_core::{EntityKey, Notification, NotificationBus, REMOVED, Registry, RegistryEvent, SPAWNED, Topic};

use crate::clock::DayPhase;
use crate::spawn::{SPAWN_REQUESTED, SpawnRequest};

/// Topic carrying [`SimEventKind::PhaseChanged`].
pub const PHASE_CHANGED: Topic = Topic("phase.changed");

/// Topics every simulation records in its event log.
pub const STANDARD_TOPICS: [Topic; 4] = [SPAWNED, REMOVED, SPAWN_REQUESTED, PHASE_CHANGED];

/// The bus every simulation component publishes on.
pub type Bus = NotificationBus<SimEventKind>;

/// The registry as the simulation uses it.
pub type World<B> = Registry<B, SimEventKind>;

/// Payload of every notification on the simulation bus.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SimEventKind {
    /// An entity joined a pool.
    Spawned {
        /// The new entity.
        entity: EntityKey,
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
        entity: EntityKey,
        /// Pool it left.
        pool: String,
    },
    /// A step asked the spawn authority for a new entity.
    SpawnRequested(SpawnRequest),
    /// The day/night phase flipped.
    PhaseChanged {
        /// Phase before the transition.
        from: DayPhase,
        /// Phase after the transition.
        to: DayPhase,
    },
    /// An application-defined event.
    Custom {
        /// Short description.
        label: String,
        /// Entities involved.
        entities: Vec<EntityKey>,
    },
}

impl From<RegistryEvent> for SimEventKind {
    fn from(event: RegistryEvent) -> Self {
        match event {
            RegistryEvent::Spawned { key, pool, x, y } => Self::Spawned {
                entity: key,
                pool,
                x,
                y,
            },
            RegistryEvent::Removed { key, pool } => Self::Removed { entity: key, pool },
        }
    }
}

impl SimEventKind {
    /// Check whether a given entity is involved in this event.
    pub fn involves(&self, key: EntityKey) -> bool {
        match self {
            Self::Spawned { entity, .. } | Self::Removed { entity, .. } => *entity == key,
            Self::SpawnRequested(request) => request.parents.contains(&key),
            Self::PhaseChanged { .. } => false,
            Self::Custom { entities, .. } => entities.contains(&key),
        }
    }

    /// One-line human-readable summary.
    pub fn describe(&self) -> String {
        match self {
            Self::Spawned { entity, pool, x, y } => {
                format!("{entity} spawned in {pool} at ({x:.1}, {y:.1})")
            }
            Self::Removed { entity, pool } => format!("{entity} removed from {pool}"),
            Self::SpawnRequested(request) => {
                if request.parents.is_empty() {
                    format!("spawn of species {} requested", request.species)
                } else {
                    let parents: Vec<String> = request.parents.iter().map(ToString::to_string).collect();
                    format!(
                        "spawn of species {} requested by {}",
                        request.species,
                        parents.join(" and ")
                    )
                }
            }
            Self::PhaseChanged { from, to } => format!("{from} turned to {to}"),
            Self::Custom { label, entities } => {
                if entities.is_empty() {
                    label.clone()
                } else {
                    let names: Vec<String> = entities.iter().map(ToString::to_string).collect();
                    format!("{label}: {}", names.join(", "))
                }
            }
        }
    }
}

/// A record of something that happened during simulation.
#[derive(Debug, Clone, Serialize)]
pub struct SimEvent {
    /// The simulation tick when this event occurred.
    pub tick: u64,
    /// The topic it was published on.
    pub topic: &'static str,
    /// What happened.
    pub kind: SimEventKind,
    /// Human-readable summary.
    pub description: String,
}

impl SimEvent {
    /// Record an event, deriving its description.
    pub fn new(tick: u64, topic: Topic, kind: SimEventKind) -> Self {
        let description = kind.describe();
        Self {
            tick,
            topic: topic.0,
            kind,
            description,
        }
    }

    /// Record a bus notification.
    pub fn from_notification(tick: u64, notification: Notification<SimEventKind>) -> Self {
        Self::new(tick, notification.topic, notification.payload)
    }
}

/// Accumulates events during a simulation run.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<SimEvent>,
    max_events: usize,
}

impl EventLog {
    /// Create a new event log with the given maximum capacity (0 = unlimited).
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Vec::new(),
            max_events,
        }
    }

    /// Append an event, dropping the oldest events if the log exceeds its capacity.
    pub fn push(&mut self, event: SimEvent) {
        self.events.push(event);
        if self.max_events > 0 && self.events.len() > self.max_events {
            let drain_count = self.events.len() - self.max_events;
            self.events.drain(..drain_count);
        }
    }

    /// All retained events, oldest first.
    pub fn events(&self) -> &[SimEvent] {
        &self.events
    }

    /// Events recorded during `tick`.
    pub fn events_at_tick(&self, tick: u64) -> Vec<&SimEvent> {
        self.events.iter().filter(|e| e.tick == tick).collect()
    }

    /// Events involving an entity.
    pub fn events_for_entity(&self, key: EntityKey) -> Vec<&SimEvent> {
        self.events.iter().filter(|e| e.kind.involves(key)).collect()
    }

    /// Events published on `topic`.
    pub fn events_on(&self, topic: Topic) -> Vec<&SimEvent> {
        self.events.iter().filter(|e| e.topic == topic.0).collect()
    }

    /// Number of retained events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// `true` if no event is retained.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Drop every event.
    pub fn clear(&mut self) {
        self.events.clear();
    }
}
