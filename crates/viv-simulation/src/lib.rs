//! Tick-based simulation runtime for Vivarium.
//!
//! Provides the fixed-timestep [`Scheduler`], the [`Simulation`] orchestrator
//! and the standard pipeline of steps operating on a [`viv_core::Registry`].
//! Entity behavior is supplied by the application through the [`Behavior`]
//! trait and its capability traits; entity creation goes through a
//! [`SpawnAuthority`].

/// Behavior and capability traits implemented by entity bodies.
pub mod behavior;
/// Simulation clock for tracking ticks, elapsed time, and the day phase.
pub mod clock;
/// Configuration types for simulation runs.
pub mod config;
/// Mutable context passed to systems each tick.
pub mod context;
/// Time-delayed effects on single entities.
pub mod deferred;
/// The shared environment scalar.
pub mod environment;
/// Error types for the simulation crate.
pub mod error;
/// Simulation event types and the event log.
pub mod event;
/// The standard pipeline steps.
pub mod pipeline;
/// Fixed-timestep frame loop.
pub mod scheduler;
/// Top-level simulation orchestrator.
pub mod simulation;
/// Spawn requests and the spawn authority contract.
pub mod spawn;
/// The trait that all simulation systems implement.
pub mod system;

pub use behavior::{Behavior, Breeder, Contributor, Decider, Senses, Shared, Transition};
pub use clock::{DayPhase, SimClock};
pub use config::{Bounds, EnvironmentConfig, SimConfig};
pub use context::SimContext;
pub use deferred::{DeferredQueue, DeferredReport};
pub use environment::Environment;
pub use error::{SimError, SimResult};
pub use event::{Bus, EventLog, PHASE_CHANGED, STANDARD_TOPICS, SimEvent, SimEventKind, World};
pub use scheduler::{Scheduler, Subsystem};
pub use simulation::Simulation;
pub use spawn::{SPAWN_REQUESTED, SpawnAuthority, SpawnRequest};
pub use system::System;
