//! The read-only end of the pipeline.
//!
//! A [`Presenter`] receives a [`Frame`] of shared references and so cannot
//! mutate the registry. [`SnapshotPresenter`] turns each frame into a
//! serializable [`Snapshot`].

use std::collections::BTreeMap;

use serde::Serialize;
use viv_core::EntityKey;

use crate::behavior::Behavior;
use crate::clock::{DayPhase, SimClock};
use crate::context::SimContext;
use crate::environment::Environment;
use crate::error::SimResult;
use crate::event::World;
use crate::system::System;

/// Everything a presenter may look at.
pub struct Frame<'a, B> {
    /// The registry as it stands at the end of the tick.
    pub world: &'a World<B>,
    /// The clock.
    pub clock: &'a SimClock,
    /// The shared environment.
    pub environment: &'a Environment,
}

/// Consumer of the end-of-tick world state.
pub trait Presenter<B> {
    /// Observe one frame. Presenters cannot reach mutable state.
    fn present(&mut self, frame: &Frame<'_, B>);
}

/// Pipeline step wrapping a single presenter.
#[derive(Debug)]
pub struct Presentation<P> {
    presenter: P,
}

impl<P> Presentation<P> {
    /// Wrap a presenter.
    pub fn new(presenter: P) -> Self {
        Self { presenter }
    }

    /// The wrapped presenter.
    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    /// The wrapped presenter, mutably.
    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }
}

impl<B, P> System<B> for Presentation<P>
where
    B: Behavior + 'static,
    P: Presenter<B> + std::fmt::Debug + 'static,
{
    fn name(&self) -> &str {
        "presentation"
    }

    fn tick(&mut self, ctx: &mut SimContext<'_, B>) -> SimResult<()> {
        let frame = Frame {
            world: &*ctx.world,
            clock: ctx.clock,
            environment: &*ctx.environment,
        };
        self.presenter.present(&frame);
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

/// One entity as seen by a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntitySnapshot {
    /// Registry handle.
    pub key: EntityKey,
    /// Species name.
    pub species: String,
    /// Pool the entity lives in.
    pub pool: String,
    /// Horizontal position.
    pub x: f64,
    /// Vertical position.
    pub y: f64,
    /// Age in seconds.
    pub age: f64,
}

/// Live members per species name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Census(pub BTreeMap<String, usize>);

impl Census {
    /// Count the live entities of a world. Entities queued for removal are
    /// not counted.
    pub fn of<B>(world: &World<B>) -> Self {
        let mut counts: BTreeMap<String, usize> = world
            .species_table()
            .iter()
            .map(|s| (s.name.clone(), 0))
            .collect();
        for entity in world.entities() {
            if entity.alive && !world.is_queued(entity.key()) {
                *counts.entry(entity.species.name.clone()).or_insert(0) += 1;
            }
        }
        Self(counts)
    }

    /// Live members of a species, by name.
    pub fn get(&self, species: &str) -> usize {
        self.0.get(species).copied().unwrap_or(0)
    }

    /// Live members of all species.
    pub fn total(&self) -> usize {
        self.0.values().sum()
    }
}

/// The state of the world at the end of one tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    /// Tick the snapshot was taken at.
    pub tick: u64,
    /// Elapsed simulated seconds.
    pub time: f64,
    /// Environment value.
    pub environment: f64,
    /// Day phase.
    pub phase: DayPhase,
    /// Live count per species.
    pub census: Census,
    /// Every registered entity in pool order.
    pub entities: Vec<EntitySnapshot>,
}

impl Snapshot {
    /// Capture a frame.
    pub fn capture<B>(frame: &Frame<'_, B>) -> Self {
        let world = frame.world;
        let entities = world
            .entities()
            .filter(|e| e.alive && !world.is_queued(e.key()))
            .map(|e| EntitySnapshot {
                key: e.key(),
                species: e.species.name.clone(),
                pool: e.species.pool.clone(),
                x: e.x,
                y: e.y,
                age: e.age,
            })
            .collect();
        Self {
            tick: frame.clock.tick(),
            time: frame.clock.elapsed(),
            environment: frame.environment.value(),
            phase: frame.clock.phase(),
            census: Census::of(world),
            entities,
        }
    }
}

/// Captures a [`Snapshot`] every `every` ticks and keeps the latest one.
#[derive(Debug)]
pub struct SnapshotPresenter {
    every: u64,
    latest: Option<Snapshot>,
    captured: usize,
}

impl Default for SnapshotPresenter {
    fn default() -> Self {
        Self::new(1)
    }
}

impl SnapshotPresenter {
    /// `every` of zero is treated as one.
    pub fn new(every: u64) -> Self {
        Self {
            every: every.max(1),
            latest: None,
            captured: 0,
        }
    }

    /// The most recent snapshot.
    pub fn latest(&self) -> Option<&Snapshot> {
        self.latest.as_ref()
    }

    /// Snapshots taken so far.
    pub fn captured(&self) -> usize {
        self.captured
    }
}

impl<B> Presenter<B> for SnapshotPresenter {
    fn present(&mut self, frame: &Frame<'_, B>) {
        if !frame.clock.tick().is_multiple_of(self.every) {
            return;
        }
        self.latest = Some(Snapshot::capture(frame));
        self.captured += 1;
    }
}
