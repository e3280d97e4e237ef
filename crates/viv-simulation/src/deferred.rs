//! Time-delayed effects on a single entity.
//!
//! A task names the entity it will touch. When it falls due, it runs only
//! if that entity is still registered, alive and not queued for removal;
//! otherwise it is dropped.

use std::fmt;

use tracing::warn;
use viv_core::{Entity, EntityKey};

use crate::event::World;

type Action<B> = Box<dyn FnOnce(&mut Entity<B>)>;

struct Task<B> {
    due: f64,
    seq: u64,
    target: EntityKey,
    label: String,
    action: Action<B>,
}

/// Outcome of one [`DeferredQueue::run_due`] pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeferredReport {
    /// Tasks that ran.
    pub ran: usize,
    /// Tasks dropped because their target was gone.
    pub dropped: usize,
}

/// Pending deferred tasks, ordered by due time and then by scheduling order.
pub struct DeferredQueue<B> {
    tasks: Vec<Task<B>>,
    next_seq: u64,
}

impl<B> Default for DeferredQueue<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B> fmt::Debug for DeferredQueue<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels: Vec<(&str, EntityKey, f64)> = self
            .tasks
            .iter()
            .map(|t| (t.label.as_str(), t.target, t.due))
            .collect();
        f.debug_struct("DeferredQueue").field("tasks", &labels).finish()
    }
}

impl<B> DeferredQueue<B> {
    /// An empty queue.
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            next_seq: 0,
        }
    }

    /// Schedule `action` to run on `target` once the clock reaches `due`.
    pub fn schedule<F>(&mut self, due: f64, target: EntityKey, label: impl Into<String>, action: F)
    where
        F: FnOnce(&mut Entity<B>) + 'static,
    {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.tasks.push(Task {
            due,
            seq,
            target,
            label: label.into(),
            action: Box::new(action),
        });
    }

    /// Number of pending tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// `true` if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Tasks aimed at `target` that have not run yet.
    pub fn pending_for(&self, target: EntityKey) -> usize {
        self.tasks.iter().filter(|t| t.target == target).count()
    }

    /// Run every task due at or before `now`.
    pub fn run_due(&mut self, now: f64, world: &mut World<B>) -> DeferredReport {
        let (mut due, pending): (Vec<Task<B>>, Vec<Task<B>>) =
            std::mem::take(&mut self.tasks).into_iter().partition(|t| t.due <= now);
        self.tasks = pending;
        due.sort_by(|a, b| a.due.total_cmp(&b.due).then(a.seq.cmp(&b.seq)));

        let mut report = DeferredReport::default();
        for task in due {
            let live = !world.is_queued(task.target)
                && world.get(task.target).is_some_and(|e| e.alive);
            match world.get_mut(task.target) {
                Some(entity) if live => {
                    (task.action)(entity);
                    report.ran += 1;
                }
                _ => {
                    warn!(target_entity = %task.target, label = %task.label, "deferred task dropped; target is gone");
                    report.dropped += 1;
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;
    use std::sync::Arc;

    use viv_core::{NotificationBus, RegistryConfig, SpeciesDescriptor, SpeciesId, SpeciesTable, Teardown};

    use super::*;

    #[derive(Debug, Default)]
    struct Mole {
        count: u32,
    }

    impl Teardown for Mole {}

    fn world() -> World<Mole> {
        let species = SpeciesTable::from_descriptors([SpeciesDescriptor::new(1, "mole", 10, "den").unindexed()]).unwrap();
        World::new(RegistryConfig::new(species).with_pool("den"), Rc::new(NotificationBus::new())).unwrap()
    }

    fn spawn(world: &mut World<Mole>) -> EntityKey {
        let mole = Arc::clone(world.species(SpeciesId(1)).unwrap());
        let id = world.next_id(mole.id);
        world
            .add_to_pool(Entity::new(id, mole, 0.0, 0.0, Mole::default()), "den", false)
            .unwrap()
    }

    fn count(world: &World<Mole>, key: EntityKey) -> u32 {
        world.get(key).unwrap().body.count
    }

    #[test]
    fn tasks_wait_until_due() {
        let mut world = world();
        let key = spawn(&mut world);
        let mut queue = DeferredQueue::new();
        queue.schedule(2.0, key, "bump", |e: &mut Entity<Mole>| e.body.count += 1);

        assert_eq!(queue.run_due(1.0, &mut world), DeferredReport::default());
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.pending_for(key), 1);
        assert_eq!(queue.run_due(2.0, &mut world).ran, 1);
        assert_eq!(count(&world, key), 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn due_order_then_schedule_order() {
        let mut world = world();
        let key = spawn(&mut world);
        let mut queue = DeferredQueue::new();
        queue.schedule(1.0, key, "times ten", |e: &mut Entity<Mole>| e.body.count *= 10);
        queue.schedule(0.5, key, "set", |e: &mut Entity<Mole>| e.body.count = 2);
        queue.schedule(1.0, key, "plus one", |e: &mut Entity<Mole>| e.body.count += 1);
        queue.run_due(5.0, &mut world);
        assert_eq!(count(&world, key), 21);
    }

    #[test]
    fn tasks_on_queued_dead_or_removed_targets_are_dropped() {
        let mut world = world();
        let queued = spawn(&mut world);
        let dead = spawn(&mut world);
        let gone = spawn(&mut world);

        let mut queue = DeferredQueue::new();
        for key in [queued, dead, gone] {
            queue.schedule(0.0, key, "bump", |e: &mut Entity<Mole>| e.body.count += 1);
        }
        world.queue_removal(gone);
        world.flush_removals();
        world.queue_removal(queued);
        world.get_mut(dead).unwrap().alive = false;

        let report = queue.run_due(0.0, &mut world);
        assert_eq!(report, DeferredReport { ran: 0, dropped: 3 });
        assert_eq!(count(&world, queued), 0);
        assert_eq!(count(&world, dead), 0);
    }
}
