use std::cell::RefCell;
use std::rc::Rc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info, warn};
use viv_core::{EntityKey, Notification, RegistryConfig, Topic};

use crate::behavior::Behavior;
use crate::clock::SimClock;
use crate::config::SimConfig;
use crate::context::SimContext;
use crate::deferred::DeferredQueue;
use crate::environment::Environment;
use crate::error::{SimError, SimResult};
use crate::event::{Bus, EventLog, STANDARD_TOPICS, SimEvent, SimEventKind, World};
use crate::scheduler::Subsystem;
use crate::spawn::{SPAWN_REQUESTED, SpawnAuthority, SpawnRequest};
use crate::system::System;

/// Rounds of spawn fulfilment per settle before leftovers wait for the next step.
const MAX_SPAWN_ROUNDS: usize = 16;

/// The top-level simulation orchestrator.
///
/// Owns the registry, bus, clock, environment, deferred queue, RNG, event
/// log, and registered systems. Each tick runs the systems in registration
/// order; after every system it hands collected spawn requests to the
/// spawn authority and records bus traffic in the event log.
pub struct Simulation<B> {
    world: World<B>,
    bus: Rc<Bus>,
    clock: SimClock,
    config: SimConfig,
    environment: Environment,
    deferred: DeferredQueue<B>,
    rng: StdRng,
    events: EventLog,
    systems: Vec<Box<dyn System<B>>>,
    authority: Option<Box<dyn SpawnAuthority<B>>>,
    spawn_inbox: Rc<RefCell<Vec<SpawnRequest>>>,
    mirror: Rc<RefCell<Vec<Notification<SimEventKind>>>>,
    watched: Vec<Topic>,
    dispatch_failures: usize,
    spawned: usize,
    rejected_spawns: usize,
    initialized: bool,
}

impl<B> std::fmt::Debug for Simulation<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let systems: Vec<&str> = self.systems.iter().map(|s| s.name()).collect();
        f.debug_struct("Simulation")
            .field("tick", &self.clock.tick())
            .field("entities", &self.world.len())
            .field("systems", &systems)
            .field("events", &self.events.len())
            .finish()
    }
}

impl<B: Behavior + 'static> Simulation<B> {
    /// Create a simulation from a configuration and the registry wiring.
    pub fn new(config: SimConfig, registry: RegistryConfig) -> SimResult<Self> {
        config.validate()?;
        let bus: Rc<Bus> = Rc::new(Bus::new());
        let world = World::new(registry, Rc::clone(&bus))?;

        let spawn_inbox: Rc<RefCell<Vec<SpawnRequest>>> = Rc::new(RefCell::new(Vec::new()));
        let inbox = Rc::clone(&spawn_inbox);
        bus.subscribe(SPAWN_REQUESTED, move |n| {
            if let SimEventKind::SpawnRequested(request) = &n.payload {
                inbox.borrow_mut().push(request.clone());
            }
            Ok(())
        });

        let mut sim = Self {
            world,
            bus,
            clock: SimClock::new(config.day_length),
            environment: Environment::new(config.environment),
            deferred: DeferredQueue::new(),
            rng: StdRng::seed_from_u64(config.seed),
            events: EventLog::new(config.max_events),
            config,
            systems: Vec::new(),
            authority: None,
            spawn_inbox,
            mirror: Rc::new(RefCell::new(Vec::new())),
            watched: Vec::new(),
            dispatch_failures: 0,
            spawned: 0,
            rejected_spawns: 0,
            initialized: false,
        };
        for topic in STANDARD_TOPICS {
            sim.watch(topic);
        }
        Ok(sim)
    }

    /// Install the spawn authority that fulfils spawn requests.
    pub fn set_authority<A: SpawnAuthority<B> + 'static>(&mut self, authority: A) {
        self.authority = Some(Box::new(authority));
    }

    /// Builder form of [`Simulation::set_authority`].
    pub fn with_authority<A: SpawnAuthority<B> + 'static>(mut self, authority: A) -> Self {
        self.set_authority(authority);
        self
    }

    /// Record every notification on `topic` in the event log. Watching a
    /// topic twice has no further effect.
    pub fn watch(&mut self, topic: Topic) {
        if self.watched.contains(&topic) {
            return;
        }
        self.watched.push(topic);
        let mirror = Rc::clone(&self.mirror);
        self.bus.subscribe(topic, move |n| {
            mirror.borrow_mut().push(n.clone());
            Ok(())
        });
    }

    /// Register a system. Systems are ticked in registration order.
    pub fn add_system<S: System<B> + 'static>(&mut self, system: S) {
        self.systems.push(Box::new(system));
    }

    /// Register a system directly after the one named `anchor`.
    pub fn insert_system_after<S: System<B> + 'static>(&mut self, anchor: &str, system: S) -> SimResult<()> {
        let position = self
            .systems
            .iter()
            .position(|s| s.name() == anchor)
            .ok_or_else(|| SimError::UnknownSystem(anchor.to_string()))?;
        self.systems.insert(position + 1, Box::new(system));
        Ok(())
    }

    /// Names of the installed systems, in execution order.
    pub fn system_names(&self) -> Vec<&str> {
        self.systems.iter().map(|s| s.name()).collect()
    }

    /// Initialize all registered systems.
    pub fn init(&mut self) -> SimResult<()> {
        if self.initialized {
            return Ok(());
        }
        for i in 0..self.systems.len() {
            let mut system = std::mem::replace(&mut self.systems[i], Box::new(NoopSystem));
            let result = system.init(&mut self.context(0.0));
            self.systems[i] = system;
            result?;
        }
        self.initialized = true;
        info!(systems = self.systems.len(), "simulation initialized");
        Ok(())
    }

    /// Advance the simulation by one tick of `dt` seconds.
    pub fn tick(&mut self, dt: f64) -> SimResult<()> {
        if !self.initialized {
            self.init()?;
        }

        self.clock.advance(dt);

        for i in 0..self.systems.len() {
            let mut system = std::mem::replace(&mut self.systems[i], Box::new(NoopSystem));
            let result = system.tick(&mut self.context(dt));
            self.systems[i] = system;
            result?;
            self.settle()?;
        }
        Ok(())
    }

    /// Advance the simulation by `n` ticks of `dt` seconds each.
    pub fn run(&mut self, n: u64, dt: f64) -> SimResult<()> {
        for _ in 0..n {
            self.tick(dt)?;
        }
        Ok(())
    }

    /// Hand a request straight to the spawn authority, outside any tick.
    pub fn spawn(&mut self, request: SpawnRequest) -> SimResult<Option<EntityKey>> {
        let key = self.fulfil(&request)?;
        self.settle()?;
        Ok(key)
    }

    /// Fulfil spawn requests collected during the last step and move bus
    /// traffic into the event log.
    fn settle(&mut self) -> SimResult<()> {
        for _ in 0..MAX_SPAWN_ROUNDS {
            let pending = std::mem::take(&mut *self.spawn_inbox.borrow_mut());
            if pending.is_empty() {
                break;
            }
            for request in &pending {
                self.fulfil(request)?;
            }
        }

        let tick = self.clock.tick();
        let notifications = std::mem::take(&mut *self.mirror.borrow_mut());
        for notification in notifications {
            self.events.push(SimEvent::from_notification(tick, notification));
        }
        Ok(())
    }

    fn fulfil(&mut self, request: &SpawnRequest) -> SimResult<Option<EntityKey>> {
        let Some(authority) = self.authority.as_mut() else {
            warn!(species = %request.species, "spawn request dropped; no spawn authority installed");
            self.rejected_spawns += 1;
            return Ok(None);
        };
        let key = authority.fulfil(request, &mut self.world)?;
        match key {
            Some(key) => {
                debug!(%key, "spawn request fulfilled");
                self.spawned += 1;
            }
            None => self.rejected_spawns += 1,
        }
        Ok(key)
    }

    fn context(&mut self, dt: f64) -> SimContext<'_, B> {
        SimContext {
            world: &mut self.world,
            clock: &self.clock,
            config: &self.config,
            environment: &mut self.environment,
            deferred: &mut self.deferred,
            rng: &mut self.rng,
            dispatch_failures: &mut self.dispatch_failures,
            dt,
        }
    }

    /// The entity registry.
    pub fn world(&self) -> &World<B> {
        &self.world
    }

    /// The entity registry, mutably.
    pub fn world_mut(&mut self) -> &mut World<B> {
        &mut self.world
    }

    /// The notification bus.
    pub fn bus(&self) -> &Rc<Bus> {
        &self.bus
    }

    /// The simulation clock.
    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    /// The run configuration.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// The shared environment.
    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// The event log.
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Pending deferred tasks.
    pub fn deferred(&self) -> &DeferredQueue<B> {
        &self.deferred
    }

    /// Subscriber failures across every publish made by the registry and
    /// the pipeline.
    pub fn dispatch_failures(&self) -> usize {
        self.dispatch_failures + self.world.dispatch_failures()
    }

    /// Spawn requests the authority turned into entities.
    pub fn spawned(&self) -> usize {
        self.spawned
    }

    /// Spawn requests that produced no entity.
    pub fn rejected_spawns(&self) -> usize {
        self.rejected_spawns
    }

    /// Access a system by downcasting to a concrete type.
    pub fn get_system<T: System<B> + 'static>(&self) -> Option<&T> {
        self.systems
            .iter()
            .find_map(|s| s.as_any().downcast_ref::<T>())
    }

    /// Access a system mutably by downcasting to a concrete type.
    pub fn get_system_mut<T: System<B> + 'static>(&mut self) -> Option<&mut T> {
        self.systems
            .iter_mut()
            .find_map(|s| s.as_any_mut().downcast_mut::<T>())
    }

    /// Ticks completed so far.
    pub fn current_tick(&self) -> u64 {
        self.clock.tick()
    }
}

impl<B: Behavior + 'static> Subsystem for Simulation<B> {
    fn name(&self) -> &str {
        "simulation"
    }

    fn update(&mut self, dt: f64) -> SimResult<()> {
        self.tick(dt)
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

/// Placeholder system used during the swap-and-tick pattern.
#[derive(Debug)]
struct NoopSystem;

impl<B> System<B> for NoopSystem {
    fn name(&self) -> &str {
        "noop"
    }
    fn tick(&mut self, _ctx: &mut SimContext<'_, B>) -> SimResult<()> {
        Ok(())
    }
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use viv_core::{Entity, HandlerError, SpeciesDescriptor, SpeciesId, SpeciesTable, Teardown};

    use super::*;
    use crate::event::PHASE_CHANGED;

    #[derive(Debug, Default)]
    struct Pebble;

    impl Teardown for Pebble {}
    impl Behavior for Pebble {}

    #[derive(Debug, Default)]
    struct Quarry;

    impl SpawnAuthority<Pebble> for Quarry {
        fn fulfil(&mut self, request: &SpawnRequest, world: &mut World<Pebble>) -> SimResult<Option<EntityKey>> {
            let species = world
                .species(request.species)
                .map(Arc::clone)
                .ok_or(viv_core::CoreError::UnknownSpecies(request.species))?;
            if !world.can_spawn(&species) {
                return Ok(None);
            }
            let id = world.next_id(species.id);
            let pool = species.pool.clone();
            let key = world.add_to_pool(Entity::new(id, species, request.x, request.y, Pebble), &pool, true)?;
            Ok(Some(key))
        }
    }

    fn registry() -> RegistryConfig {
        let species = SpeciesTable::from_descriptors([SpeciesDescriptor::new(1, "pebble", 3, "beach")]).unwrap();
        RegistryConfig::new(species)
            .with_grid("shore", 50.0)
            .with_indexed_pool("beach", "shore")
    }

    fn sim() -> Simulation<Pebble> {
        Simulation::new(SimConfig::default(), registry())
            .unwrap()
            .with_authority(Quarry)
    }

    /// Requests one spawn per tick.
    #[derive(Debug, Default)]
    struct Dropper {
        seen_before_settle: Vec<usize>,
    }

    impl System<Pebble> for Dropper {
        fn name(&self) -> &str {
            "dropper"
        }
        fn tick(&mut self, ctx: &mut SimContext<'_, Pebble>) -> SimResult<()> {
            ctx.request_spawn(SpawnRequest::new(SpeciesId(1), 1.0, 1.0));
            self.seen_before_settle.push(ctx.world.len());
            Ok(())
        }
        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
            self
        }
    }

    #[derive(Debug)]
    struct Named(&'static str, Rc<RefCell<Vec<&'static str>>>);

    impl System<Pebble> for Named {
        fn name(&self) -> &str {
            self.0
        }
        fn tick(&mut self, _ctx: &mut SimContext<'_, Pebble>) -> SimResult<()> {
            self.1.borrow_mut().push(self.0);
            Ok(())
        }
        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
            self
        }
    }

    #[derive(Debug)]
    struct Broken;

    impl System<Pebble> for Broken {
        fn name(&self) -> &str {
            "broken"
        }
        fn tick(&mut self, _ctx: &mut SimContext<'_, Pebble>) -> SimResult<()> {
            Err(SimError::system("broken", "always fails"))
        }
        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
            self
        }
    }

    #[test]
    fn spawn_requests_are_fulfilled_after_the_step() {
        let mut sim = sim();
        sim.add_system(Dropper::default());
        sim.run(2, 0.1).unwrap();

        let dropper = sim.get_system::<Dropper>().unwrap();
        // The entity requested in a step does not exist while that step runs.
        assert_eq!(dropper.seen_before_settle, vec![0, 1]);
        assert_eq!(sim.world().len(), 2);
        assert_eq!(sim.spawned(), 2);
    }

    #[test]
    fn authority_enforces_the_cap() {
        let mut sim = sim();
        sim.add_system(Dropper::default());
        sim.run(5, 0.1).unwrap();
        assert_eq!(sim.world().len(), 3);
        assert_eq!(sim.rejected_spawns(), 2);
    }

    #[test]
    fn requests_without_authority_are_dropped() {
        let mut sim: Simulation<Pebble> = Simulation::new(SimConfig::default(), registry()).unwrap();
        sim.add_system(Dropper::default());
        sim.tick(0.1).unwrap();
        assert!(sim.world().is_empty());
        assert_eq!(sim.rejected_spawns(), 1);
    }

    #[test]
    fn bus_traffic_is_logged_with_tick() {
        let mut sim = sim();
        sim.add_system(Dropper::default());
        sim.run(2, 0.1).unwrap();

        let second = sim.events().events_at_tick(2);
        let topics: Vec<&str> = second.iter().map(|e| e.topic).collect();
        assert_eq!(topics, vec!["spawn.requested", "spawned"]);
    }

    #[test]
    fn direct_spawn_is_logged() {
        let mut sim = sim();
        let key = sim.spawn(SpawnRequest::new(SpeciesId(1), 5.0, 5.0)).unwrap().unwrap();
        assert!(sim.world().contains(key));
        assert_eq!(sim.events().events_for_entity(key).len(), 1);
        assert_eq!(sim.events().events()[0].tick, 0);
    }

    #[test]
    fn insert_after_anchor() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut sim = sim();
        sim.add_system(Named("a", Rc::clone(&log)));
        sim.add_system(Named("c", Rc::clone(&log)));
        sim.insert_system_after("a", Named("b", Rc::clone(&log))).unwrap();
        assert!(matches!(
            sim.insert_system_after("zzz", Named("x", Rc::clone(&log))),
            Err(SimError::UnknownSystem(_))
        ));
        assert_eq!(sim.system_names(), vec!["a", "b", "c"]);

        sim.tick(0.1).unwrap();
        assert_eq!(*log.borrow(), vec!["a", "b", "c"]);
    }

    #[test]
    fn failing_system_aborts_tick_but_stays_registered() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut sim = sim();
        sim.add_system(Broken);
        sim.add_system(Named("after", Rc::clone(&log)));
        assert!(sim.tick(0.1).is_err());
        assert!(log.borrow().is_empty());
        assert_eq!(sim.system_names(), vec!["broken", "after"]);
    }

    #[test]
    fn dispatch_failures_are_counted() {
        let mut sim = sim();
        sim.bus().subscribe(viv_core::SPAWNED, |_| Err(HandlerError::new("listener down")));
        sim.add_system(Dropper::default());
        sim.tick(0.1).unwrap();
        assert_eq!(sim.dispatch_failures(), 1);
        // The failing listener did not stop the spawn or the log.
        assert_eq!(sim.world().len(), 1);
        assert_eq!(sim.events().events_on(viv_core::SPAWNED).len(), 1);
    }

    #[test]
    fn watching_twice_logs_once() {
        let mut sim = sim();
        sim.watch(PHASE_CHANGED);
        sim.watch(Topic("custom"));
        sim.watch(Topic("custom"));
        sim.add_system(Named("idle", Rc::new(RefCell::new(Vec::new()))));
        let report = sim.bus().publish(
            Topic("custom"),
            SimEventKind::Custom {
                label: "ping".into(),
                entities: vec![],
            },
        );
        assert_eq!(report.invoked(), 1);
        sim.tick(0.1).unwrap();
        let logged = sim.events().events_on(Topic("custom"));
        assert_eq!(logged.len(), 1);
        assert_eq!(logged[0].tick, 1);
    }

    #[test]
    fn deterministic_rng() {
        use rand::Rng;

        #[derive(Debug, Default)]
        struct Roller(Vec<u32>);
        impl System<Pebble> for Roller {
            fn name(&self) -> &str {
                "roller"
            }
            fn tick(&mut self, ctx: &mut SimContext<'_, Pebble>) -> SimResult<()> {
                self.0.push(ctx.rng.random_range(0..1000));
                Ok(())
            }
            fn as_any(&self) -> &dyn std::any::Any {
                self
            }
            fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
                self
            }
        }

        let rolls = |seed| {
            let mut sim: Simulation<Pebble> =
                Simulation::new(SimConfig::default().with_seed(seed), registry()).unwrap();
            sim.add_system(Roller::default());
            sim.run(10, 0.1).unwrap();
            sim.get_system::<Roller>().unwrap().0.clone()
        };
        assert_eq!(rolls(7), rolls(7));
        assert_ne!(rolls(7), rolls(8));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let result = Simulation::<Pebble>::new(SimConfig::default().with_tick_rate(-1.0), registry());
        assert!(matches!(result, Err(SimError::InvalidConfig(_))));
    }
}
