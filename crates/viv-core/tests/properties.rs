//! Property tests for viv-core.
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use proptest::prelude::*;
use viv_core::{
    Entity, EntityKey, NotificationBus, Registry, RegistryConfig, SpatialGrid, SpeciesDescriptor,
    SpeciesId, SpeciesTable, Topic,
};

const CAP: usize = 6;

fn registry() -> Registry<()> {
    let species = SpeciesTable::from_descriptors([
        SpeciesDescriptor::new(1, "vole", CAP, "burrow"),
        SpeciesDescriptor::new(2, "lichen", 50, "crust").unindexed(),
    ])
    .unwrap();
    let config = RegistryConfig::new(species)
        .with_grid("ground", 25.0)
        .with_indexed_pool("burrow", "ground")
        .with_pool("crust");
    Registry::new(config, Rc::new(NotificationBus::new())).unwrap()
}

/// Spawn through the cap gate the way a spawn authority would.
fn try_spawn(reg: &mut Registry<()>, species: u32, x: f64, y: f64) -> Option<EntityKey> {
    let descriptor = Arc::clone(reg.species(SpeciesId(species))?);
    if !reg.can_spawn(&descriptor) {
        return None;
    }
    let id = reg.next_id(descriptor.id);
    let pool = descriptor.pool.clone();
    let indexed = descriptor.indexed;
    reg.add_to_pool(Entity::new(id, descriptor, x, y, ()), &pool, indexed)
        .ok()
}

#[derive(Debug, Clone)]
enum Op {
    Spawn { species: u32, x: f64, y: f64 },
    Queue(usize),
    Flush,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1u32..=2, -200.0f64..200.0, -200.0f64..200.0)
            .prop_map(|(species, x, y)| Op::Spawn { species, x, y }),
        (0usize..64).prop_map(Op::Queue),
        Just(Op::Flush),
    ]
}

proptest! {
    #[test]
    fn can_spawn_tracks_population_against_cap(ops in proptest::collection::vec(op(), 1..80)) {
        let mut reg = registry();
        let mut spawned: Vec<EntityKey> = Vec::new();
        for op in ops {
            match op {
                Op::Spawn { species, x, y } => {
                    if let Some(key) = try_spawn(&mut reg, species, x, y) {
                        spawned.push(key);
                    }
                }
                Op::Queue(i) => {
                    if !spawned.is_empty() {
                        reg.queue_removal(spawned[i % spawned.len()]);
                    }
                }
                Op::Flush => {
                    reg.flush_removals();
                }
            }
            let vole = Arc::clone(reg.species(SpeciesId(1)).unwrap());
            prop_assert!(reg.population(vole.id) <= CAP);
            prop_assert_eq!(reg.population(vole.id), reg.count_live(vole.id));
            prop_assert_eq!(reg.can_spawn(&vole), reg.population(vole.id) < CAP);
        }
    }

    #[test]
    fn flush_leaves_no_trace_of_queued_entities(
        count in 1usize..30,
        picks in proptest::collection::vec(0usize..64, 0..60),
    ) {
        let mut reg = registry();
        let keys: Vec<EntityKey> = (0..count)
            .filter_map(|i| {
                let species = if i % 2 == 0 { 1 } else { 2 };
                try_spawn(&mut reg, species, i as f64 * 13.0, -(i as f64) * 7.0)
            })
            .collect();
        prop_assume!(!keys.is_empty());

        // Duplicates and keys flushed in an earlier round are both allowed.
        let (first, second) = picks.split_at(picks.len() / 2);
        let mut queued = Vec::new();
        for &pick in first {
            let key = keys[pick % keys.len()];
            reg.queue_removal(key);
            queued.push(key);
        }
        reg.flush_removals();
        for &pick in second {
            let key = keys[pick % keys.len()];
            reg.queue_removal(key);
            queued.push(key);
        }
        reg.flush_removals();

        prop_assert_eq!(reg.pending_removals(), 0);
        let grid = reg.grid("ground").unwrap();
        for key in &queued {
            prop_assert!(!reg.contains(*key));
            prop_assert!(!grid.contains(*key));
            prop_assert!(reg.entities().all(|e| e.key() != *key));
        }
        prop_assert_eq!(grid.len(), reg.pool("burrow").unwrap().len());
    }

    #[test]
    fn grid_round_trip_follows_the_move(
        px in -1000.0f64..1000.0,
        py in -1000.0f64..1000.0,
        qx in -1000.0f64..1000.0,
        qy in -1000.0f64..1000.0,
    ) {
        let mut reg = registry();
        let key = try_spawn(&mut reg, 1, px, py).unwrap();
        reg.get_mut(key).unwrap().x = qx;
        reg.get_mut(key).unwrap().y = qy;
        reg.update_spatial_position(key, px, py, "ground").unwrap();

        let grid = reg.grid("ground").unwrap();
        prop_assert!(grid.query(qx, qy, 0.0).contains(&key));
        if grid.cell_of(px, py) != grid.cell_of(qx, qy) {
            prop_assert!(!grid.query(px, py, 0.0).contains(&key));
        }
    }

    #[test]
    fn query_is_a_superset_of_the_exact_match(
        points in proptest::collection::vec((-300.0f64..300.0, -300.0f64..300.0), 0..60),
        cx in -300.0f64..300.0,
        cy in -300.0f64..300.0,
        radius in 0.0f64..200.0,
        cell in 5.0f64..120.0,
    ) {
        let mut grid = SpatialGrid::new(cell);
        let keys: Vec<EntityKey> = (0..points.len())
            .map(|i| EntityKey::new(SpeciesId(1), viv_core::EntityId(i as u32 + 1)))
            .collect();
        for (key, &(x, y)) in keys.iter().zip(&points) {
            grid.add(*key, x, y);
        }
        let found = grid.query(cx, cy, radius);
        for (key, &(x, y)) in keys.iter().zip(&points) {
            let d = ((x - cx).powi(2) + (y - cy).powi(2)).sqrt();
            if d <= radius {
                prop_assert!(found.contains(key), "missed {key} at distance {d}");
            }
        }
        let mut dedup = found.clone();
        dedup.sort();
        dedup.dedup();
        prop_assert_eq!(dedup.len(), found.len());
    }

    #[test]
    fn subscribers_run_in_subscription_order(count in 1usize..20, publishes in 1usize..5) {
        let bus: NotificationBus<usize> = NotificationBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        for i in 0..count {
            let log = Rc::clone(&log);
            bus.subscribe(Topic("tick"), move |n| {
                log.borrow_mut().push((n.payload, i));
                Ok(())
            });
        }
        for p in 0..publishes {
            bus.publish(Topic("tick"), p);
        }
        let expected: Vec<(usize, usize)> = (0..publishes)
            .flat_map(|p| (0..count).map(move |i| (p, i)))
            .collect();
        prop_assert_eq!(&*log.borrow(), &expected);
    }
}

#[test]
fn cap_of_two_scenario() {
    let species = SpeciesTable::from_descriptors([SpeciesDescriptor::new(1, "owl", 2, "roost")]).unwrap();
    let config = RegistryConfig::new(species)
        .with_grid("sky", 150.0)
        .with_indexed_pool("roost", "sky");
    let mut reg: Registry<()> = Registry::new(config, Rc::new(NotificationBus::new())).unwrap();
    let owl = Arc::clone(reg.species(SpeciesId(1)).unwrap());

    let add = |reg: &mut Registry<()>| {
        let id = reg.next_id(owl.id);
        reg.add_to_pool(Entity::new(id, Arc::clone(&owl), 0.0, 0.0, ()), "roost", true)
            .unwrap()
    };
    let first = add(&mut reg);
    add(&mut reg);
    assert!(!reg.can_spawn(&owl));

    reg.queue_removal(first);
    reg.flush_removals();
    assert!(reg.can_spawn(&owl));
}

#[test]
fn bucket_move_scenario() {
    let species = SpeciesTable::from_descriptors([SpeciesDescriptor::new(1, "hare", 4, "field")]).unwrap();
    let config = RegistryConfig::new(species)
        .with_grid("meadow", 150.0)
        .with_indexed_pool("field", "meadow");
    let mut reg: Registry<()> = Registry::new(config, Rc::new(NotificationBus::new())).unwrap();
    let hare = Arc::clone(reg.species(SpeciesId(1)).unwrap());
    let id = reg.next_id(hare.id);
    let key = reg
        .add_to_pool(Entity::new(id, hare, 10.0, 10.0, ()), "field", true)
        .unwrap();
    assert_eq!(reg.grid("meadow").unwrap().cell_key_of(key), Some((0, 0)));

    reg.get_mut(key).unwrap().x = 160.0;
    reg.update_spatial_position(key, 10.0, 10.0, "meadow").unwrap();
    assert_eq!(reg.grid("meadow").unwrap().cell_key_of(key), Some((1, 0)));

    let here: Vec<_> = reg
        .query_within("meadow", 160.0, 10.0, 10.0)
        .unwrap()
        .iter()
        .map(|e| e.key())
        .collect();
    assert_eq!(here, vec![key]);
    assert!(reg.query_within("meadow", 10.0, 10.0, 10.0).unwrap().is_empty());
}

#[test]
fn double_queue_scenario() {
    let mut reg = registry();
    let key = try_spawn(&mut reg, 1, 0.0, 0.0).unwrap();
    try_spawn(&mut reg, 1, 5.0, 5.0).unwrap();

    reg.queue_removal(key);
    reg.queue_removal(key);
    assert_eq!(reg.flush_removals(), 1);
    assert_eq!(reg.len(), 1);
    assert_eq!(reg.flush_removals(), 0);
    assert_eq!(reg.len(), 1);
}
