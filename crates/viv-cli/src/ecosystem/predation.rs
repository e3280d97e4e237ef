use std::collections::HashSet;

use tracing::debug;
use viv_core::{EntityKey, Topic};
use viv_simulation::{SimContext, SimEventKind, SimResult, System};

use super::FAUNA_GRID;
use super::creature::Creature;

/// Topic carrying a [`SimEventKind::Custom`] event per catch.
pub const PREDATION: Topic = Topic("predation");

/// Distance at which a hunter catches a grazer.
pub const CATCH_RADIUS: f64 = 12.0;

/// Seconds between a catch and the hunter's hunger being reset.
pub const DIGESTION: f64 = 2.0;

/// Lets hunters catch nearby grazers.
///
/// Runs after movement. A caught grazer is marked dead and queued for
/// removal at once; the hunter is fed through a deferred "sated" effect,
/// which is lost if the hunter itself is gone by then.
#[derive(Debug, Default)]
pub struct PredationStep {
    kills: usize,
}

impl PredationStep {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kills(&self) -> usize {
        self.kills
    }
}

impl System<Creature> for PredationStep {
    fn name(&self) -> &str {
        "predation"
    }

    fn tick(&mut self, ctx: &mut SimContext<'_, Creature>) -> SimResult<()> {
        let world = &*ctx.world;
        let mut caught: HashSet<EntityKey> = HashSet::new();
        let mut catches: Vec<(EntityKey, EntityKey)> = Vec::new();
        for hunter in world.entities() {
            if !matches!(hunter.body, Creature::Hunter { .. })
                || !hunter.alive
                || world.is_queued(hunter.key())
            {
                continue;
            }
            let prey = world.nearest_in(FAUNA_GRID, hunter.x, hunter.y, CATCH_RADIUS, |o| {
                o.body.is_grazer() && o.alive && !world.is_queued(o.key()) && !caught.contains(&o.key())
            })?;
            if let Some(prey) = prey {
                caught.insert(prey.key());
                catches.push((hunter.key(), prey.key()));
            }
        }

        for (hunter, prey) in catches {
            if let Some(entity) = ctx.world.get_mut(prey) {
                entity.alive = false;
            }
            ctx.world.queue_removal(prey);
            debug!(%hunter, %prey, "prey caught");
            ctx.publish(
                PREDATION,
                SimEventKind::Custom {
                    label: "caught".into(),
                    entities: vec![hunter, prey],
                },
            );
            ctx.defer(DIGESTION, hunter, "sated", |e| e.body.feed());
            self.kills += 1;
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
