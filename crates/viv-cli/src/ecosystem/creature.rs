use std::f64::consts::TAU;

use viv_core::{CoreResult, Entity, Intent, Teardown};
use viv_simulation::{Behavior, Breeder, Contributor, Decider, Senses, Shared, Transition};

use super::{FAUNA_GRID, FLORA_GRID};

/// Environment gained per plant per second.
const PLANT_OUTPUT: f64 = 0.5;
/// Environment consumed per grazer per second.
const GRAZER_INTAKE: f64 = 1.0;
/// Plants wilt while the environment level is below this.
const WILT_LEVEL: f64 = 0.25;
const WILT_RATE: f64 = 0.1;
const GROWTH_RATE: f64 = 0.05;
const GRAZER_HUNGER_RATE: f64 = 0.04;
/// Hunger a grazer sheds per second on a full pasture.
const GRAZE_RATE: f64 = 0.08;
const GRAZER_MATURITY: f64 = 10.0;
const HUNTER_HUNGER_RATE: f64 = 0.025;
/// Fraction of full speed used while no target is in sight.
const WANDER_PACE: f64 = 0.5;

/// The demo ecosystem's entity body.
#[derive(Debug, Clone, PartialEq)]
pub enum Creature {
    /// Feeds the environment; wilts when the environment runs low.
    Plant { vigor: f64 },
    /// Grazes the environment, flees hunters, seeks plants, and breeds.
    Grazer { hunger: f64 },
    /// Chases grazers; fed by the predation step.
    Hunter { hunger: f64 },
}

impl Creature {
    pub fn is_grazer(&self) -> bool {
        matches!(self, Creature::Grazer { .. })
    }

    /// Reset a hunter's hunger. Other creatures are unaffected.
    pub fn feed(&mut self) {
        if let Creature::Hunter { hunger } = self {
            *hunger = 0.0;
        }
    }
}

impl Teardown for Creature {}

impl Behavior for Creature {
    fn update(&mut self, dt: f64, shared: &Shared) -> Transition {
        match self {
            Creature::Plant { vigor } => {
                if shared.environment_level < WILT_LEVEL {
                    *vigor -= WILT_RATE * dt;
                } else {
                    *vigor = (*vigor + GROWTH_RATE * dt).min(1.0);
                }
                // Wilted plants leave through the accumulation step.
                Transition::Live
            }
            Creature::Grazer { hunger } => {
                *hunger += (GRAZER_HUNGER_RATE - shared.environment_level * GRAZE_RATE) * dt;
                *hunger = hunger.max(0.0);
                starving(*hunger)
            }
            Creature::Hunter { hunger } => {
                *hunger += HUNTER_HUNGER_RATE * dt;
                starving(*hunger)
            }
        }
    }

    fn as_decider(&self) -> Option<&dyn Decider<Self>> {
        match self {
            Creature::Plant { .. } => None,
            Creature::Grazer { .. } | Creature::Hunter { .. } => Some(self),
        }
    }

    fn as_breeder(&self) -> Option<&dyn Breeder> {
        match self {
            Creature::Grazer { .. } => Some(self),
            _ => None,
        }
    }

    fn as_contributor(&self) -> Option<&dyn Contributor> {
        match self {
            Creature::Plant { .. } | Creature::Grazer { .. } => Some(self),
            Creature::Hunter { .. } => None,
        }
    }
}

fn starving(hunger: f64) -> Transition {
    if hunger >= 1.0 {
        Transition::Die
    } else {
        Transition::Live
    }
}

impl Decider<Creature> for Creature {
    fn decide(&self, me: &Entity<Creature>, senses: &Senses<'_, Creature>) -> CoreResult<Intent> {
        let radius = me.species.sense_radius;
        let speed = me.species.speed;
        let intent = match self {
            Creature::Plant { .. } => Intent::idle(),
            Creature::Grazer { .. } => {
                let hunter = senses.nearest(me, FAUNA_GRID, radius, |o| matches!(o.body, Creature::Hunter { .. }))?;
                if let Some(hunter) = hunter {
                    // Run directly away from the threat.
                    return Ok(Intent::toward(me.x, me.y, 2.0 * me.x - hunter.x, 2.0 * me.y - hunter.y, speed));
                }
                let plant = senses.nearest(me, FLORA_GRID, radius, |o| matches!(o.body, Creature::Plant { .. }))?;
                match plant {
                    Some(plant) => Intent::toward(me.x, me.y, plant.x, plant.y, speed).aimed_at(plant.key()),
                    None => wander(me, senses.roll()),
                }
            }
            Creature::Hunter { .. } => {
                let prey = senses.nearest(me, FAUNA_GRID, radius, |o| o.body.is_grazer())?;
                match prey {
                    Some(prey) => Intent::toward(me.x, me.y, prey.x, prey.y, speed).aimed_at(prey.key()),
                    None => wander(me, senses.roll()),
                }
            }
        };
        Ok(intent)
    }
}

fn wander(me: &Entity<Creature>, roll: f64) -> Intent {
    let angle = roll * TAU;
    Intent::toward(
        me.x,
        me.y,
        me.x + angle.cos(),
        me.y + angle.sin(),
        me.species.speed * WANDER_PACE,
    )
}

impl Breeder for Creature {
    fn maturity(&self) -> f64 {
        GRAZER_MATURITY
    }
}

impl Contributor for Creature {
    fn contribution(&self) -> f64 {
        match self {
            Creature::Plant { .. } => PLANT_OUTPUT,
            Creature::Grazer { .. } => -GRAZER_INTAKE,
            Creature::Hunter { .. } => 0.0,
        }
    }

    fn expired(&self) -> bool {
        matches!(self, Creature::Plant { vigor } if *vigor <= 0.0)
    }
}

#[cfg(test)]
mod tests {
    use viv_simulation::DayPhase;

    use super::*;

    fn shared(level: f64) -> Shared {
        Shared {
            tick: 1,
            time: 1.0,
            dt: 1.0,
            environment: level * 100.0,
            environment_level: level,
            phase: DayPhase::Day,
        }
    }

    #[test]
    fn plants_wilt_on_a_poor_environment() {
        let mut plant = Creature::Plant { vigor: 0.05 };
        assert_eq!(plant.update(1.0, &shared(0.1)), Transition::Live);
        assert!(plant.as_contributor().unwrap().expired());

        let mut healthy = Creature::Plant { vigor: 0.98 };
        healthy.update(1.0, &shared(0.9));
        assert_eq!(healthy, Creature::Plant { vigor: 1.0 });
        assert!(!healthy.as_contributor().unwrap().expired());
    }

    #[test]
    fn grazers_starve_on_an_empty_pasture() {
        let mut grazer = Creature::Grazer { hunger: 0.99 };
        assert_eq!(grazer.update(1.0, &shared(0.0)), Transition::Die);

        let mut fed = Creature::Grazer { hunger: 0.5 };
        assert_eq!(fed.update(1.0, &shared(1.0)), Transition::Live);
        let Creature::Grazer { hunger } = fed else {
            panic!("grazer changed kind");
        };
        assert!((hunger - 0.46).abs() < 1e-9);
    }

    #[test]
    fn feeding_resets_hunters_only() {
        let mut hunter = Creature::Hunter { hunger: 0.8 };
        hunter.feed();
        assert_eq!(hunter, Creature::Hunter { hunger: 0.0 });

        let mut grazer = Creature::Grazer { hunger: 0.8 };
        grazer.feed();
        assert_eq!(grazer, Creature::Grazer { hunger: 0.8 });
    }

    #[test]
    fn capabilities_per_variant() {
        let plant = Creature::Plant { vigor: 1.0 };
        let grazer = Creature::Grazer { hunger: 0.0 };
        let hunter = Creature::Hunter { hunger: 0.0 };

        assert!(plant.as_decider().is_none());
        assert!(plant.as_breeder().is_none());
        assert!(grazer.as_breeder().is_some());
        assert!(grazer.as_contributor().unwrap().contribution() < 0.0);
        assert!(hunter.as_contributor().is_none());
        assert!(hunter.as_decider().is_some());
    }
}
