//! Property tests for the simulation scheduler.
use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use proptest::prelude::*;
use viv_simulation::{Scheduler, SimResult, Subsystem};

struct Tally {
    seen: Rc<RefCell<Vec<f64>>>,
}

impl Subsystem for Tally {
    fn name(&self) -> &str {
        "tally"
    }

    fn update(&mut self, dt: f64) -> SimResult<()> {
        self.seen.borrow_mut().push(dt);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

proptest! {
    #[test]
    fn dt_never_exceeds_the_maximum(
        tick_rate in 1.0f64..240.0,
        max_dt in 0.005f64..0.5,
        gaps in prop::collection::vec(0.0f64..2_000.0, 1..80),
    ) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut scheduler = Scheduler::new(tick_rate, max_dt).unwrap();
        scheduler.add(Tally { seen: Rc::clone(&seen) });
        scheduler.start(0.0);

        let mut now = 0.0;
        let mut executed = 0u64;
        for gap in gaps {
            now += gap;
            if let Some(dt) = scheduler.frame(now).unwrap() {
                prop_assert!(dt <= max_dt);
                prop_assert!(dt > 0.0);
                executed += 1;
            }
        }

        prop_assert_eq!(scheduler.frames(), executed);
        prop_assert_eq!(seen.borrow().len() as u64, executed);
        prop_assert!(seen.borrow().iter().all(|dt| *dt <= max_dt));
    }

    #[test]
    fn frames_never_outpace_the_tick_rate(
        tick_rate in 1.0f64..240.0,
        gaps in prop::collection::vec(0.0f64..50.0, 1..200),
    ) {
        let mut scheduler = Scheduler::new(tick_rate, 0.1).unwrap();
        scheduler.start(0.0);

        let mut now = 0.0;
        for gap in gaps {
            now += gap;
            scheduler.frame(now).unwrap();
        }

        let interval = scheduler.interval_ms();
        prop_assert!(scheduler.frames() as f64 <= now / interval + 1e-9);
    }
}
