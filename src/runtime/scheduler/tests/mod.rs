//! Scheduler unit tests
//!
//! Covers stepping, failure containment, phases, stopping, waits and delays.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use crate::runtime::scheduler::{FailureHandler, Scheduler, SchedulerConfig};
use crate::runtime::time::ManualClock;
use crate::runtime::{RoutineError, Sequence};


/// Shared, ordered record of what routines did.
#[derive(Clone, Default)]
struct Trace(Rc<RefCell<Vec<String>>>);

impl Trace {
    fn push(
        &self,
        entry: &str,
    ) {
        self.0.borrow_mut().push(entry.to_string());
    }

    fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    fn contains(
        &self,
        entry: &str,
    ) -> bool {
        self.0.borrow().iter().any(|e| e == entry)
    }

    /// Sequence step that records `entry`.
    fn mark(
        &self,
        entry: &'static str,
    ) -> impl FnOnce(&mut crate::runtime::Cx<'_>) -> anyhow::Result<()> + 'static {
        let trace = self.clone();
        move |_| {
            trace.push(entry);
            Ok(())
        }
    }
}

/// Failure handler that records every error it receives.
fn recording_handler() -> (FailureHandler, Rc<RefCell<Vec<RoutineError>>>) {
    let errors: Rc<RefCell<Vec<RoutineError>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = errors.clone();
    let handler: FailureHandler = Box::new(move |error: RoutineError| sink.borrow_mut().push(error));
    (handler, errors)
}

fn manual_scheduler() -> (Scheduler, ManualClock) {
    let clock = ManualClock::new();
    let scheduler = Scheduler::with_clock(SchedulerConfig::default(), clock.clone()).unwrap();
    (scheduler, clock)
}

/// A sequence that yields `Continue` `n` times.
fn continues(n: usize) -> Sequence {
    (0..n).fold(Sequence::named("continues"), |seq, _| seq.yield_now())
}

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}
