//! Property tests for stepping invariants

use std::cell::Cell;
use std::rc::Rc;

use proptest::prelude::*;
use tickflow::runtime::{PhaseId, Routine, Scheduler, Sequence};

fn synchronous_chain(depth: usize) -> Box<dyn Routine> {
    if depth == 0 {
        return Box::new(Sequence::named("leaf"));
    }
    Box::new(Sequence::named("level").call(move || synchronous_chain(depth - 1)))
}

proptest! {
    #[test]
    fn prop_synchronous_chain_needs_one_step(depth in 0usize..200) {
        let mut scheduler = Scheduler::new();
        let handle = scheduler.start(
            Sequence::named("root")
                .yield_now()
                .call(move || synchronous_chain(depth)),
            None,
        );
        prop_assert!(!handle.is_done());
        scheduler.step();
        prop_assert!(handle.is_done());
    }

    #[test]
    fn prop_n_continues_need_n_steps(n in 1usize..40) {
        let mut scheduler = Scheduler::new();
        let handle = scheduler.start(
            (0..n).fold(Sequence::new(), |seq, _| seq.yield_now()),
            None,
        );
        let mut steps = 0;
        while !handle.is_done() {
            scheduler.step();
            steps += 1;
            prop_assert!(steps <= n);
        }
        prop_assert_eq!(steps, n);
    }

    #[test]
    fn prop_barrier_advances_once_per_matching_phase(
        ordinary in 0usize..20,
        phase_calls in 0usize..20,
    ) {
        let mut scheduler = Scheduler::new();
        let runs = Rc::new(Cell::new(0usize));
        let counter = runs.clone();
        scheduler.start(
            tickflow::runtime::from_fn("barrier-loop", move |_| {
                counter.set(counter.get() + 1);
                Ok(tickflow::Step::Yield(tickflow::Directive::barrier(PhaseId::FIXED_UPDATE)))
            }),
            None,
        );
        for _ in 0..ordinary {
            scheduler.step();
        }
        for _ in 0..phase_calls {
            scheduler.step_phase(&PhaseId::FIXED_UPDATE);
            scheduler.step_phase(&PhaseId::LATE_UPDATE);
        }
        prop_assert_eq!(runs.get(), 1 + phase_calls);
    }
}
