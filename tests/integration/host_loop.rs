//! Host loop integration tests
//!
//! Drives the scheduler through `HostLoop` the way an embedding application
//! would: ordinary step, alternate phases, sweep.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use tickflow::runtime::{
    HostLoop, ManualClock, PhaseId, RoutineOptions, Scheduler, SchedulerConfig, Sequence,
};

fn host_with_clock(phases: Vec<PhaseId>) -> (HostLoop, ManualClock) {
    let clock = ManualClock::new();
    let scheduler = Scheduler::with_clock(SchedulerConfig::default(), clock.clone()).unwrap();
    (HostLoop::new(scheduler, phases, Duration::ZERO), clock)
}

#[test]
fn test_run_until_idle_stops_when_all_routines_finish() {
    let (mut host, _clock) = host_with_clock(vec![PhaseId::END_OF_FRAME]);
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = events.clone();

    host.scheduler_mut().start(
        Sequence::named("frame-bound")
            .yield_now()
            .barrier(PhaseId::END_OF_FRAME)
            .run(move |cx| {
                sink.borrow_mut().push((cx.tick(), cx.phase().cloned()));
                Ok(())
            }),
        None,
    );

    let ran = host.run_until_idle(100);

    assert_eq!(ran, 1);
    assert!(host.scheduler().is_empty());
    assert_eq!(*events.borrow(), vec![(1, Some(PhaseId::END_OF_FRAME))]);
}

#[test]
fn test_run_until_idle_respects_tick_limit() {
    let (mut host, _clock) = host_with_clock(Vec::new());
    let handle = host.scheduler_mut().start(
        (0..50).fold(Sequence::new(), |seq, _| seq.yield_now()),
        None,
    );

    assert_eq!(host.run_until_idle(10), 10);
    assert_eq!(host.ticks(), 10);
    assert!(!handle.is_done());
    assert_eq!(host.scheduler().len(), 1);
}

#[test]
fn test_delay_chain_with_manual_clock() {
    let (mut host, clock) = host_with_clock(vec![PhaseId::LATE_UPDATE]);
    let first = host.scheduler_mut().start_with(
        Sequence::named("first").wait(Duration::from_millis(100)),
        RoutineOptions::new().name("first"),
    );
    let second = host.scheduler_mut().start(
        Sequence::named("second")
            .wait_for(first.clone())
            .wait(Duration::from_millis(100)),
        None,
    );

    let mut ticks = 0;
    while !second.is_done() {
        clock.advance(Duration::from_millis(25));
        host.run_tick();
        ticks += 1;
        assert!(ticks < 100, "delays never resolved");
    }

    assert!(first.is_done());
    // 4 ticks for the first delay, then the second starts on that same tick
    // and needs 4 more.
    assert_eq!(ticks, 8);
}

#[test]
fn test_finished_handle_outlives_tree() {
    let (mut host, _clock) = host_with_clock(Vec::new());
    let handle = host.scheduler_mut().start(Sequence::new().yield_now(), None);

    host.run_tick();
    assert!(handle.is_done());
    assert!(!host.scheduler().is_live(&handle));

    let scheduler = host.into_scheduler();
    drop(scheduler);
    assert!(handle.is_done());
}
