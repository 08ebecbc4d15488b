//! Failure handling integration tests

use std::cell::Cell;
use std::rc::Rc;

use tickflow::runtime::{
    Directive, FailurePolicy, RoutineError, RoutineOptions, Scheduler, Sequence,
};

#[test]
fn test_each_originating_error_reaches_handler_once() {
    let mut scheduler = Scheduler::new();
    let failures = Rc::new(Cell::new(0));
    let count = failures.clone();

    let handle = scheduler.start_with(
        Sequence::named("batch")
            .call(|| Sequence::named("a").yield_now().fail("a failed"))
            .call(|| Sequence::named("b").fail("b failed"))
            .call(|| Sequence::named("c").yield_now()),
        RoutineOptions::new().on_failure(move |_| count.set(count.get() + 1)),
    );

    // b fails synchronously right after a's failure is contained.
    scheduler.step();
    assert_eq!(failures.get(), 2);
    assert!(!handle.is_done());

    scheduler.step();
    assert!(handle.is_done());
    assert_eq!(failures.get(), 2);
}

#[test]
fn test_handler_receives_typed_errors() {
    let mut scheduler = Scheduler::new();
    let kinds = Rc::new(std::cell::RefCell::new(Vec::new()));
    let sink = kinds.clone();

    scheduler.start_with(
        Sequence::named("mixed")
            .call(|| Sequence::new().then_yield(|_| Directive::Unsupported("banana".into())))
            .call(|| Sequence::new().fail("io")),
        RoutineOptions::new().on_failure(move |error: RoutineError| {
            sink.borrow_mut().push(error.is_unsupported());
        }),
    );

    assert_eq!(*kinds.borrow(), vec![true, false]);
}

#[test]
fn test_failure_in_one_tree_does_not_touch_siblings() {
    let mut scheduler = Scheduler::new();
    let sibling = scheduler.start(
        (0..3).fold(Sequence::named("sibling"), |seq, _| seq.yield_now()),
        None,
    );
    let broken = scheduler.start_with(
        Sequence::named("broken").yield_now().fail("nope"),
        RoutineOptions::new().policy(FailurePolicy::AbortTree),
    );

    scheduler.step();
    assert!(broken.is_done());
    assert!(!sibling.is_done());

    scheduler.step();
    scheduler.step();
    assert!(sibling.is_done());
    assert_eq!(scheduler.stats().failed, 1);
}
