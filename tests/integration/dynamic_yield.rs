//! Hosts whose routines yield untyped values

use std::any::Any;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use tickflow::runtime::{
    Cx, Directive, PhaseId, Routine, RoutineError, RoutineResult, Scheduler, Step,
};

/// Yields a scripted list of untyped values.
struct Scripted {
    values: VecDeque<Box<dyn Any>>,
}

impl Scripted {
    fn new(values: Vec<Box<dyn Any>>) -> Self {
        Self {
            values: values.into(),
        }
    }
}

impl Routine for Scripted {
    fn resume(
        &mut self,
        _cx: &mut Cx<'_>,
    ) -> RoutineResult<Step> {
        Ok(match self.values.pop_front() {
            Some(value) => Step::Yield(Directive::classify(value)),
            None => Step::Complete,
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

#[test]
fn test_untyped_yields_are_classified() {
    let mut scheduler = Scheduler::new();
    let handle = scheduler.start(
        Scripted::new(vec![
            Box::new(()),
            Box::new(PhaseId::END_OF_FRAME),
            Box::new(Duration::ZERO),
        ]),
        None,
    );
    assert!(!handle.is_done());

    scheduler.step();
    scheduler.step();
    assert!(!handle.is_done());

    scheduler.step_phase(&PhaseId::END_OF_FRAME);
    assert!(handle.is_done());
}

#[test]
fn test_untyped_foreign_value_fails_the_frame() {
    let mut scheduler = Scheduler::new();
    let errors = Rc::new(RefCell::new(Vec::new()));
    let sink = errors.clone();

    let handle = scheduler.start(
        Scripted::new(vec![Box::new(String::from("not a directive"))]),
        Some(Box::new(move |error: RoutineError| {
            sink.borrow_mut().push(error.to_string())
        })),
    );

    assert!(handle.is_done());
    assert_eq!(errors.borrow().len(), 1);
    assert!(errors.borrow()[0].contains("not a directive"));
}
