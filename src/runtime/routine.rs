//! Routine authoring helpers
//!
//! Routines are plain state machines implementing [`Routine`]. For the
//! common shapes there are two shortcuts:
//!
//! - [`from_fn`] wraps a closure that is called once per step.
//! - [`Sequence`] is a list of synchronous actions and suspension points,
//!   run in order.
//!
//! ```rust
//! use std::time::Duration;
//! use tickflow::runtime::{PhaseId, Scheduler, Sequence};
//!
//! let mut scheduler = Scheduler::new();
//! let handle = scheduler.start(
//!     Sequence::named("fade")
//!         .run(|_| Ok(()))
//!         .wait(Duration::from_millis(0))
//!         .barrier(PhaseId::END_OF_FRAME)
//!         .run(|_| Ok(())),
//!     None,
//! );
//! assert!(!handle.is_done());
//! ```

use std::borrow::Cow;
use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use super::directive::{Directive, PhaseId, Pollable, Routine, Step};
use super::errors::{RoutineError, RoutineResult};
use super::handle::Handle;
use super::scheduler::Cx;

/// Routine backed by a closure.
pub struct FnRoutine<F> {
    name: Cow<'static, str>,
    step: F,
}

/// Build a routine from a closure called once per step.
pub fn from_fn<F>(
    name: impl Into<Cow<'static, str>>,
    step: F,
) -> FnRoutine<F>
where
    F: FnMut(&mut Cx<'_>) -> RoutineResult<Step>,
{
    FnRoutine {
        name: name.into(),
        step,
    }
}

impl<F> Routine for FnRoutine<F>
where
    F: FnMut(&mut Cx<'_>) -> RoutineResult<Step>,
{
    fn resume(
        &mut self,
        cx: &mut Cx<'_>,
    ) -> RoutineResult<Step> {
        (self.step)(cx)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

type Action = Box<dyn FnOnce(&mut Cx<'_>) -> anyhow::Result<()>>;
type Suspend = Box<dyn FnOnce(&mut Cx<'_>) -> Directive>;

enum Op {
    Run(Action),
    Yield(Suspend),
}

/// A routine made of ordered actions and suspension points.
///
/// On each step it runs actions until it reaches a suspension point and
/// yields that directive. It completes once no operations remain. An action
/// returning an error fails the routine; the operations after it never run.
pub struct Sequence {
    name: Cow<'static, str>,
    ops: VecDeque<Op>,
}

impl Sequence {
    pub fn new() -> Self {
        Self::named("sequence")
    }

    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            ops: VecDeque::new(),
        }
    }

    /// Run synchronous code.
    pub fn run<F>(
        mut self,
        action: F,
    ) -> Self
    where
        F: FnOnce(&mut Cx<'_>) -> anyhow::Result<()> + 'static,
    {
        self.ops.push_back(Op::Run(Box::new(action)));
        self
    }

    /// Yield a directive built when the point is reached.
    pub fn then_yield<F>(
        mut self,
        suspend: F,
    ) -> Self
    where
        F: FnOnce(&mut Cx<'_>) -> Directive + 'static,
    {
        self.ops.push_back(Op::Yield(Box::new(suspend)));
        self
    }

    /// Resume on the next ordinary step.
    pub fn yield_now(self) -> Self {
        self.then_yield(|_| Directive::Continue)
    }

    /// Run a subroutine built when the point is reached.
    pub fn call<F, R>(
        self,
        build: F,
    ) -> Self
    where
        F: FnOnce() -> R + 'static,
        R: Routine + 'static,
    {
        self.then_yield(move |_| Directive::call(build()))
    }

    /// Scaled delay.
    pub fn wait(
        self,
        duration: Duration,
    ) -> Self {
        self.then_yield(move |_| Directive::delay(duration))
    }

    /// Wall-clock delay.
    pub fn wait_realtime(
        self,
        duration: Duration,
    ) -> Self {
        self.then_yield(move |_| Directive::delay_unscaled(duration))
    }

    /// Wait for another routine to be done.
    pub fn wait_for(
        self,
        handle: Handle,
    ) -> Self {
        self.then_yield(move |_| Directive::AwaitHandle(handle))
    }

    /// Wait for an external operation.
    pub fn wait_until<P: Pollable + 'static>(
        self,
        op: P,
    ) -> Self {
        self.then_yield(move |_| Directive::wait_until(op))
    }

    /// Park until the given alternate phase.
    pub fn barrier(
        self,
        phase: PhaseId,
    ) -> Self {
        self.then_yield(move |_| Directive::PhaseBarrier(phase))
    }

    /// Fail with the given message when reached.
    pub fn fail(
        self,
        message: impl Into<String>,
    ) -> Self {
        let message = message.into();
        self.run(move |_| Err(anyhow::Error::msg(message)))
    }

    /// Operations not yet reached.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.ops.len()
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Self::new()
    }
}

impl Routine for Sequence {
    fn resume(
        &mut self,
        cx: &mut Cx<'_>,
    ) -> RoutineResult<Step> {
        while let Some(op) = self.ops.pop_front() {
            match op {
                Op::Run(action) => action(cx).map_err(RoutineError::Computation)?,
                Op::Yield(suspend) => return Ok(Step::Yield(suspend(cx))),
            }
        }
        Ok(Step::Complete)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for Sequence {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Sequence")
            .field("name", &self.name)
            .field("remaining", &self.ops.len())
            .finish()
    }
}
