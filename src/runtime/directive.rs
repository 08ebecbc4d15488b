//! Suspension directives
//!
//! The closed vocabulary a routine may yield to pause itself, and the
//! [`Routine`] trait the scheduler advances one step at a time.

use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::errors::RoutineResult;
use super::handle::Handle;
use super::scheduler::Cx;

/// A suspendable computation advanced by the scheduler.
///
/// Each call to [`resume`](Routine::resume) runs the routine up to its next
/// suspension point. Returning `Err` faults only this routine's frame.
pub trait Routine {
    /// Advance one step.
    fn resume(
        &mut self,
        cx: &mut Cx<'_>,
    ) -> RoutineResult<Step>;

    /// Name used in log output.
    fn name(&self) -> &str {
        "routine"
    }
}

impl<R: Routine + ?Sized> Routine for Box<R> {
    fn resume(
        &mut self,
        cx: &mut Cx<'_>,
    ) -> RoutineResult<Step> {
        (**self).resume(cx)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Outcome of advancing a routine by one step.
#[derive(Debug)]
pub enum Step {
    /// The routine paused and asks for the given kind of suspension.
    Yield(Directive),
    /// The routine ran to completion.
    Complete,
}

impl From<Directive> for Step {
    fn from(directive: Directive) -> Self {
        Step::Yield(directive)
    }
}

/// An externally owned operation polled for completion.
pub trait Pollable {
    /// Whether the operation has finished.
    fn is_finished(&self) -> bool;
}

impl Pollable for Handle {
    fn is_finished(&self) -> bool {
        self.is_done()
    }
}

impl Pollable for Arc<AtomicBool> {
    fn is_finished(&self) -> bool {
        self.load(Ordering::Acquire)
    }
}

/// Adapter turning a closure into a [`Pollable`].
pub struct Poll<F>(pub F);

impl<F: Fn() -> bool> Poll<F> {
    /// Wrap a completion check.
    pub fn new(check: F) -> Self {
        Poll(check)
    }
}

impl<F: Fn() -> bool> Pollable for Poll<F> {
    fn is_finished(&self) -> bool {
        (self.0)()
    }
}

/// A named scheduling window other than the ordinary step.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PhaseId(Cow<'static, str>);

impl PhaseId {
    /// Runs after physics-style fixed updates.
    pub const FIXED_UPDATE: PhaseId = PhaseId::from_static("fixed_update");
    /// Runs after every ordinary step in the same tick.
    pub const LATE_UPDATE: PhaseId = PhaseId::from_static("late_update");
    /// Runs once the tick's rendering work is done.
    pub const END_OF_FRAME: PhaseId = PhaseId::from_static("end_of_frame");

    /// Create a phase id from a static name.
    pub const fn from_static(name: &'static str) -> Self {
        PhaseId(Cow::Borrowed(name))
    }

    /// Create a phase id from an owned name.
    pub fn new(name: impl Into<String>) -> Self {
        PhaseId(Cow::Owned(name.into()))
    }

    /// The phase name.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhaseId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What kind of pause a routine asks for.
pub enum Directive {
    /// Resume on the next ordinary step.
    Continue,
    /// Run a nested routine to completion before resuming the caller.
    Subroutine(Box<dyn Routine>),
    /// Resume after `duration`, measured in scaled time when `scaled` is set.
    TimedDelay { duration: Duration, scaled: bool },
    /// Resume once an external operation reports completion.
    AwaitExternal(Box<dyn Pollable>),
    /// Resume once another routine's handle is done.
    AwaitHandle(Handle),
    /// Resume only during the named alternate phase.
    PhaseBarrier(PhaseId),
    /// A yielded value that is not a directive. Always a failure.
    Unsupported(String),
}

impl Directive {
    /// Yield a nested routine.
    pub fn call<R: Routine + 'static>(routine: R) -> Self {
        Directive::Subroutine(Box::new(routine))
    }

    /// Scaled delay.
    pub fn delay(duration: Duration) -> Self {
        Directive::TimedDelay {
            duration,
            scaled: true,
        }
    }

    /// Wall-clock delay that ignores the time scale.
    pub fn delay_unscaled(duration: Duration) -> Self {
        Directive::TimedDelay {
            duration,
            scaled: false,
        }
    }

    /// Wait for another routine.
    pub fn wait_for(handle: &Handle) -> Self {
        Directive::AwaitHandle(handle.clone())
    }

    /// Wait for an external operation.
    pub fn wait_until<P: Pollable + 'static>(pollable: P) -> Self {
        Directive::AwaitExternal(Box::new(pollable))
    }

    /// Park until the given alternate phase.
    pub fn barrier(phase: PhaseId) -> Self {
        Directive::PhaseBarrier(phase)
    }

    /// Classify a dynamically typed yielded value.
    ///
    /// Used by hosts whose routines yield untyped values. Anything that is
    /// not a recognised payload becomes [`Directive::Unsupported`].
    pub fn classify(value: Box<dyn Any>) -> Self {
        let value = match value.downcast::<Directive>() {
            Ok(directive) => return *directive,
            Err(value) => value,
        };
        if value.is::<()>() {
            return Directive::Continue;
        }
        let value = match value.downcast::<Handle>() {
            Ok(handle) => return Directive::AwaitHandle(*handle),
            Err(value) => value,
        };
        let value = match value.downcast::<Duration>() {
            Ok(duration) => return Directive::delay(*duration),
            Err(value) => value,
        };
        let value = match value.downcast::<PhaseId>() {
            Ok(phase) => return Directive::PhaseBarrier(*phase),
            Err(value) => value,
        };
        match value.downcast::<Box<dyn Routine>>() {
            Ok(routine) => Directive::Subroutine(*routine),
            Err(value) => Directive::Unsupported(describe_foreign(&*value)),
        }
    }

    /// Short name of the directive kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Directive::Continue => "continue",
            Directive::Subroutine(_) => "subroutine",
            Directive::TimedDelay { .. } => "timed_delay",
            Directive::AwaitExternal(_) => "await_external",
            Directive::AwaitHandle(_) => "await_handle",
            Directive::PhaseBarrier(_) => "phase_barrier",
            Directive::Unsupported(_) => "unsupported",
        }
    }
}

fn describe_foreign(value: &dyn Any) -> String {
    if let Some(s) = value.downcast_ref::<&'static str>() {
        format!("string {:?}", s)
    } else if let Some(s) = value.downcast_ref::<String>() {
        format!("string {:?}", s)
    } else if let Some(n) = value.downcast_ref::<i64>() {
        format!("integer {}", n)
    } else if let Some(n) = value.downcast_ref::<i32>() {
        format!("integer {}", n)
    } else if let Some(n) = value.downcast_ref::<f64>() {
        format!("float {}", n)
    } else if let Some(n) = value.downcast_ref::<f32>() {
        format!("float {}", n)
    } else {
        format!("value of {:?}", value.type_id())
    }
}

impl fmt::Debug for Directive {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Directive::Continue => write!(f, "Continue"),
            Directive::Subroutine(r) => write!(f, "Subroutine({})", r.name()),
            Directive::TimedDelay { duration, scaled } => f
                .debug_struct("TimedDelay")
                .field("duration", duration)
                .field("scaled", scaled)
                .finish(),
            Directive::AwaitExternal(_) => write!(f, "AwaitExternal"),
            Directive::AwaitHandle(h) => write!(f, "AwaitHandle({})", h.id()),
            Directive::PhaseBarrier(p) => write!(f, "PhaseBarrier({})", p),
            Directive::Unsupported(v) => write!(f, "Unsupported({})", v),
        }
    }
}
