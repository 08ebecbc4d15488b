//! Routine call frames

use std::fmt;

use super::directive::{PhaseId, Pollable, Routine};
use super::handle::Handle;

/// What the head frame is parked on between ticks.
pub enum Wait {
    /// An external operation that has not reported completion yet.
    External(Box<dyn Pollable>),
    /// Another routine's handle.
    Handle(Handle),
    /// A named alternate phase.
    Phase(PhaseId),
}

impl Wait {
    /// Whether an ordinary step may clear this wait and advance the frame.
    #[inline]
    pub fn satisfied_in_ordinary(&self) -> bool {
        match self {
            Wait::External(op) => op.is_finished(),
            Wait::Handle(handle) => handle.is_done(),
            Wait::Phase(_) => false,
        }
    }
}

impl fmt::Debug for Wait {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Wait::External(_) => write!(f, "External"),
            Wait::Handle(h) => write!(f, "Handle({})", h.id()),
            Wait::Phase(p) => write!(f, "Phase({})", p),
        }
    }
}

/// One level of a routine's call chain.
///
/// The head frame owns its caller, so the whole chain is owned by the tree
/// through its head pointer. A frame is dropped as soon as it is popped.
pub struct Frame {
    /// The in-progress computation.
    pub routine: Box<dyn Routine>,
    /// Recorded wait from the last yield, if any.
    pub wait: Option<Wait>,
    /// The frame that yielded this one as a subroutine.
    pub caller: Option<Box<Frame>>,
}

impl Frame {
    /// Create a root frame.
    pub fn new(routine: Box<dyn Routine>) -> Self {
        Self {
            routine,
            wait: None,
            caller: None,
        }
    }

    /// Create a frame called from `caller`.
    pub fn with_caller(
        routine: Box<dyn Routine>,
        caller: Box<Frame>,
    ) -> Self {
        Self {
            routine,
            wait: None,
            caller: Some(caller),
        }
    }

    /// Whether the frame is parked on the given alternate phase.
    #[inline]
    pub fn parked_on(
        &self,
        phase: &PhaseId,
    ) -> bool {
        matches!(&self.wait, Some(Wait::Phase(p)) if p == phase)
    }

    /// Whether an ordinary step should advance this frame now.
    #[inline]
    pub fn is_ready_for_ordinary(&self) -> bool {
        self.wait
            .as_ref()
            .map_or(true, Wait::satisfied_in_ordinary)
    }

    /// Detach and return the caller, leaving this frame a root.
    #[inline]
    pub fn take_caller(&mut self) -> Option<Box<Frame>> {
        self.caller.take()
    }
}

impl fmt::Debug for Frame {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Frame")
            .field("routine", &self.routine.name())
            .field("wait", &self.wait)
            .field("has_caller", &self.caller.is_some())
            .finish()
    }
}
