//! Routine context passed to every [`Routine::resume`] call.

use std::time::Instant;

use tracing::trace;

use super::tree::{FailurePolicy, RoutineOptions, RoutineTree};
use crate::runtime::directive::{PhaseId, Routine};
use crate::runtime::handle::{Handle, RoutineId, RoutineIdGenerator};

/// Snapshot of scheduler state for one phase call.
#[derive(Debug, Clone)]
pub(crate) struct Moment {
    pub now: Instant,
    pub time_scale: f64,
    pub tick: u64,
    pub phase: Option<PhaseId>,
}

/// Spawns and stops requested by routines, applied once the requesting
/// tree has finished its step.
#[derive(Default)]
pub(crate) struct Pending {
    pub spawns: Vec<RoutineTree>,
    pub stops: Vec<Handle>,
}

impl Pending {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.spawns.is_empty() && self.stops.is_empty()
    }
}

/// What a routine can see and request while it is being advanced.
pub struct Cx<'a> {
    moment: &'a Moment,
    routine: RoutineId,
    default_policy: FailurePolicy,
    ids: &'a mut RoutineIdGenerator,
    pending: &'a mut Pending,
}

impl<'a> Cx<'a> {
    pub(crate) fn new(
        moment: &'a Moment,
        routine: RoutineId,
        default_policy: FailurePolicy,
        ids: &'a mut RoutineIdGenerator,
        pending: &'a mut Pending,
    ) -> Self {
        Self {
            moment,
            routine,
            default_policy,
            ids,
            pending,
        }
    }

    /// Time of the current phase call.
    #[inline]
    pub fn now(&self) -> Instant {
        self.moment.now
    }

    /// Time-scale factor in effect for this phase call.
    #[inline]
    pub fn time_scale(&self) -> f64 {
        self.moment.time_scale
    }

    /// The alternate phase being stepped, or `None` during an ordinary step.
    #[inline]
    pub fn phase(&self) -> Option<&PhaseId> {
        self.moment.phase.as_ref()
    }

    /// Number of ordinary steps taken so far.
    #[inline]
    pub fn tick(&self) -> u64 {
        self.moment.tick
    }

    /// The tree currently being advanced.
    #[inline]
    pub fn routine_id(&self) -> RoutineId {
        self.routine
    }

    /// Start an independent routine tree.
    ///
    /// The tree is admitted after the current tree's step and gets its first
    /// synchronous step within the same phase call.
    ///
    /// Unlike [`Scheduler::start_with`](super::Scheduler::start_with), a
    /// [`unique`](RoutineOptions::unique) spawn cannot hand back the handle of
    /// a live tree with the same name, since that tree is only looked up at
    /// admission. The colliding spawn is dropped and the returned handle is
    /// already done when the current step ends; wait on the original tree's
    /// handle instead.
    pub fn spawn<R: Routine + 'static>(
        &mut self,
        routine: R,
        options: RoutineOptions,
    ) -> Handle {
        let tree = RoutineTree::new(
            self.ids.next(),
            Box::new(routine),
            options,
            self.default_policy,
        );
        let handle = tree.handle().clone();
        trace!(parent = %self.routine, child = %handle.id(), "spawn requested");
        self.pending.spawns.push(tree);
        handle
    }

    /// Stop another routine tree once the current step ends.
    ///
    /// Stopping the tree that is currently running takes effect after it
    /// yields. A tree spawned earlier in the same step is dropped before it
    /// ever runs.
    pub fn stop(
        &mut self,
        handle: &Handle,
    ) {
        self.pending.stops.push(handle.clone());
    }
}
