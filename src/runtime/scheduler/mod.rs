//! Cooperative routine scheduler
//!
//! This module provides the [`Scheduler`], a single-threaded engine that
//! advances trees of nested routines when the host loop calls one of its
//! phase entry points:
//!
//! 1. [`Scheduler::step`] – the ordinary step, once per tick.
//! 2. [`Scheduler::step_phase`] – zero or more named alternate phases.
//! 3. [`Scheduler::sweep`] – drops finished trees from bookkeeping.
//!
//! Routines are only ever suspended where they yield a [`Directive`].
//! Stopping a tree is immediate: no frame in its chain is advanced again,
//! so no cleanup code inside a suspended routine runs.

pub mod context;
pub mod tree;

pub use context::Cx;
pub use tree::{FailureHandler, FailurePolicy, RoutineOptions, RoutineTree};

use std::mem;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use context::{Moment, Pending};

use crate::runtime::directive::{Directive, PhaseId, Routine, Step};
use crate::runtime::errors::{RoutineError, SchedulerError};
use crate::runtime::frame::Wait;
use crate::runtime::handle::{Handle, RoutineId, RoutineIdGenerator};
use crate::runtime::time::{Clock, Delay, SystemClock, TimeScale};

/// Scheduler configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Maximum number of frames in one tree's chain.
    pub max_frame_depth: usize,
    /// Default failure policy for new trees.
    pub failure_policy: FailurePolicy,
    /// Initial time-scale factor.
    pub time_scale: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_frame_depth: 1024,
            failure_policy: FailurePolicy::ContainAtOrigin,
            time_scale: 1.0,
        }
    }
}

/// Scheduler statistics.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Trees started, including ones spawned from routines.
    pub started: u64,
    /// Trees whose root routine ran to completion.
    pub completed: u64,
    /// Trees emptied by a failure, either of the root frame or under
    /// [`FailurePolicy::AbortTree`].
    pub aborted: u64,
    /// Contained failures.
    pub failed: u64,
    /// Failures dropped because no handler was registered.
    pub discarded: u64,
    /// Trees stopped before finishing.
    pub stopped: u64,
    /// Unique starts refused because a live tree had the same name.
    pub duplicates: u64,
    /// Subroutine and delay frames pushed.
    pub frames_pushed: u64,
    /// Ordinary steps taken.
    pub ticks: u64,
}

/// Owns the live routine trees and advances them phase by phase.
pub struct Scheduler {
    config: SchedulerConfig,
    trees: IndexMap<RoutineId, RoutineTree>,
    ids: RoutineIdGenerator,
    pending: Pending,
    clock: Box<dyn Clock>,
    time_scale: TimeScale,
    stats: SchedulerStats,
    tick: u64,
}

impl Scheduler {
    /// Create a scheduler with default config and the system clock.
    #[inline]
    pub fn new() -> Self {
        Self::build(SchedulerConfig::default(), Box::new(SystemClock), TimeScale::default())
    }

    /// Create a scheduler with custom configuration.
    pub fn with_config(config: SchedulerConfig) -> Result<Self, SchedulerError> {
        Self::with_clock(config, SystemClock)
    }

    /// Create a scheduler with custom configuration and clock.
    pub fn with_clock<C: Clock + 'static>(
        config: SchedulerConfig,
        clock: C,
    ) -> Result<Self, SchedulerError> {
        let time_scale = TimeScale::new(config.time_scale)?;
        Ok(Self::build(config, Box::new(clock), time_scale))
    }

    fn build(
        config: SchedulerConfig,
        clock: Box<dyn Clock>,
        time_scale: TimeScale,
    ) -> Self {
        Self {
            config,
            trees: IndexMap::new(),
            ids: RoutineIdGenerator::new(),
            pending: Pending::default(),
            clock,
            time_scale,
            stats: SchedulerStats::default(),
            tick: 0,
        }
    }

    /// Start a routine, stepping it once before returning its handle.
    ///
    /// The handle is already done if the routine completed or failed out
    /// within that first step.
    pub fn start<R: Routine + 'static>(
        &mut self,
        routine: R,
        on_failure: Option<FailureHandler>,
    ) -> Handle {
        self.start_with(routine, RoutineOptions::with_handler(on_failure))
    }

    /// Start a routine with explicit options.
    ///
    /// A [`unique`](RoutineOptions::unique) start whose name matches a live,
    /// unfinished tree logs a warning and returns that tree's handle.
    pub fn start_with<R: Routine + 'static>(
        &mut self,
        routine: R,
        options: RoutineOptions,
    ) -> Handle {
        let tree = RoutineTree::new(
            self.ids.next(),
            Box::new(routine),
            options,
            self.config.failure_policy,
        );
        let moment = self.moment(None);
        let handle = self.admit(tree, &moment);
        self.apply_pending(&moment);
        handle
    }

    /// Stop a tree immediately.
    ///
    /// No frame in the chain runs again, including any cleanup it would do
    /// after its current suspension point. Stopping a finished or unknown
    /// handle does nothing.
    pub fn stop(
        &mut self,
        handle: &Handle,
    ) {
        if let Some(tree) = self.trees.get_mut(&handle.id()) {
            if !tree.is_finished() {
                tree.clear();
                self.stats.stopped += 1;
                debug!(routine = %handle.id(), name = tree.name(), "stopped");
            }
        }
    }

    /// Stop every live tree.
    pub fn stop_all(&mut self) {
        for tree in self.trees.values_mut() {
            if !tree.is_finished() {
                tree.clear();
                self.stats.stopped += 1;
            }
        }
        debug!(live = self.trees.len(), "stopped all routines");
    }

    /// Ordinary step: advance every tree not parked on a phase barrier or an
    /// unfinished wait.
    pub fn step(&mut self) {
        self.tick += 1;
        self.stats.ticks += 1;
        let moment = self.moment(None);
        self.run_pass(&moment);
    }

    /// Alternate-phase step: resume only trees parked on `phase`.
    pub fn step_phase(
        &mut self,
        phase: &PhaseId,
    ) {
        let moment = self.moment(Some(phase.clone()));
        self.run_pass(&moment);
    }

    /// Remove finished trees from the live set. Returns how many were removed.
    pub fn sweep(&mut self) -> usize {
        let before = self.trees.len();
        self.trees.retain(|_, tree| !tree.is_finished());
        let removed = before - self.trees.len();
        if removed > 0 {
            trace!(removed, live = self.trees.len(), "sweep");
        }
        removed
    }

    /// Run one full tick: ordinary step, each alternate phase in order, sweep.
    pub fn tick(
        &mut self,
        phases: &[PhaseId],
    ) {
        self.step();
        for phase in phases {
            self.step_phase(phase);
        }
        self.sweep();
    }

    /// Shared time-scale factor.
    #[inline]
    pub fn time_scale(&self) -> TimeScale {
        self.time_scale.clone()
    }

    /// Change the time-scale factor.
    pub fn set_time_scale(
        &mut self,
        factor: f64,
    ) -> Result<(), SchedulerError> {
        self.time_scale.set(factor)
    }

    #[inline]
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    #[inline]
    pub fn stats(&self) -> &SchedulerStats {
        &self.stats
    }

    /// Number of trees in the live set, finished-but-unswept ones included.
    #[inline]
    pub fn len(&self) -> usize {
        self.trees.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// Whether any tree still has frames to run.
    pub fn has_running(&self) -> bool {
        self.trees.values().any(|tree| !tree.is_finished())
    }

    /// Whether the handle's tree is still in the live set.
    #[inline]
    pub fn is_live(
        &self,
        handle: &Handle,
    ) -> bool {
        self.trees.contains_key(&handle.id())
    }

    /// Handles of all trees in the live set.
    pub fn handles(&self) -> Vec<Handle> {
        self.trees.values().map(|tree| tree.handle().clone()).collect()
    }

    /// Look up a live tree.
    #[inline]
    pub fn tree(
        &self,
        handle: &Handle,
    ) -> Option<&RoutineTree> {
        self.trees.get(&handle.id())
    }

    fn moment(
        &self,
        phase: Option<PhaseId>,
    ) -> Moment {
        Moment {
            now: self.clock.now(),
            time_scale: self.time_scale.get(),
            tick: self.tick,
            phase,
        }
    }

    fn run_pass(
        &mut self,
        moment: &Moment,
    ) {
        let ids: SmallVec<[RoutineId; 16]> = self.trees.keys().copied().collect();
        for id in ids {
            let Some(tree) = self.trees.get_mut(&id) else {
                continue;
            };
            let eligible = match (tree.head(), &moment.phase) {
                (None, _) => false,
                (Some(frame), None) => frame.is_ready_for_ordinary(),
                (Some(frame), Some(phase)) => frame.parked_on(phase),
            };
            if !eligible {
                continue;
            }

            let mut cx = Cx::new(
                moment,
                id,
                self.config.failure_policy,
                &mut self.ids,
                &mut self.pending,
            );
            drive(tree, &mut cx, self.config.max_frame_depth, &mut self.stats);
            if tree.is_finished() {
                debug!(routine = %id, name = tree.name(), "finished");
            }

            if !self.pending.is_empty() {
                self.apply_pending(moment);
            }
        }
    }

    /// Insert a new tree and give it its first step.
    fn admit(
        &mut self,
        mut tree: RoutineTree,
        moment: &Moment,
    ) -> Handle {
        if let Some(existing) = self.duplicate_of(&tree) {
            warn!(
                name = tree.name(),
                existing = %existing.id(),
                "routine with this name is already running, start ignored"
            );
            self.stats.duplicates += 1;
            tree.clear();
            return existing;
        }

        let id = tree.id();
        let handle = tree.handle().clone();
        self.stats.started += 1;
        debug!(routine = %id, name = tree.name(), "started");

        let tree = self.trees.entry(id).or_insert(tree);
        let mut cx = Cx::new(
            moment,
            id,
            self.config.failure_policy,
            &mut self.ids,
            &mut self.pending,
        );
        drive(tree, &mut cx, self.config.max_frame_depth, &mut self.stats);
        if tree.is_finished() {
            debug!(routine = %id, name = tree.name(), "finished during start");
        }
        handle
    }

    fn duplicate_of(
        &self,
        tree: &RoutineTree,
    ) -> Option<Handle> {
        if !tree.is_unique() {
            return None;
        }
        self.trees
            .values()
            .find(|live| !live.is_finished() && live.name() == tree.name())
            .map(|live| live.handle().clone())
    }

    /// Drop a spawn still waiting for admission, so a stop issued in the
    /// same step as its spawn still applies. The tree never runs.
    fn cancel_spawn(
        &mut self,
        handle: &Handle,
    ) {
        let spawns = &mut self.pending.spawns;
        let Some(index) = spawns.iter().position(|tree| tree.id() == handle.id()) else {
            return;
        };
        let mut tree = spawns.remove(index);
        tree.clear();
        self.stats.started += 1;
        self.stats.stopped += 1;
        debug!(routine = %handle.id(), name = tree.name(), "stopped before admission");
    }

    fn apply_pending(
        &mut self,
        moment: &Moment,
    ) {
        while !self.pending.is_empty() {
            for handle in mem::take(&mut self.pending.stops) {
                self.cancel_spawn(&handle);
                self.stop(&handle);
            }
            for tree in mem::take(&mut self.pending.spawns) {
                self.admit(tree, moment);
            }
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// Advance the head of `tree` until it parks, finishes or the chain empties.
///
/// Completions pop straight into the caller and subroutines are entered at
/// once, so purely synchronous chains resolve within a single call.
fn drive(
    tree: &mut RoutineTree,
    cx: &mut Cx<'_>,
    max_depth: usize,
    stats: &mut SchedulerStats,
) {
    loop {
        let Some(frame) = tree.head_mut() else {
            return;
        };
        frame.wait = None;

        match frame.routine.resume(cx) {
            Ok(Step::Complete) => {
                tree.pop();
                if tree.is_finished() {
                    stats.completed += 1;
                }
            }
            Ok(Step::Yield(directive)) => {
                trace!(routine = %tree.id(), directive = directive.kind(), "yield");
                match directive {
                    Directive::Continue => return,
                    Directive::Subroutine(routine) => {
                        enter(tree, routine, max_depth, stats);
                    }
                    Directive::TimedDelay { duration, scaled } => {
                        let delay = Delay::new(duration, scaled, cx.now());
                        enter(tree, Box::new(delay), max_depth, stats);
                    }
                    Directive::AwaitExternal(op) => return park(tree, Wait::External(op)),
                    Directive::AwaitHandle(handle) => return park(tree, Wait::Handle(handle)),
                    Directive::PhaseBarrier(phase) => return park(tree, Wait::Phase(phase)),
                    Directive::Unsupported(value) => {
                        tree.pop();
                        contain(tree, RoutineError::UnsupportedDirective(value), stats);
                    }
                }
            }
            Err(error) => {
                tree.pop();
                contain(tree, error, stats);
            }
        }
    }
}

fn enter(
    tree: &mut RoutineTree,
    routine: Box<dyn Routine>,
    max_depth: usize,
    stats: &mut SchedulerStats,
) {
    if tree.depth() >= max_depth {
        // The subroutine never becomes a frame; the caller resumes.
        contain(tree, RoutineError::DepthExceeded(max_depth), stats);
        return;
    }
    tree.push(routine);
    stats.frames_pushed += 1;
}

fn park(
    tree: &mut RoutineTree,
    wait: Wait,
) {
    if let Some(frame) = tree.head_mut() {
        frame.wait = Some(wait);
    }
}

/// Failure path. The failing frame has already been discarded.
fn contain(
    tree: &mut RoutineTree,
    error: RoutineError,
    stats: &mut SchedulerStats,
) {
    stats.failed += 1;
    if tree.policy() == FailurePolicy::AbortTree {
        tree.clear();
    }
    if tree.is_finished() {
        stats.aborted += 1;
    }
    debug!(routine = %tree.id(), name = tree.name(), %error, "routine failed");
    if !tree.report(error) {
        stats.discarded += 1;
        trace!(routine = %tree.id(), "no failure handler, error discarded");
    }
}

#[cfg(test)]
mod tests;
