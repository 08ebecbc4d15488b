//! Host loop driver
//!
//! Calls the scheduler's phase entry points once per tick in their fixed
//! order: ordinary step, each alternate phase, sweep.

use std::thread;
use std::time::Duration;

use tracing::{debug, info};

use super::directive::PhaseId;
use super::scheduler::Scheduler;

/// Drives a [`Scheduler`] at a fixed tick interval.
pub struct HostLoop {
    scheduler: Scheduler,
    phases: Vec<PhaseId>,
    tick_interval: Duration,
    ticks: u64,
}

impl HostLoop {
    /// Create a loop stepping `phases` after every ordinary step.
    pub fn new(
        scheduler: Scheduler,
        phases: Vec<PhaseId>,
        tick_interval: Duration,
    ) -> Self {
        Self {
            scheduler,
            phases,
            tick_interval,
            ticks: 0,
        }
    }

    #[inline]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    #[inline]
    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    #[inline]
    pub fn phases(&self) -> &[PhaseId] {
        &self.phases
    }

    /// Ticks run so far.
    #[inline]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Run a single tick without sleeping.
    pub fn run_tick(&mut self) {
        self.scheduler.tick(&self.phases);
        self.ticks += 1;
    }

    /// Tick until no trees remain or `max_ticks` ticks have run.
    ///
    /// Sleeps the tick interval between ticks. Returns the number of ticks run
    /// by this call.
    pub fn run_until_idle(
        &mut self,
        max_ticks: u64,
    ) -> u64 {
        let start = self.ticks;
        while !self.scheduler.is_empty() && self.ticks - start < max_ticks {
            self.run_tick();
            if !self.tick_interval.is_zero() && !self.scheduler.is_empty() {
                thread::sleep(self.tick_interval);
            }
        }
        let ran = self.ticks - start;
        if self.scheduler.is_empty() {
            info!(ticks = ran, "all routines finished");
        } else {
            debug!(ticks = ran, live = self.scheduler.len(), "tick limit reached");
        }
        ran
    }

    /// Consume the loop and return the scheduler.
    pub fn into_scheduler(self) -> Scheduler {
        self.scheduler
    }
}
