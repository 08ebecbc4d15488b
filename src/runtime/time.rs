//! Clocks, time scale and the timed-delay routine.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};

use super::directive::{Directive, Routine, Step};
use super::errors::{RoutineResult, SchedulerError};
use super::scheduler::Cx;

/// Source of "now" for the scheduler.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Monotonic wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock advanced by hand, for offline stepping and tests.
///
/// Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Move time forward.
    pub fn advance(
        &self,
        by: Duration,
    ) {
        *self.now.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}

/// Shared time-scale factor applied to scaled delays.
///
/// Clones observe the same value, so a host can keep one and adjust it while
/// the scheduler runs.
#[derive(Clone)]
pub struct TimeScale {
    factor: Arc<RwLock<f64>>,
}

impl TimeScale {
    /// Create a time scale with the given factor.
    pub fn new(factor: f64) -> Result<Self, SchedulerError> {
        validate(factor)?;
        Ok(Self {
            factor: Arc::new(RwLock::new(factor)),
        })
    }

    /// Current factor.
    #[inline]
    pub fn get(&self) -> f64 {
        *self.factor.read()
    }

    /// Change the factor. `0.0` freezes scaled delays.
    pub fn set(
        &self,
        factor: f64,
    ) -> Result<(), SchedulerError> {
        validate(factor)?;
        *self.factor.write() = factor;
        Ok(())
    }
}

impl Default for TimeScale {
    fn default() -> Self {
        Self {
            factor: Arc::new(RwLock::new(1.0)),
        }
    }
}

impl fmt::Debug for TimeScale {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "TimeScale({})", self.get())
    }
}

fn validate(factor: f64) -> Result<(), SchedulerError> {
    if factor.is_finite() && factor >= 0.0 {
        Ok(())
    } else {
        Err(SchedulerError::InvalidTimeScale(factor))
    }
}

/// `elapsed * factor`, saturating at `Duration::MAX` for huge factors.
fn scale_elapsed(
    elapsed: Duration,
    factor: f64,
) -> Duration {
    Duration::try_from_secs_f64(elapsed.as_secs_f64() * factor).unwrap_or(Duration::MAX)
}

/// A pending timed delay, run as its own frame.
///
/// Every ordinary tick it subtracts the time elapsed since its previous tick,
/// multiplied by the time scale when `scaled`, and completes once nothing
/// remains.
#[derive(Debug)]
pub struct Delay {
    remaining: Duration,
    scaled: bool,
    last: Instant,
}

impl Delay {
    pub fn new(
        duration: Duration,
        scaled: bool,
        started: Instant,
    ) -> Self {
        Self {
            remaining: duration,
            scaled,
            last: started,
        }
    }

    #[inline]
    pub fn remaining(&self) -> Duration {
        self.remaining
    }
}

impl Routine for Delay {
    fn resume(
        &mut self,
        cx: &mut Cx<'_>,
    ) -> RoutineResult<Step> {
        let now = cx.now();
        let elapsed = now.saturating_duration_since(self.last);
        self.last = now;

        let elapsed = if self.scaled {
            scale_elapsed(elapsed, cx.time_scale())
        } else {
            elapsed
        };
        self.remaining = self.remaining.saturating_sub(elapsed);

        if self.remaining.is_zero() {
            Ok(Step::Complete)
        } else {
            Ok(Step::Yield(Directive::Continue))
        }
    }

    fn name(&self) -> &str {
        "delay"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_scale_rejects_invalid_factors() {
        assert!(TimeScale::new(-1.0).is_err());
        assert!(TimeScale::new(f64::NAN).is_err());
        assert!(TimeScale::new(f64::INFINITY).is_err());

        let scale = TimeScale::new(0.0).unwrap();
        assert_eq!(scale.set(-0.5), Err(SchedulerError::InvalidTimeScale(-0.5)));
        assert_eq!(scale.get(), 0.0);
    }

    #[test]
    fn test_time_scale_clones_share_factor() {
        let scale = TimeScale::default();
        let host = scale.clone();
        host.set(2.0).unwrap();
        assert_eq!(scale.get(), 2.0);
    }

    #[test]
    fn test_scaled_elapsed_saturates() {
        let elapsed = Duration::from_millis(10);
        assert_eq!(scale_elapsed(elapsed, 2.0), Duration::from_millis(20));
        assert_eq!(scale_elapsed(elapsed, 1e300), Duration::MAX);
        assert_eq!(scale_elapsed(elapsed, 0.0), Duration::ZERO);
    }

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::new();
        let start = clock.now();
        clock.clone().advance(Duration::from_millis(250));
        assert_eq!(clock.now() - start, Duration::from_millis(250));
    }
}
