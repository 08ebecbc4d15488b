//! Runtime system
//!
//! This module contains the cooperative routine scheduler: directives,
//! frames, handles, time sources and the host loop driver.

pub mod directive;
pub mod errors;
pub mod frame;
pub mod handle;
pub mod host;
pub mod routine;
pub mod scheduler;
pub mod time;

pub use directive::{Directive, PhaseId, Poll, Pollable, Routine, Step};
pub use errors::{RoutineError, RoutineResult, SchedulerError};
pub use handle::{Handle, RoutineId};
pub use host::HostLoop;
pub use routine::{from_fn, FnRoutine, Sequence};
pub use scheduler::{
    Cx, FailureHandler, FailurePolicy, RoutineOptions, Scheduler, SchedulerConfig,
    SchedulerStats,
};
pub use time::{Clock, Delay, ManualClock, SystemClock, TimeScale};
