//! Tickflow
//!
//! A cooperative routine scheduler. Routines are suspendable computations
//! that yield [`Directive`](runtime::Directive)s; the [`Scheduler`] keeps
//! each routine's nested call chain as an explicit frame stack and advances
//! it when a host loop calls the phase entry points.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use tickflow::runtime::{PhaseId, Scheduler, Sequence};
//!
//! let mut scheduler = Scheduler::new();
//! let handle = scheduler.start(
//!     Sequence::named("blink")
//!         .yield_now()
//!         .barrier(PhaseId::END_OF_FRAME)
//!         .wait(Duration::ZERO),
//!     None,
//! );
//!
//! scheduler.tick(&[PhaseId::END_OF_FRAME]);
//! assert!(handle.is_done());
//! ```
//!
//! The engine is single-threaded. Only [`Handle::is_done`](runtime::Handle::is_done)
//! may be read from elsewhere while stepping is in progress.

#![doc(html_root_url = "https://docs.rs/tickflow")]
#![warn(rust_2018_idioms)]

pub mod runtime;
pub mod util;

// Re-exports
pub use anyhow::{Context, Result};
pub use runtime::{Directive, Handle, Routine, Scheduler, Step};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = "Tickflow";
