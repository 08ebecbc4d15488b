//! Routine and scheduler errors

use thiserror::Error;

/// Result type returned by [`Routine::resume`](crate::runtime::Routine::resume).
pub type RoutineResult<T> = Result<T, RoutineError>;

/// Failures contained at the frame that produced them.
///
/// Each value is delivered at most once to the owning tree's failure handler.
#[derive(Debug, Error)]
pub enum RoutineError {
    /// The routine yielded a value outside the closed directive set.
    #[error("Unsupported directive: {0}")]
    UnsupportedDirective(String),

    /// Pushing another subroutine would exceed the configured frame depth.
    #[error("Frame depth limit of {0} exceeded")]
    DepthExceeded(usize),

    /// The routine's own logic failed while advancing.
    #[error(transparent)]
    Computation(#[from] anyhow::Error),
}

impl RoutineError {
    /// Build a computation error from a message.
    pub fn msg<M>(message: M) -> Self
    where
        M: std::fmt::Display + std::fmt::Debug + Send + Sync + 'static,
    {
        RoutineError::Computation(anyhow::Error::msg(message))
    }

    /// Whether this error came from classifying a yielded value.
    #[inline]
    pub fn is_unsupported(&self) -> bool {
        matches!(self, RoutineError::UnsupportedDirective(_))
    }
}

/// Errors surfaced by the scheduler's own API.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SchedulerError {
    #[error("Invalid time scale: {0} (must be finite and >= 0)")]
    InvalidTimeScale(f64),
}
