//! Routine identity and completion handles.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Unique routine tree identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoutineId(pub u64);

impl RoutineId {
    /// Get the inner value.
    #[inline]
    pub fn inner(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RoutineId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "Routine({})", self.0)
    }
}

/// Generator for routine IDs.
#[derive(Debug)]
pub struct RoutineIdGenerator {
    next_id: u64,
}

impl RoutineIdGenerator {
    /// Create a new routine ID generator.
    #[inline]
    pub fn new() -> Self {
        Self { next_id: 1 }
    }

    /// Generate the next routine ID.
    #[inline]
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> RoutineId {
        let id = self.next_id;
        self.next_id += 1;
        RoutineId(id)
    }
}

impl Default for RoutineIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Completion token for a started routine.
///
/// The flag moves from `false` to `true` exactly once and never back. It is
/// safe to poll from any thread while the scheduler is stepping. Holding a
/// handle does not keep the routine tree alive.
#[derive(Clone)]
pub struct Handle {
    id: RoutineId,
    done: Arc<AtomicBool>,
}

impl Handle {
    pub(crate) fn new(id: RoutineId) -> Self {
        Self {
            id,
            done: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The routine tree this handle belongs to.
    #[inline]
    pub fn id(&self) -> RoutineId {
        self.id
    }

    /// Whether the routine has finished, failed out or been stopped.
    #[inline]
    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn mark_done(&self) {
        self.done.store(true, Ordering::Release);
    }
}

impl PartialEq for Handle {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.id == other.id
    }
}

impl Eq for Handle {}

impl fmt::Debug for Handle {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Handle")
            .field("id", &self.id)
            .field("done", &self.is_done())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_generator_is_monotonic() {
        let mut ids = RoutineIdGenerator::new();
        let a = ids.next();
        let b = ids.next();
        assert!(b > a);
        assert_eq!(format!("{}", a), "Routine(1)");
    }

    #[test]
    fn test_done_flag_is_shared_between_clones() {
        let handle = Handle::new(RoutineId(7));
        let observer = handle.clone();
        assert!(!observer.is_done());

        handle.mark_done();
        assert!(observer.is_done());
        assert_eq!(handle, observer);
    }
}
