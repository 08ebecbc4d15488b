//! Routine trees
//!
//! A tree is one independently scheduled root routine: the head of its frame
//! chain, a completion handle and an optional failure handler.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::runtime::directive::Routine;
use crate::runtime::errors::RoutineError;
use crate::runtime::frame::Frame;
use crate::runtime::handle::{Handle, RoutineId};

/// Callback receiving each failure contained in a tree.
pub type FailureHandler = Box<dyn FnMut(RoutineError)>;

/// What happens to the rest of the chain after a frame fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Discard only the failing frame; the caller resumes as if it completed.
    #[default]
    ContainAtOrigin,
    /// Discard the whole chain and finish the tree.
    AbortTree,
}

/// Options for starting a routine tree.
#[derive(Default)]
pub struct RoutineOptions {
    pub(crate) name: Option<String>,
    pub(crate) on_failure: Option<FailureHandler>,
    pub(crate) policy: Option<FailurePolicy>,
    pub(crate) unique: bool,
}

impl RoutineOptions {
    /// Create default options.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the tree name.
    #[inline]
    pub fn name(
        mut self,
        name: impl Into<String>,
    ) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the failure handler.
    pub fn on_failure<F>(
        mut self,
        handler: F,
    ) -> Self
    where
        F: FnMut(RoutineError) + 'static,
    {
        self.on_failure = Some(Box::new(handler));
        self
    }

    /// Override the scheduler's failure policy for this tree.
    #[inline]
    pub fn policy(
        mut self,
        policy: FailurePolicy,
    ) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Refuse to start while another live tree has the same name.
    #[inline]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub(crate) fn with_handler(handler: Option<FailureHandler>) -> Self {
        Self {
            on_failure: handler,
            ..Self::default()
        }
    }
}

impl fmt::Debug for RoutineOptions {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("RoutineOptions")
            .field("name", &self.name)
            .field("has_handler", &self.on_failure.is_some())
            .field("policy", &self.policy)
            .field("unique", &self.unique)
            .finish()
    }
}

/// One root routine and its frame chain.
///
/// `head` is `None` exactly when the handle is done.
pub struct RoutineTree {
    id: RoutineId,
    name: String,
    head: Option<Box<Frame>>,
    depth: usize,
    on_failure: Option<FailureHandler>,
    policy: FailurePolicy,
    unique: bool,
    handle: Handle,
}

impl RoutineTree {
    /// Create a tree with a single root frame.
    pub fn new(
        id: RoutineId,
        routine: Box<dyn Routine>,
        options: RoutineOptions,
        default_policy: FailurePolicy,
    ) -> Self {
        let name = options
            .name
            .unwrap_or_else(|| routine.name().to_string());
        Self {
            id,
            name,
            head: Some(Box::new(Frame::new(routine))),
            depth: 1,
            on_failure: options.on_failure,
            policy: options.policy.unwrap_or(default_policy),
            unique: options.unique,
            handle: Handle::new(id),
        }
    }

    #[inline]
    pub fn id(&self) -> RoutineId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    #[inline]
    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Whether the tree was started as the only live tree with its name.
    #[inline]
    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// Number of frames in the chain.
    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.head.is_none()
    }

    #[inline]
    pub fn head(&self) -> Option<&Frame> {
        self.head.as_deref()
    }

    #[inline]
    pub fn head_mut(&mut self) -> Option<&mut Frame> {
        self.head.as_deref_mut()
    }

    /// Push a subroutine frame on top of the current head.
    pub fn push(
        &mut self,
        routine: Box<dyn Routine>,
    ) {
        let frame = match self.head.take() {
            Some(caller) => Frame::with_caller(routine, caller),
            None => Frame::new(routine),
        };
        self.head = Some(Box::new(frame));
        self.depth += 1;
        trace!(routine = %self.id, depth = self.depth, "push frame");
    }

    /// Pop the head frame, dropping it. Finishes the tree when the chain empties.
    pub fn pop(&mut self) {
        if let Some(mut frame) = self.head.take() {
            self.head = frame.take_caller();
            self.depth -= 1;
            trace!(routine = %self.id, depth = self.depth, "pop frame");
        }
        if self.head.is_none() {
            self.finish();
        }
    }

    /// Drop every frame without advancing any of them and finish the tree.
    pub fn clear(&mut self) {
        let mut next = self.head.take();
        while let Some(mut frame) = next {
            next = frame.take_caller();
        }
        self.depth = 0;
        self.finish();
    }

    /// Deliver a contained failure to the handler, if one is registered.
    ///
    /// Returns `false` when the error was discarded.
    pub fn report(
        &mut self,
        error: RoutineError,
    ) -> bool {
        match self.on_failure.as_mut() {
            Some(handler) => {
                handler(error);
                true
            }
            None => false,
        }
    }

    fn finish(&mut self) {
        debug_assert!(self.head.is_none());
        self.handle.mark_done();
    }
}

impl fmt::Debug for RoutineTree {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("RoutineTree")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("depth", &self.depth)
            .field("policy", &self.policy)
            .field("done", &self.handle.is_done())
            .finish()
    }
}
