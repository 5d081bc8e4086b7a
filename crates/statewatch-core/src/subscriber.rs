#![forbid(unsafe_code)]

//! The capability contract between the registry and UI components.
//!
//! The registry never knows what a component is. It only needs to ask
//! whether it is still mounted and to request a re-render; both go through
//! [`Subscriber`]. Deferred re-renders go through [`FrameScheduler`], which
//! the UI integration layer implements on top of its own frame/tick loop.

use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::{RenderError, ScheduleError};

/// A UI component that can watch state.
pub trait Subscriber {
    /// Whether the component is currently part of the live UI tree.
    ///
    /// Controlled by the framework lifecycle, never by the registry.
    fn is_mounted(&self) -> bool;

    /// Ask the component to rebuild now.
    ///
    /// # Errors
    ///
    /// Returns an error if the framework cannot rebuild at this moment. The
    /// registry recovers per its [`RetryPolicy`](crate::RetryPolicy).
    fn request_render(&self) -> Result<(), RenderError>;
}

/// Identity of a subscriber: the address of its `Rc` allocation.
///
/// Watchers are held weakly, which keeps the allocation (and therefore the
/// address) reserved for as long as the registry can still see it.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(usize);

impl SubscriberId {
    /// Identity of a strong subscriber reference.
    #[must_use]
    pub fn of<S: Subscriber + ?Sized>(subscriber: &Rc<S>) -> Self {
        Self(Rc::as_ptr(subscriber).cast::<()>() as usize)
    }

    /// Identity of a weak subscriber reference.
    #[must_use]
    pub fn of_weak<S: Subscriber + ?Sized>(subscriber: &Weak<S>) -> Self {
        Self(Weak::as_ptr(subscriber).cast::<()>() as usize)
    }
}

impl fmt::Debug for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubscriberId({:#x})", self.0)
    }
}

/// A re-render handed to the frame scheduler.
///
/// Running the task re-checks that the watcher is still mounted before
/// rendering, so schedulers may run it any time later.
pub struct DeferredRender {
    task: Box<dyn FnOnce()>,
}

impl DeferredRender {
    pub(crate) fn new(task: impl FnOnce() + 'static) -> Self {
        Self {
            task: Box::new(task),
        }
    }

    /// Execute the deferred render.
    pub fn run(self) {
        (self.task)();
    }
}

impl fmt::Debug for DeferredRender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredRender").finish_non_exhaustive()
    }
}

/// Next-frame execution supplied by the UI integration layer.
pub trait FrameScheduler {
    /// Queue `task` to run on the next frame or tick.
    ///
    /// # Errors
    ///
    /// Returns an error if the task cannot be queued; the registry then
    /// evicts the watcher.
    fn schedule(&self, task: DeferredRender) -> Result<(), ScheduleError>;
}
