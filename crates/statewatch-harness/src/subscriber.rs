#![forbid(unsafe_code)]

//! Scripted subscribers.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use statewatch_core::{RenderError, Subscriber};

/// Ordered record of renders across several subscribers.
#[derive(Debug, Clone, Default)]
pub struct RenderLog {
    entries: Rc<RefCell<Vec<&'static str>>>,
}

impl RenderLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of subscribers that rendered, in order.
    #[must_use]
    pub fn entries(&self) -> Vec<&'static str> {
        self.entries.borrow().clone()
    }

    /// Forget all entries.
    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    fn push(&self, name: &'static str) {
        self.entries.borrow_mut().push(name);
    }
}

type RenderHook = Box<dyn Fn(&TestSubscriber)>;

/// A UI component stand-in.
///
/// Starts mounted. Each successful `request_render` bumps the render count,
/// appends to the optional [`RenderLog`], and then runs the optional
/// on-render hook (which may call back into the registry).
pub struct TestSubscriber {
    name: &'static str,
    mounted: Cell<bool>,
    renders: Cell<u32>,
    attempts: Cell<u32>,
    failures_left: Cell<u32>,
    log: Option<RenderLog>,
    on_render: RefCell<Option<RenderHook>>,
}

impl std::fmt::Debug for TestSubscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestSubscriber")
            .field("name", &self.name)
            .field("mounted", &self.mounted.get())
            .field("renders", &self.renders.get())
            .field("failures_left", &self.failures_left.get())
            .finish()
    }
}

impl TestSubscriber {
    /// A mounted subscriber.
    #[must_use]
    pub fn new(name: &'static str) -> Rc<Self> {
        Rc::new(Self::build(name, None))
    }

    /// A mounted subscriber that records its renders in `log`.
    #[must_use]
    pub fn logged(name: &'static str, log: &RenderLog) -> Rc<Self> {
        Rc::new(Self::build(name, Some(log.clone())))
    }

    fn build(name: &'static str, log: Option<RenderLog>) -> Self {
        Self {
            name,
            mounted: Cell::new(true),
            renders: Cell::new(0),
            attempts: Cell::new(0),
            failures_left: Cell::new(0),
            log,
            on_render: RefCell::new(None),
        }
    }

    /// Name given at construction.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Successful renders so far.
    #[must_use]
    pub fn renders(&self) -> u32 {
        self.renders.get()
    }

    /// Render requests received so far, successful or not.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts.get()
    }

    /// Flip the mounted flag, as the framework lifecycle would.
    pub fn set_mounted(&self, mounted: bool) {
        self.mounted.set(mounted);
    }

    /// Reject the next `n` render requests.
    pub fn fail_next(&self, n: u32) {
        self.failures_left.set(n);
    }

    /// Run `hook` after every successful render.
    pub fn on_render(&self, hook: impl Fn(&TestSubscriber) + 'static) {
        *self.on_render.borrow_mut() = Some(Box::new(hook));
    }
}

impl Subscriber for TestSubscriber {
    fn is_mounted(&self) -> bool {
        self.mounted.get()
    }

    fn request_render(&self) -> Result<(), RenderError> {
        self.attempts.set(self.attempts.get() + 1);
        if !self.mounted.get() {
            return Err(RenderError::Unmounted);
        }
        let failures = self.failures_left.get();
        if failures > 0 {
            self.failures_left.set(failures - 1);
            return Err(RenderError::Rejected(format!("{} is mid-frame", self.name)));
        }
        self.renders.set(self.renders.get() + 1);
        if let Some(log) = &self.log {
            log.push(self.name);
        }
        if let Some(hook) = self.on_render.borrow().as_ref() {
            hook(self);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failures_are_consumed_in_order() {
        let sub = TestSubscriber::new("a");
        sub.fail_next(2);
        assert!(sub.request_render().is_err());
        assert!(sub.request_render().is_err());
        assert!(sub.request_render().is_ok());
        assert_eq!(sub.renders(), 1);
        assert_eq!(sub.attempts(), 3);
    }

    #[test]
    fn unmounted_rejects_render() {
        let sub = TestSubscriber::new("a");
        sub.set_mounted(false);
        assert_eq!(sub.request_render(), Err(RenderError::Unmounted));
        assert_eq!(sub.renders(), 0);
    }

    #[test]
    fn log_records_names() {
        let log = RenderLog::new();
        let a = TestSubscriber::logged("a", &log);
        let b = TestSubscriber::logged("b", &log);
        b.request_render().unwrap();
        a.request_render().unwrap();
        assert_eq!(log.entries(), vec!["b", "a"]);
        log.clear();
        assert!(log.entries().is_empty());
    }
}
