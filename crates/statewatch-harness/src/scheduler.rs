#![forbid(unsafe_code)]

//! A frame scheduler driven by the test.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use statewatch_core::{DeferredRender, FrameScheduler, ScheduleError};

/// Queues deferred renders until [`run_pending`](Self::run_pending).
#[derive(Debug, Default)]
pub struct ManualScheduler {
    queue: RefCell<VecDeque<DeferredRender>>,
    closed: Cell<bool>,
}

impl ManualScheduler {
    /// Create an open scheduler with an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued tasks.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Run the tasks queued before this call (one "frame").
    ///
    /// Tasks scheduled while running wait for the next call. Returns the
    /// number of tasks run.
    pub fn run_pending(&self) -> usize {
        let tasks: Vec<DeferredRender> = self.queue.borrow_mut().drain(..).collect();
        let ran = tasks.len();
        for task in tasks {
            task.run();
        }
        ran
    }

    /// Refuse all future tasks.
    pub fn close(&self) {
        self.closed.set(true);
    }
}

impl FrameScheduler for ManualScheduler {
    fn schedule(&self, task: DeferredRender) -> Result<(), ScheduleError> {
        if self.closed.get() {
            return Err(ScheduleError::Closed);
        }
        self.queue.borrow_mut().push_back(task);
        Ok(())
    }
}
