#![forbid(unsafe_code)]

//! Test harness for statewatch.
//!
//! - [`TestSubscriber`]: a scripted UI component with a mounted flag, a render
//!   counter, and injectable render failures.
//! - [`RenderLog`]: shared, ordered record of which subscriber rendered when.
//! - [`ManualScheduler`]: a frame scheduler that queues deferred renders
//!   until the test advances a frame.
//! - [`fixtures`]: small state types used across the integration tests.

pub mod fixtures;
pub mod scheduler;
pub mod subscriber;

pub use fixtures::{CounterState, PairState};
pub use scheduler::ManualScheduler;
pub use subscriber::{RenderLog, TestSubscriber};
