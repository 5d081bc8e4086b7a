#![forbid(unsafe_code)]

//! Core: watchable state singletons for declarative UI components.
//!
//! # Role in statewatch
//! `statewatch-core` owns the shared-state side of a UI: typed state objects
//! that live in a [`StateRegistry`] (one instance per [`Kind`]), the
//! [`ReactiveCell`]s inside them, and the notification engine that asks
//! watching components to re-render when a state object changes.
//!
//! # Primary responsibilities
//! - **ReactiveCell**: a single value with change-on-write-if-different
//!   semantics and a silent-set escape hatch.
//! - **StateContainer**: owns named cells, coalesces mutations inside a
//!   batch, and fires one change event to a single wired listener.
//! - **StateRegistry**: maps each kind to its one live state object, tracks
//!   watchers in insertion order, and dispatches render requests.
//! - **SubscriptionHandle**: per-component facade bound to one subscriber.
//!
//! # How it fits in the system
//! The UI integration layer implements [`Subscriber`] for its component type
//! and, optionally, [`FrameScheduler`] for next-frame re-render retries. The
//! registry is constructed once at startup and handed to every adapter; it is
//! never reached through a global.
//!
//! # Threading
//! Everything here is single-threaded (`Rc`/`RefCell`) and expected to run on
//! the UI thread. Dispatch is synchronous and tolerates watchers mutating the
//! watcher set from inside their own render.

pub mod config;
pub mod error;
pub mod handle;
pub mod kind;
#[cfg(feature = "tracing-json")]
pub mod logging;
pub mod reactive;
pub mod registry;
pub mod subscriber;

pub use config::{ConfigError, ConfigParse, RegistryConfig, RetryPolicy};
pub use error::{RenderError, ScheduleError, StateError};
pub use handle::SubscriptionHandle;
pub use kind::{Kind, State};
pub use reactive::{ReactiveCell, StateContainer};
pub use registry::{RegistryStats, StateRegistry};
pub use subscriber::{DeferredRender, FrameScheduler, Subscriber, SubscriberId};
