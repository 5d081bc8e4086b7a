#![forbid(unsafe_code)]

//! Reactive state primitives.
//!
//! - [`ReactiveCell`]: a single value with change detection and a silent-set
//!   escape hatch.
//! - [`StateContainer`]: owns a set of named cells and fires one aggregated
//!   change event per external mutation or batch.
//!
//! # Architecture
//!
//! Both types are cheap `Rc` handles over single-threaded shared storage.
//! A cell holds a `Weak` back-reference to its container; the container holds
//! the strong side of every cell it declared so that `dispose()` can detach
//! them all at once.
//!
//! # Invariants
//!
//! 1. Setting a cell to a value equal to its current value is a no-op (no
//!    version bump, no notification).
//! 2. `set_silent` never notifies.
//! 3. A container has at most one listener.
//! 4. A disposed container never notifies again, and its cells ignore writes.
//! 5. Inside `batch`, cell writes are stored but not announced; the
//!    outermost batch announces once on exit unless the container was
//!    disposed.

pub mod cell;
pub mod container;

pub use cell::ReactiveCell;
pub use container::StateContainer;
