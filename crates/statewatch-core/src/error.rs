#![forbid(unsafe_code)]

//! Error types.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Cell type mismatch | Key re-declared with another value type | `StateError::CellTypeMismatch` |
//! | Kind mismatch | Two state types share one `Kind` | `watch` errors, `read` returns `None` |
//! | Render rejected | Component cannot rebuild right now | Retried per `RetryPolicy`, then evicted |
//! | Schedule rejected | Frame scheduler closed or full | Watcher evicted |
//! | Stale watcher | Unmounted or dropped at dispatch | Evicted, never an error |
//! | Use after dispose | Mutation on a disposed container | Silent no-op |
//!
//! None of these reach the caller of a cell mutation.

use std::fmt;

use crate::kind::Kind;

/// Errors from declaring state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    /// A cell key was declared twice with different value types.
    CellTypeMismatch { kind: Kind, key: String },
    /// The registry slot for `kind` holds a different state type.
    KindMismatch { kind: Kind },
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CellTypeMismatch { kind, key } => {
                write!(f, "cell '{key}' in '{kind}' already declared with another type")
            }
            Self::KindMismatch { kind } => {
                write!(f, "kind '{kind}' is registered to a different state type")
            }
        }
    }
}

impl std::error::Error for StateError {}

/// Failure reported by a subscriber asked to re-render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// The framework refused the rebuild (e.g. mid-frame).
    Rejected(String),
    /// The component is being torn down.
    Unmounted,
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected(reason) => write!(f, "render rejected: {reason}"),
            Self::Unmounted => write!(f, "subscriber unmounted"),
        }
    }
}

impl std::error::Error for RenderError {}

/// Failure reported by a [`FrameScheduler`](crate::FrameScheduler).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// The scheduler no longer accepts work.
    Closed,
    /// The scheduler refused this task.
    Rejected(String),
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "scheduler closed"),
            Self::Rejected(reason) => write!(f, "schedule rejected: {reason}"),
        }
    }
}

impl std::error::Error for ScheduleError {}
