#![forbid(unsafe_code)]

//! State kinds: the registry key for each state singleton.

use std::fmt;

use crate::reactive::StateContainer;

/// Stable identifier naming one state slot in the registry.
///
/// Kinds are plain string tags assigned by the author of the state type, so
/// they survive refactors and are readable in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Kind(&'static str);

impl Kind {
    /// Create a kind from a static tag.
    #[must_use]
    pub const fn new(tag: &'static str) -> Self {
        Self(tag)
    }

    /// The tag this kind was declared with.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// A shared state object that can live in a [`StateRegistry`](crate::StateRegistry).
///
/// Implementors own a [`StateContainer`] and expose their cells through
/// ordinary accessor methods:
///
/// ```
/// use statewatch_core::{Kind, ReactiveCell, State, StateContainer};
///
/// struct Counter {
///     container: StateContainer,
///     count: ReactiveCell<i32>,
/// }
///
/// impl Counter {
///     fn new() -> Self {
///         let container = StateContainer::new(Self::KIND);
///         let count = container.cell("count", 0).expect("fresh container");
///         Self { container, count }
///     }
/// }
///
/// impl State for Counter {
///     const KIND: Kind = Kind::new("counter");
///
///     fn container(&self) -> &StateContainer {
///         &self.container
///     }
/// }
///
/// let counter = Counter::new();
/// counter.count.set(3);
/// assert_eq!(counter.count.get(), 3);
/// ```
pub trait State: 'static {
    /// Registry slot for this state type.
    const KIND: Kind;

    /// The container carrying this state's cells and change event.
    fn container(&self) -> &StateContainer;
}
