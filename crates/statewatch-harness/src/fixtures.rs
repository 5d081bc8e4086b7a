#![forbid(unsafe_code)]

//! Reference state types.

use statewatch_core::{Kind, ReactiveCell, State, StateContainer, StateError};

/// One integer cell, `count`, starting at 0.
#[derive(Debug)]
pub struct CounterState {
    container: StateContainer,
    count: ReactiveCell<i64>,
}

impl CounterState {
    /// Fresh counter at 0.
    ///
    /// # Errors
    ///
    /// Never fails on a fresh container; the signature follows
    /// [`StateContainer::cell`].
    pub fn try_new() -> Result<Self, StateError> {
        let container = StateContainer::new(Self::KIND);
        let count = container.cell("count", 0)?;
        Ok(Self { container, count })
    }

    /// Fresh counter at 0, for use as a registry factory.
    ///
    /// # Panics
    ///
    /// Panics if declaring the `count` cell fails, which cannot happen on a
    /// fresh container.
    #[must_use]
    pub fn new() -> Self {
        Self::try_new().expect("fresh container accepts cells")
    }

    /// The `count` cell.
    #[must_use]
    pub fn count(&self) -> &ReactiveCell<i64> {
        &self.count
    }
}

impl Default for CounterState {
    fn default() -> Self {
        Self::new()
    }
}

impl State for CounterState {
    const KIND: Kind = Kind::new("counter");

    fn container(&self) -> &StateContainer {
        &self.container
    }
}

/// Two integer cells, `a` and `b`, both starting at 0.
#[derive(Debug)]
pub struct PairState {
    container: StateContainer,
    a: ReactiveCell<i64>,
    b: ReactiveCell<i64>,
}

impl PairState {
    /// Fresh pair at (0, 0).
    ///
    /// # Panics
    ///
    /// Panics if declaring a cell fails, which cannot happen on a fresh
    /// container.
    #[must_use]
    pub fn new() -> Self {
        let container = StateContainer::new(Self::KIND);
        let a = container.cell("a", 0).expect("fresh container accepts cells");
        let b = container.cell("b", 0).expect("fresh container accepts cells");
        Self { container, a, b }
    }

    /// The `a` cell.
    #[must_use]
    pub fn a(&self) -> &ReactiveCell<i64> {
        &self.a
    }

    /// The `b` cell.
    #[must_use]
    pub fn b(&self) -> &ReactiveCell<i64> {
        &self.b
    }

    /// Set both cells with a single change event.
    pub fn set_both(&self, a: i64, b: i64) {
        self.container.batch(|| {
            self.a.set(a);
            self.b.set(b);
        });
    }
}

impl Default for PairState {
    fn default() -> Self {
        Self::new()
    }
}

impl State for PairState {
    const KIND: Kind = Kind::new("pair");

    fn container(&self) -> &StateContainer {
        &self.container
    }
}
