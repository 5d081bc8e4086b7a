#![forbid(unsafe_code)]

//! Observable value cell owned by a [`StateContainer`](super::StateContainer).
//!
//! # Design
//!
//! [`ReactiveCell<T>`] wraps a value of type `T` in shared,
//! reference-counted storage. When the value changes (determined by
//! `PartialEq`), the owning container is told to announce the change.
//!
//! # Performance
//!
//! | Operation      | Complexity |
//! |----------------|------------|
//! | `get()`        | O(1) + clone of `T` |
//! | `set()`        | O(1) + one container notification |
//! | `set_silent()` | O(1) |
//!
//! # Failure Modes
//!
//! - **Detached cell**: once the owning container is disposed, `set`,
//!   `set_silent` and `update` are ignored. `get` keeps returning the last
//!   stored value.
//! - **Re-entrant write from `update`'s closure**: panics (RefCell borrow
//!   rules). Writes from listeners or render callbacks are fine; the value
//!   borrow is released before the container is notified.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use super::container::{CellSlot, ContainerCore};

/// Shared interior for [`ReactiveCell<T>`].
pub(crate) struct CellInner<T> {
    key: String,
    value: RefCell<T>,
    version: Cell<u64>,
    /// Cleared when the owning container is disposed.
    owner: RefCell<Option<Weak<ContainerCore>>>,
}

impl<T> CellInner<T> {
    pub(crate) fn new(key: String, value: T, owner: Option<Weak<ContainerCore>>) -> Self {
        Self {
            key,
            value: RefCell::new(value),
            version: Cell::new(0),
            owner: RefCell::new(owner),
        }
    }

    fn owner(&self) -> Option<Rc<ContainerCore>> {
        self.owner
            .borrow()
            .as_ref()
            .and_then(Weak::upgrade)
            .filter(|core| !core.is_disposed())
    }
}

impl<T> CellSlot for CellInner<T> {
    fn detach(&self) {
        self.owner.borrow_mut().take();
    }
}

/// A single observable value inside a state container.
///
/// Cloning a `ReactiveCell` creates a new handle to the **same** value.
///
/// # Invariants
///
/// 1. `version` increments by exactly 1 on each stored change, silent or not.
/// 2. `set(v)` where `v == current` is a no-op.
/// 3. `set_silent(v)` stores `v` without comparison and never notifies.
pub struct ReactiveCell<T> {
    inner: Rc<CellInner<T>>,
}

impl<T> Clone for ReactiveCell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ReactiveCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveCell")
            .field("key", &self.inner.key)
            .field("value", &*self.inner.value.borrow())
            .field("version", &self.inner.version.get())
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> ReactiveCell<T> {
    pub(crate) fn from_inner(inner: Rc<CellInner<T>>) -> Self {
        Self { inner }
    }

    /// Get a clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Access the current value by reference without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Store `value` and notify the container, unless it equals the
    /// current value.
    pub fn set(&self, value: T) {
        let Some(owner) = self.inner.owner() else {
            return;
        };
        {
            let mut current = self.inner.value.borrow_mut();
            if *current == value {
                return;
            }
            *current = value;
        }
        self.bump();
        owner.notify_change();
    }

    /// Store `value` without comparing or notifying.
    ///
    /// Meant for initialization and reset paths that must not trigger a
    /// render cycle.
    pub fn set_silent(&self, value: T) {
        if self.inner.owner().is_none() {
            return;
        }
        *self.inner.value.borrow_mut() = value;
        self.bump();
    }

    /// Modify the value in place. Notifies only if the result differs from
    /// the value before the call.
    ///
    /// # Panics
    ///
    /// Panics if `f` touches this same cell.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let Some(owner) = self.inner.owner() else {
            return;
        };
        let changed = {
            let mut current = self.inner.value.borrow_mut();
            let old = current.clone();
            f(&mut current);
            *current != old
        };
        if changed {
            self.bump();
            owner.notify_change();
        }
    }

    /// Number of stored changes since creation.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    /// The key this cell was declared under.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.inner.key
    }

    /// Whether the cell still belongs to a live container.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.inner.owner().is_some()
    }

    fn bump(&self) {
        self.inner.version.set(self.inner.version.get() + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::super::StateContainer;
    use crate::kind::Kind;
    use std::cell::Cell;
    use std::rc::Rc;

    const KIND: Kind = Kind::new("cell-tests");

    fn counted() -> (StateContainer, Rc<Cell<u32>>) {
        let container = StateContainer::new(KIND);
        let count = Rc::new(Cell::new(0u32));
        let count_clone = Rc::clone(&count);
        container.wire(move || count_clone.set(count_clone.get() + 1));
        (container, count)
    }

    #[test]
    fn get_set_basic() {
        let (container, count) = counted();
        let cell = container.cell("n", 42).unwrap();
        assert_eq!(cell.get(), 42);
        assert_eq!(cell.version(), 0);

        cell.set(99);
        assert_eq!(cell.get(), 99);
        assert_eq!(cell.version(), 1);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn equal_value_is_noop() {
        let (container, count) = counted();
        let cell = container.cell("n", 42).unwrap();
        cell.set(42);
        assert_eq!(cell.version(), 0);
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn silent_set_stores_without_notifying() {
        let (container, count) = counted();
        let cell = container.cell("n", 0).unwrap();
        cell.set_silent(7);
        assert_eq!(cell.get(), 7);
        assert_eq!(cell.version(), 1);
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn silent_set_skips_comparison() {
        let (container, count) = counted();
        let cell = container.cell("n", 5).unwrap();
        cell.set_silent(5);
        assert_eq!(cell.version(), 1);
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn with_access() {
        let (container, _) = counted();
        let cell = container.cell("v", vec![1, 2, 3]).unwrap();
        let sum = cell.with(|v| v.iter().sum::<i32>());
        assert_eq!(sum, 6);
    }

    #[test]
    fn update_mutates_in_place() {
        let (container, count) = counted();
        let cell = container.cell("v", vec![1, 2, 3]).unwrap();
        cell.update(|v| v.push(4));
        assert_eq!(cell.get(), vec![1, 2, 3, 4]);
        assert_eq!(cell.version(), 1);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn update_no_change_no_notify() {
        let (container, count) = counted();
        let cell = container.cell("n", 10).unwrap();
        cell.update(|v| *v = 10);
        assert_eq!(cell.version(), 0);
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn clone_shares_value() {
        let (container, _) = counted();
        let a = container.cell("n", 0).unwrap();
        let b = a.clone();
        a.set(3);
        assert_eq!(b.get(), 3);
        assert_eq!(b.version(), 1);
    }

    #[test]
    fn writes_after_dispose_are_ignored() {
        let (container, count) = counted();
        let cell = container.cell("n", 1).unwrap();
        container.dispose();

        assert!(!cell.is_attached());
        cell.set(2);
        cell.set_silent(3);
        cell.update(|v| *v = 4);
        assert_eq!(cell.get(), 1);
        assert_eq!(cell.version(), 0);
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn writes_after_container_drop_are_ignored() {
        let container = StateContainer::new(KIND);
        let cell = container.cell("n", 1).unwrap();
        drop(container);
        cell.set(2);
        assert_eq!(cell.get(), 1);
        assert!(!cell.is_attached());
    }

    #[test]
    fn listener_may_read_cell() {
        let container = StateContainer::new(KIND);
        let cell = container.cell("n", 0).unwrap();
        let seen = Rc::new(Cell::new(0));
        let seen_clone = Rc::clone(&seen);
        let reader = cell.clone();
        container.wire(move || seen_clone.set(reader.get()));

        cell.set(8);
        assert_eq!(seen.get(), 8);
    }

    #[test]
    fn debug_format() {
        let (container, _) = counted();
        let cell = container.cell("answer", 42).unwrap();
        let dbg = format!("{cell:?}");
        assert!(dbg.contains("ReactiveCell"));
        assert!(dbg.contains("answer"));
        assert!(dbg.contains("42"));
    }

    #[test]
    fn many_sets_version_monotonic() {
        let (container, count) = counted();
        let cell = container.cell("n", 0).unwrap();
        for i in 1..=100 {
            cell.set(i);
        }
        assert_eq!(cell.version(), 100);
        assert_eq!(count.get(), 100);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn notifications_equal_value_changes(values in proptest::collection::vec(0u8..4, 0..64)) {
                let (container, count) = counted();
                let cell = container.cell("n", 0u8).unwrap();

                let mut expected = 0u32;
                let mut current = 0u8;
                for v in values {
                    if v != current {
                        expected += 1;
                        current = v;
                    }
                    cell.set(v);
                }

                prop_assert_eq!(count.get(), expected);
                prop_assert_eq!(cell.version(), u64::from(expected));
                prop_assert_eq!(cell.get(), current);
            }
        }
    }
}
