#![forbid(unsafe_code)]

//! Base behavior shared by every state object.
//!
//! # Design
//!
//! A [`StateContainer`] owns an ordered collection of named
//! [`ReactiveCell`]s and a single change event. Any non-silent cell write
//! fires that event; [`batch`](StateContainer::batch) coalesces many writes
//! into one event.
//!
//! Disposal and batching are tracked separately: `disposed` is terminal,
//! while suppression is a depth counter that only lives for the duration of
//! a batch. Disposing from inside a batch is therefore final, and the batch
//! exit will not announce anything.
//!
//! # Failure Modes
//!
//! - **Panicking batch closure**: the suppression depth is restored during
//!   unwinding; no notification is fired for the aborted batch.
//! - **Listener writing to its own container**: allowed. The nested write
//!   notifies the listener again synchronously; a listener that always
//!   writes a new value will recurse without bound.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::{debug, trace};

use super::cell::{CellInner, ReactiveCell};
use crate::error::StateError;
use crate::kind::Kind;

/// Type-erased view of a cell, used to detach it on dispose.
pub(crate) trait CellSlot {
    fn detach(&self);
}

struct CellEntry {
    slot: Rc<dyn CellSlot>,
    any: Rc<dyn Any>,
}

type Listener = Rc<dyn Fn()>;

/// Shared interior for [`StateContainer`].
pub(crate) struct ContainerCore {
    kind: Kind,
    disposed: Cell<bool>,
    batch_depth: Cell<u32>,
    listener: RefCell<Option<Listener>>,
    cells: RefCell<IndexMap<String, CellEntry>>,
}

impl ContainerCore {
    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    pub(crate) fn notify_change(&self) {
        if self.disposed.get() {
            trace!(kind = %self.kind, "notify skipped: disposed");
            return;
        }
        if self.batch_depth.get() > 0 {
            trace!(kind = %self.kind, "notify deferred: inside batch");
            return;
        }
        // Clone out so the listener may touch this container.
        let listener = self.listener.borrow().clone();
        if let Some(listener) = listener {
            listener();
        }
    }
}

/// Restores the batch depth on scope exit, including unwinding.
struct BatchGuard<'a> {
    core: &'a ContainerCore,
}

impl<'a> BatchGuard<'a> {
    fn enter(core: &'a ContainerCore) -> Self {
        core.batch_depth.set(core.batch_depth.get() + 1);
        Self { core }
    }
}

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        self.core
            .batch_depth
            .set(self.core.batch_depth.get().saturating_sub(1));
    }
}

/// Named cells plus one change event.
///
/// Cloning a `StateContainer` creates a new handle to the **same** container.
#[derive(Clone)]
pub struct StateContainer {
    core: Rc<ContainerCore>,
}

impl fmt::Debug for StateContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateContainer")
            .field("kind", &self.core.kind)
            .field("cells", &self.cell_keys())
            .field("disposed", &self.core.disposed.get())
            .field("batch_depth", &self.core.batch_depth.get())
            .field("wired", &self.has_listener())
            .finish()
    }
}

impl StateContainer {
    /// Create an empty, live container for `kind`.
    #[must_use]
    pub fn new(kind: Kind) -> Self {
        Self {
            core: Rc::new(ContainerCore {
                kind,
                disposed: Cell::new(false),
                batch_depth: Cell::new(0),
                listener: RefCell::new(None),
                cells: RefCell::new(IndexMap::new()),
            }),
        }
    }

    /// The kind this container was created for.
    #[must_use]
    pub fn kind(&self) -> Kind {
        self.core.kind
    }

    /// Declare a cell under an explicit `key`.
    ///
    /// Declaring a key that already exists with the same value type returns a
    /// handle to the existing cell and ignores `initial`. Cells declared on a
    /// disposed container start out detached.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::CellTypeMismatch`] if `key` was declared with a
    /// different value type.
    pub fn cell<T: Clone + PartialEq + 'static>(
        &self,
        key: impl Into<String>,
        initial: T,
    ) -> Result<ReactiveCell<T>, StateError> {
        let key = key.into();
        let mut cells = self.core.cells.borrow_mut();

        if let Some(entry) = cells.get(&key) {
            return Rc::clone(&entry.any)
                .downcast::<CellInner<T>>()
                .map(ReactiveCell::from_inner)
                .map_err(|_| StateError::CellTypeMismatch {
                    kind: self.core.kind,
                    key,
                });
        }

        let owner = (!self.core.disposed.get()).then(|| Rc::downgrade(&self.core));
        let inner = Rc::new(CellInner::new(key.clone(), initial, owner));
        if !self.core.disposed.get() {
            cells.insert(
                key,
                CellEntry {
                    slot: inner.clone(),
                    any: inner.clone(),
                },
            );
        }
        Ok(ReactiveCell::from_inner(inner))
    }

    /// Declared cell keys in declaration order.
    #[must_use]
    pub fn cell_keys(&self) -> Vec<String> {
        self.core.cells.borrow().keys().cloned().collect()
    }

    /// Number of cells currently owned.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.core.cells.borrow().len()
    }

    /// Fire the change event, unless disposed or inside a batch.
    pub fn notify_change(&self) {
        self.core.notify_change();
    }

    /// Run `f` and then fire the change event once.
    ///
    /// For state that lives outside reactive cells. Cell writes made by `f`
    /// still announce themselves as usual; use [`batch`](Self::batch) to
    /// coalesce those.
    pub fn mutate<R>(&self, f: impl FnOnce() -> R) -> R {
        let out = f();
        self.notify_change();
        out
    }

    /// Run `f` with notifications suppressed, then fire the change event
    /// once.
    ///
    /// Nested batches announce only when the outermost one exits. Nothing is
    /// announced if the container was disposed before or during `f`.
    pub fn batch<R>(&self, f: impl FnOnce() -> R) -> R {
        let out = {
            let _guard = BatchGuard::enter(&self.core);
            f()
        };
        self.core.notify_change();
        out
    }

    /// Tear the container down: drop the listener, detach every cell, and
    /// silence all future notifications. Idempotent.
    pub fn dispose(&self) {
        if self.core.disposed.replace(true) {
            return;
        }
        self.core.listener.borrow_mut().take();
        let cells: Vec<CellEntry> = self
            .core
            .cells
            .borrow_mut()
            .drain(..)
            .map(|(_, entry)| entry)
            .collect();
        for entry in &cells {
            entry.slot.detach();
        }
        debug!(kind = %self.core.kind, cells = cells.len(), "state container disposed");
    }

    /// Whether [`dispose`](Self::dispose) has run.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.core.disposed.get()
    }

    /// Whether a batch is currently open.
    #[must_use]
    pub fn is_suppressed(&self) -> bool {
        self.core.batch_depth.get() > 0
    }

    /// Attach the single change listener.
    ///
    /// Returns `false` (and leaves the existing listener in place) if one is
    /// already wired or the container is disposed.
    pub fn wire(&self, listener: impl Fn() + 'static) -> bool {
        if self.core.disposed.get() {
            return false;
        }
        let mut slot = self.core.listener.borrow_mut();
        if slot.is_some() {
            return false;
        }
        *slot = Some(Rc::new(listener));
        true
    }

    /// Whether a listener is wired.
    #[must_use]
    pub fn has_listener(&self) -> bool {
        self.core.listener.borrow().is_some()
    }

    /// Whether two handles refer to the same container.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.core, &other.core)
    }
}
