#![forbid(unsafe_code)]

//! Per-component subscription facade.
//!
//! A UI component creates one [`SubscriptionHandle`] when it mounts, calls
//! [`watch`](SubscriptionHandle::watch) from every render pass, and calls
//! [`unsubscribe_all`](SubscriptionHandle::unsubscribe_all) when it is torn
//! down. A component that forgets to unsubscribe leaves a stale entry that
//! the registry evicts on the next change of that kind.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::StateError;
use crate::kind::{Kind, State};
use crate::registry::StateRegistry;
use crate::subscriber::{Subscriber, SubscriberId};

/// Registry operations bound to one subscriber.
pub struct SubscriptionHandle {
    registry: StateRegistry,
    subscriber: Weak<dyn Subscriber>,
    id: SubscriberId,
    /// Kinds watched through this handle, in first-watch order.
    watched: RefCell<Vec<Kind>>,
}

impl fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("subscriber", &self.id)
            .field("watched", &self.watched.borrow())
            .finish()
    }
}

impl SubscriptionHandle {
    /// Bind `subscriber` to `registry`.
    #[must_use]
    pub fn new<W: Subscriber + 'static>(registry: &StateRegistry, subscriber: &Rc<W>) -> Self {
        let weak = Rc::downgrade(subscriber);
        let weak: Weak<dyn Subscriber> = weak;
        Self::from_weak(registry, weak)
    }

    /// Bind an already type-erased subscriber to `registry`.
    #[must_use]
    pub fn from_weak(registry: &StateRegistry, subscriber: Weak<dyn Subscriber>) -> Self {
        Self {
            registry: registry.clone(),
            id: SubscriberId::of_weak(&subscriber),
            subscriber,
            watched: RefCell::new(Vec::new()),
        }
    }

    /// Get or create the state for `S::KIND` and watch it.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::KindMismatch`] if the slot for `S::KIND` holds a
    /// different state type.
    pub fn watch<S: State>(&self, factory: impl FnOnce() -> S) -> Result<Rc<S>, StateError> {
        let state = self.registry.watch_weak(self.subscriber.clone(), factory)?;
        let mut watched = self.watched.borrow_mut();
        if !watched.contains(&S::KIND) {
            watched.push(S::KIND);
        }
        Ok(state)
    }

    /// The existing state for `S::KIND`, without subscribing.
    #[must_use]
    pub fn read<S: State>(&self) -> Option<Rc<S>> {
        self.registry.read::<S>()
    }

    /// Stop watching `kind`. Returns whether the subscriber was watching.
    pub fn unsubscribe(&self, kind: Kind) -> bool {
        self.watched.borrow_mut().retain(|k| *k != kind);
        self.registry.unsubscribe_id(kind, self.id)
    }

    /// Stop watching every kind watched through this handle.
    pub fn unsubscribe_all(&self) {
        let kinds = std::mem::take(&mut *self.watched.borrow_mut());
        for kind in kinds {
            self.registry.unsubscribe_id(kind, self.id);
        }
    }

    /// Kinds watched through this handle and not yet unsubscribed.
    #[must_use]
    pub fn watched(&self) -> Vec<Kind> {
        self.watched.borrow().clone()
    }

    /// The registry this handle delegates to.
    #[must_use]
    pub fn registry(&self) -> &StateRegistry {
        &self.registry
    }

    /// Identity of the bound subscriber.
    #[must_use]
    pub fn subscriber_id(&self) -> SubscriberId {
        self.id
    }
}
