#![forbid(unsafe_code)]

//! The state registry: one live state object per kind, plus its watchers.
//!
//! # Design
//!
//! [`StateRegistry`] is a cheap `Rc` handle. It is built once at application
//! start and handed to every UI adapter; all clones resolve to the same
//! registry (see [`ptr_eq`](StateRegistry::ptr_eq)).
//!
//! For each kind the registry keeps:
//!
//! - the state object, created lazily by the first `watch` through a
//!   caller-supplied factory;
//! - the watcher set, in insertion order, holding subscribers weakly;
//! - a "listener wired" flag, so the registry attaches its change listener to
//!   the state's container exactly once however many components watch it.
//!
//! Per kind the lifecycle is `Absent → Created → Disposed → Absent`. State
//! outlives its watchers: the last `unsubscribe` leaves it in place until
//! [`dispose_all`](StateRegistry::dispose_all) or
//! [`reset`](StateRegistry::reset). A container disposed directly through
//! [`StateContainer::dispose`] counts as Absent: the next `watch` runs the
//! factory again and `read` returns `None`.
//!
//! # Dispatch
//!
//! On a change event the registry snapshots the kind's watcher set and visits
//! each watcher once, in insertion order:
//!
//! 1. skip it if an earlier render in this pass already removed it;
//! 2. evict it if it was dropped or is no longer mounted;
//! 3. otherwise request a render; on failure apply the configured
//!    [`RetryPolicy`].
//!
//! No borrow of the registry is held while calling into a subscriber or the
//! frame scheduler, so both may call back into the registry.

use std::any::{Any, type_name};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use tracing::{debug, trace, warn};

use crate::config::{RegistryConfig, RetryPolicy};
use crate::error::StateError;
use crate::kind::{Kind, State};
use crate::reactive::StateContainer;
use crate::subscriber::{DeferredRender, FrameScheduler, Subscriber, SubscriberId};

/// Counters describing registry activity since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// State objects created through factories.
    pub containers_created: u64,
    /// Change events dispatched to watcher sets.
    pub notifications: u64,
    /// Render requests issued, synchronous and deferred.
    pub render_requests: u64,
    /// Render requests that returned an error.
    pub render_failures: u64,
    /// Renders handed to the frame scheduler.
    pub deferred: u64,
    /// Watchers removed by the registry (not by `unsubscribe`).
    pub evictions: u64,
}

struct Slot {
    instance: Rc<dyn Any>,
    container: StateContainer,
    type_name: &'static str,
}

type WatcherSet = IndexMap<SubscriberId, Weak<dyn Subscriber>>;

struct RegistryInner {
    config: RegistryConfig,
    scheduler: Option<Rc<dyn FrameScheduler>>,
    states: IndexMap<Kind, Slot>,
    watchers: HashMap<Kind, WatcherSet>,
    wired: HashSet<Kind>,
    stats: RegistryStats,
}

/// Maps each [`Kind`] to its single live state object and its watchers.
#[derive(Clone)]
pub struct StateRegistry {
    inner: Rc<RefCell<RegistryInner>>,
}

/// Built-in defaults. The environment is not consulted; see
/// [`RegistryConfig::from_env`].
impl Default for StateRegistry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

impl fmt::Debug for StateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        let states: Vec<(Kind, &'static str)> = inner
            .states
            .iter()
            .map(|(kind, slot)| (*kind, slot.type_name))
            .collect();
        f.debug_struct("StateRegistry")
            .field("config", &inner.config)
            .field("states", &states)
            .field(
                "watchers",
                &inner.watchers.values().map(IndexMap::len).sum::<usize>(),
            )
            .field("has_scheduler", &inner.scheduler.is_some())
            .field("stats", &inner.stats)
            .finish()
    }
}

impl StateRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            inner: Rc::new(RefCell::new(RegistryInner {
                config,
                scheduler: None,
                states: IndexMap::new(),
                watchers: HashMap::new(),
                wired: HashSet::new(),
                stats: RegistryStats::default(),
            })),
        }
    }

    /// Attach the frame scheduler used for deferred re-renders.
    #[must_use]
    pub fn with_scheduler(self, scheduler: Rc<dyn FrameScheduler>) -> Self {
        self.set_scheduler(scheduler);
        self
    }

    /// Replace the frame scheduler.
    pub fn set_scheduler(&self, scheduler: Rc<dyn FrameScheduler>) {
        self.inner.borrow_mut().scheduler = Some(scheduler);
    }

    /// The configuration this registry was built with.
    #[must_use]
    pub fn config(&self) -> RegistryConfig {
        self.inner.borrow().config.clone()
    }

    /// Activity counters.
    #[must_use]
    pub fn stats(&self) -> RegistryStats {
        self.inner.borrow().stats
    }

    /// Whether two handles refer to the same registry.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Get or create the state for `S::KIND` and register `subscriber` as a
    /// watcher of it.
    ///
    /// `factory` runs only if no live state exists for the kind. Once the
    /// state exists, later factories are ignored and the existing instance is
    /// returned. Registering an existing watcher again is a no-op, so this is
    /// safe to call on every render pass.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::KindMismatch`] if the slot for `S::KIND` holds a
    /// different state type.
    pub fn watch<S, W>(
        &self,
        subscriber: &Rc<W>,
        factory: impl FnOnce() -> S,
    ) -> Result<Rc<S>, StateError>
    where
        S: State,
        W: Subscriber + 'static,
    {
        let weak = Rc::downgrade(subscriber);
        let weak: Weak<dyn Subscriber> = weak;
        self.watch_weak(weak, factory)
    }

    pub(crate) fn watch_weak<S: State>(
        &self,
        subscriber: Weak<dyn Subscriber>,
        factory: impl FnOnce() -> S,
    ) -> Result<Rc<S>, StateError> {
        let kind = S::KIND;
        let state = self.get_or_create(factory)?;
        let container = state.container().clone();
        let id = SubscriberId::of_weak(&subscriber);

        let needs_wiring = {
            let mut inner = self.inner.borrow_mut();
            let set = inner.watchers.entry(kind).or_default();
            if !set.contains_key(&id) {
                set.insert(id, subscriber);
                debug!(kind = %kind, subscriber = ?id, "watcher added");
            }
            !inner.wired.contains(&kind) || !container.has_listener()
        };
        if needs_wiring {
            self.wire(kind, &container);
        }
        Ok(state)
    }

    /// The existing state for `S::KIND`, without creating it or subscribing.
    ///
    /// Returns `None` if no state exists, if its container was disposed, or
    /// if the slot holds another type (logged as a warning).
    #[must_use]
    pub fn read<S: State>(&self) -> Option<Rc<S>> {
        match self.lookup::<S>() {
            Ok(state) => state,
            Err(err) => {
                let kind = S::KIND;
                warn!(kind = %kind, expected = type_name::<S>(), "{err}");
                None
            }
        }
    }

    /// The container of the state stored under `kind`, if any.
    #[must_use]
    pub fn container(&self, kind: Kind) -> Option<StateContainer> {
        self.inner
            .borrow()
            .states
            .get(&kind)
            .map(|slot| slot.container.clone())
    }

    /// Remove `subscriber` from the watchers of `kind`.
    ///
    /// Returns whether it was watching. The state itself is untouched.
    pub fn unsubscribe<W: Subscriber + ?Sized>(&self, kind: Kind, subscriber: &Rc<W>) -> bool {
        self.unsubscribe_id(kind, SubscriberId::of(subscriber))
    }

    /// Remove the subscriber identified by `id` from the watchers of `kind`.
    pub fn unsubscribe_id(&self, kind: Kind, id: SubscriberId) -> bool {
        let removed = self
            .inner
            .borrow_mut()
            .watchers
            .get_mut(&kind)
            .is_some_and(|set| set.shift_remove(&id).is_some());
        if removed {
            debug!(kind = %kind, subscriber = ?id, "watcher unsubscribed");
        }
        removed
    }

    /// Ask every watcher of `kind` to re-render.
    ///
    /// This is what the wired listener calls on each change event. Failures
    /// are recovered locally and never reach the caller.
    pub fn notify_watchers(&self, kind: Kind) {
        let (snapshot, policy) = {
            let mut inner = self.inner.borrow_mut();
            inner.stats.notifications += 1;
            let snapshot: Vec<(SubscriberId, Weak<dyn Subscriber>)> = inner
                .watchers
                .get(&kind)
                .map(|set| set.iter().map(|(id, w)| (*id, w.clone())).collect())
                .unwrap_or_default();
            (snapshot, inner.config.retry_policy)
        };
        trace!(kind = %kind, watchers = snapshot.len(), "dispatching change");

        for (id, weak) in snapshot {
            if !self.is_watching_id(kind, id) {
                continue;
            }
            let Some(subscriber) = weak.upgrade() else {
                self.evict(kind, id, "dropped");
                continue;
            };
            if !subscriber.is_mounted() {
                self.evict(kind, id, "unmounted");
                continue;
            }
            self.inner.borrow_mut().stats.render_requests += 1;
            if let Err(err) = subscriber.request_render() {
                self.inner.borrow_mut().stats.render_failures += 1;
                debug!(kind = %kind, subscriber = ?id, error = %err, "render request failed");
                match policy {
                    RetryPolicy::Evict => self.evict(kind, id, "render failed"),
                    RetryPolicy::NextTick { attempts } => self.defer(kind, id, weak, attempts),
                }
            }
        }
    }

    /// Dispose every state object and forget all watchers.
    ///
    /// Wiring flags survive; a state recreated afterwards is rewired on its
    /// first `watch` because its fresh container has no listener yet.
    pub fn dispose_all(&self) {
        let slots: Vec<Slot> = {
            let mut inner = self.inner.borrow_mut();
            inner.watchers.clear();
            inner.states.drain(..).map(|(_, slot)| slot).collect()
        };
        for slot in &slots {
            slot.container.dispose();
        }
        debug!(count = slots.len(), "all state disposed");
    }

    /// Return the registry to its initial empty state.
    ///
    /// Everything [`dispose_all`](Self::dispose_all) does, plus clearing the
    /// wiring flags. Configuration, scheduler and stats are kept.
    pub fn reset(&self) {
        self.dispose_all();
        self.inner.borrow_mut().wired.clear();
        debug!("registry reset");
    }

    /// Number of watchers currently registered for `kind`.
    #[must_use]
    pub fn watcher_count(&self, kind: Kind) -> usize {
        self.inner
            .borrow()
            .watchers
            .get(&kind)
            .map_or(0, IndexMap::len)
    }

    /// Watcher identities for `kind`, in insertion order.
    #[must_use]
    pub fn watchers(&self, kind: Kind) -> Vec<SubscriberId> {
        self.inner
            .borrow()
            .watchers
            .get(&kind)
            .map(|set| set.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Whether `subscriber` currently watches `kind`.
    #[must_use]
    pub fn is_watching<W: Subscriber + ?Sized>(&self, kind: Kind, subscriber: &Rc<W>) -> bool {
        self.is_watching_id(kind, SubscriberId::of(subscriber))
    }

    /// Whether the subscriber identified by `id` currently watches `kind`.
    #[must_use]
    pub fn is_watching_id(&self, kind: Kind, id: SubscriberId) -> bool {
        self.inner
            .borrow()
            .watchers
            .get(&kind)
            .is_some_and(|set| set.contains_key(&id))
    }

    /// Whether a state object exists for `kind`.
    #[must_use]
    pub fn contains(&self, kind: Kind) -> bool {
        self.inner.borrow().states.contains_key(&kind)
    }

    /// Whether the registry has wired its listener for `kind`.
    #[must_use]
    pub fn is_wired(&self, kind: Kind) -> bool {
        self.inner.borrow().wired.contains(&kind)
    }

    /// Kinds with a live state object, in creation order.
    #[must_use]
    pub fn kinds(&self) -> Vec<Kind> {
        self.inner.borrow().states.keys().copied().collect()
    }

    fn lookup<S: State>(&self) -> Result<Option<Rc<S>>, StateError> {
        let kind = S::KIND;
        let mut inner = self.inner.borrow_mut();
        let Some(slot) = inner.states.get(&kind) else {
            return Ok(None);
        };
        // A container disposed behind the registry's back leaves the kind Absent.
        if slot.container.is_disposed() {
            inner.states.shift_remove(&kind);
            debug!(kind = %kind, "disposed state dropped from registry");
            return Ok(None);
        }
        Rc::clone(&slot.instance)
            .downcast::<S>()
            .map(Some)
            .map_err(|_| StateError::KindMismatch { kind })
    }

    fn get_or_create<S: State>(&self, factory: impl FnOnce() -> S) -> Result<Rc<S>, StateError> {
        if let Some(existing) = self.lookup::<S>()? {
            return Ok(existing);
        }

        // No borrow held: the factory may use the registry.
        let created = Rc::new(factory());

        if let Some(existing) = self.lookup::<S>()? {
            // The factory created this kind itself; keep the first instance.
            created.container().dispose();
            return Ok(existing);
        }

        let kind = S::KIND;
        let mut inner = self.inner.borrow_mut();
        inner.states.insert(
            kind,
            Slot {
                instance: created.clone(),
                container: created.container().clone(),
                type_name: type_name::<S>(),
            },
        );
        inner.stats.containers_created += 1;
        debug!(kind = %kind, state = type_name::<S>(), "state created");
        Ok(created)
    }

    fn wire(&self, kind: Kind, container: &StateContainer) {
        let registry = Rc::downgrade(&self.inner);
        let attached = container.wire(move || {
            if let Some(inner) = registry.upgrade() {
                StateRegistry { inner }.notify_watchers(kind);
            }
        });
        self.inner.borrow_mut().wired.insert(kind);
        if attached {
            debug!(kind = %kind, "change listener wired");
        } else if container.is_disposed() {
            debug!(kind = %kind, "container disposed; listener not wired");
        } else {
            warn!(kind = %kind, "container already has a listener; registry not wired");
        }
    }

    fn evict(&self, kind: Kind, id: SubscriberId, reason: &'static str) {
        let mut inner = self.inner.borrow_mut();
        let removed = inner
            .watchers
            .get_mut(&kind)
            .is_some_and(|set| set.shift_remove(&id).is_some());
        if removed {
            inner.stats.evictions += 1;
            debug!(kind = %kind, subscriber = ?id, reason, "watcher evicted");
        }
    }

    fn defer(&self, kind: Kind, id: SubscriberId, subscriber: Weak<dyn Subscriber>, attempts: u8) {
        if attempts == 0 {
            self.evict(kind, id, "retries exhausted");
            return;
        }
        let scheduler = self.inner.borrow().scheduler.clone();
        let Some(scheduler) = scheduler else {
            self.evict(kind, id, "no scheduler");
            return;
        };

        let registry = Rc::downgrade(&self.inner);
        let task = DeferredRender::new(move || {
            if let Some(inner) = registry.upgrade() {
                StateRegistry { inner }.run_deferred(kind, id, subscriber, attempts - 1);
            }
        });
        match scheduler.schedule(task) {
            Ok(()) => {
                self.inner.borrow_mut().stats.deferred += 1;
                trace!(kind = %kind, subscriber = ?id, attempts, "render deferred");
            }
            Err(err) => {
                debug!(kind = %kind, subscriber = ?id, error = %err, "deferral rejected");
                self.evict(kind, id, "schedule failed");
            }
        }
    }

    fn run_deferred(
        &self,
        kind: Kind,
        id: SubscriberId,
        subscriber: Weak<dyn Subscriber>,
        remaining: u8,
    ) {
        // Unsubscribed or reset since scheduling.
        if !self.is_watching_id(kind, id) {
            return;
        }
        let Some(strong) = subscriber.upgrade() else {
            self.evict(kind, id, "dropped");
            return;
        };
        if !strong.is_mounted() {
            self.evict(kind, id, "unmounted");
            return;
        }
        self.inner.borrow_mut().stats.render_requests += 1;
        if let Err(err) = strong.request_render() {
            self.inner.borrow_mut().stats.render_failures += 1;
            debug!(kind = %kind, subscriber = ?id, error = %err, "deferred render failed");
            self.defer(kind, id, subscriber, remaining);
        }
    }
}
