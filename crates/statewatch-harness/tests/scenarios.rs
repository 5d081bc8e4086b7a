//! End-to-end scenarios for the registry, cells and subscription handles.
//!
//! 1. All handles resolve to one registry.
//! 2. A kind is created once; later factories never run.
//! 3. Equal-value sets and silent sets produce no renders.
//! 4. N mounted watchers get exactly N renders per change.
//! 5. Unmounted watchers are skipped and evicted.
//! 6. Unsubscribe is idempotent.
//! 7. Reset clears all state and forces fresh creation.
//! 8. Counter walkthrough and batch walkthrough.

use std::cell::Cell;
use std::rc::Rc;

use statewatch_core::{Kind, State, StateRegistry, SubscriptionHandle};
use statewatch_harness::{CounterState, PairState, RenderLog, TestSubscriber};

#[test]
fn every_handle_resolves_to_the_same_registry() {
    let registry = StateRegistry::default();
    let handles: Vec<SubscriptionHandle> = (0..4)
        .map(|_| SubscriptionHandle::new(&registry, &TestSubscriber::new("w")))
        .collect();
    for handle in &handles {
        assert!(handle.registry().ptr_eq(&registry));
    }
    let cloned = registry.clone();
    assert!(handles[0].registry().ptr_eq(&cloned));
}

#[test]
fn second_factory_is_never_invoked() {
    let registry = StateRegistry::default();
    let s1 = TestSubscriber::new("s1");
    let s2 = TestSubscriber::new("s2");
    let second_called = Cell::new(false);

    let first = registry.watch(&s1, CounterState::new).unwrap();
    let second = registry
        .watch(&s2, || {
            second_called.set(true);
            CounterState::new()
        })
        .unwrap();

    assert!(Rc::ptr_eq(&first, &second));
    assert!(!second_called.get());
}

#[test]
fn equal_value_set_is_silent() {
    let registry = StateRegistry::default();
    let a = TestSubscriber::new("a");
    let counter = registry.watch(&a, CounterState::new).unwrap();

    counter.count().set(0);
    assert_eq!(a.renders(), 0);
    assert_eq!(registry.stats().notifications, 0);
}

#[test]
fn silent_set_changes_value_without_render() {
    let registry = StateRegistry::default();
    let a = TestSubscriber::new("a");
    let counter = registry.watch(&a, CounterState::new).unwrap();

    counter.count().set_silent(9);
    assert_eq!(counter.count().get(), 9);
    assert_eq!(a.renders(), 0);
}

#[test]
fn fan_out_reaches_each_watcher_once_in_order() {
    let registry = StateRegistry::default();
    let log = RenderLog::new();
    let names = ["a", "b", "c", "d"];
    let subs: Vec<Rc<TestSubscriber>> = names
        .into_iter()
        .map(|name| TestSubscriber::logged(name, &log))
        .collect();

    let mut counter = None;
    for sub in &subs {
        counter = Some(registry.watch(sub, CounterState::new).unwrap());
    }
    let counter = counter.unwrap();

    counter.count().set(1);
    assert_eq!(log.entries(), names.to_vec());
    for sub in &subs {
        assert_eq!(sub.renders(), 1);
    }
}

#[test]
fn unmounted_watcher_is_skipped_and_evicted() {
    let registry = StateRegistry::default();
    let live = TestSubscriber::new("live");
    let gone = TestSubscriber::new("gone");
    let counter = registry.watch(&live, CounterState::new).unwrap();
    registry.watch(&gone, CounterState::new).unwrap();

    gone.set_mounted(false);
    counter.count().set(1);

    assert_eq!(live.renders(), 1);
    assert_eq!(gone.attempts(), 0);
    assert!(!registry.is_watching(CounterState::KIND, &gone));
    assert_eq!(registry.watcher_count(CounterState::KIND), 1);

    counter.count().set(2);
    assert_eq!(gone.attempts(), 0);
}

#[test]
fn unsubscribe_is_idempotent() {
    let registry = StateRegistry::default();
    let a = TestSubscriber::new("a");
    let b = TestSubscriber::new("b");
    registry.watch(&a, CounterState::new).unwrap();

    assert!(!registry.unsubscribe(CounterState::KIND, &b));
    assert!(!registry.unsubscribe(Kind::new("never-created"), &a));
    assert_eq!(registry.watcher_count(CounterState::KIND), 1);

    assert!(registry.unsubscribe(CounterState::KIND, &a));
    assert!(!registry.unsubscribe(CounterState::KIND, &a));
    assert_eq!(registry.watcher_count(CounterState::KIND), 0);
}

#[test]
fn reset_clears_everything() {
    let registry = StateRegistry::default();
    let a = TestSubscriber::new("a");
    let counter = registry.watch(&a, CounterState::new).unwrap();
    let pair = registry.watch(&a, PairState::new).unwrap();

    registry.reset();

    assert!(registry.read::<CounterState>().is_none());
    assert!(registry.read::<PairState>().is_none());
    assert!(counter.container().is_disposed());
    assert!(pair.container().is_disposed());

    let created = Cell::new(0);
    let fresh = registry
        .watch(&a, || {
            created.set(created.get() + 1);
            CounterState::new()
        })
        .unwrap();
    assert_eq!(created.get(), 1);
    assert!(!Rc::ptr_eq(&counter, &fresh));

    fresh.count().set(3);
    assert_eq!(a.renders(), 1);
}

#[test]
fn counter_walkthrough() {
    let registry = StateRegistry::default();
    let a = TestSubscriber::new("A");
    let handle = SubscriptionHandle::new(&registry, &a);

    let counter = handle.watch(CounterState::new).unwrap();
    assert_eq!(a.renders(), 0);

    counter.count().set(1);
    assert_eq!(a.renders(), 1);
    assert_eq!(counter.count().get(), 1);

    counter.count().set(1);
    assert_eq!(a.renders(), 1);

    counter.count().set_silent(0);
    assert_eq!(counter.count().get(), 0);
    assert_eq!(a.renders(), 1);

    handle.unsubscribe(CounterState::KIND);
    counter.count().set(5);
    assert_eq!(a.renders(), 1);
    assert_eq!(counter.count().get(), 5);
}

#[test]
fn batch_walkthrough() {
    let registry = StateRegistry::default();
    let a = TestSubscriber::new("A");
    let pair = registry.watch(&a, PairState::new).unwrap();

    pair.container().batch(|| {
        pair.a().set(1);
        pair.b().set(2);
    });

    assert_eq!(a.renders(), 1);
    assert_eq!(pair.a().get(), 1);
    assert_eq!(pair.b().get(), 2);

    pair.set_both(3, 4);
    assert_eq!(a.renders(), 2);
}

#[test]
fn read_from_outside_render_pass() {
    let registry = StateRegistry::default();
    let a = TestSubscriber::new("a");
    let reader = TestSubscriber::new("reader");
    let reader_handle = SubscriptionHandle::new(&registry, &reader);

    assert!(reader_handle.read::<CounterState>().is_none());
    registry.watch(&a, CounterState::new).unwrap();

    let counter = reader_handle.read::<CounterState>().unwrap();
    counter.count().set(7);
    assert_eq!(reader.renders(), 0);
    assert_eq!(a.renders(), 1);
    assert!(!registry.is_watching(CounterState::KIND, &reader));
}

#[test]
fn state_outlives_its_last_watcher() {
    let registry = StateRegistry::default();
    let a = TestSubscriber::new("a");
    let handle = SubscriptionHandle::new(&registry, &a);
    let counter = handle.watch(CounterState::new).unwrap();
    counter.count().set(4);

    handle.unsubscribe_all();
    drop(handle);
    drop(a);

    let b = TestSubscriber::new("b");
    let again = registry.watch(&b, CounterState::new).unwrap();
    assert!(Rc::ptr_eq(&counter, &again));
    assert_eq!(again.count().get(), 4);
}
