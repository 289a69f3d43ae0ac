//! Store Implementation
//!
//! A Store is the primitive every other cell in this crate is built on. It
//! holds one value and an ordered set of listeners.
//!
//! # How Stores Work
//!
//! 1. A write resolves its [`Patch`] against the current state, producing
//!    the next state (verbatim for `replace_state`, shallow-merged for
//!    `set_state`).
//!
//! 2. The next state is compared with the previous one. The same allocation
//!    or an equal value means nothing changed: the write returns and no one
//!    is notified.
//!
//! 3. Otherwise the next state is installed, the listener set is
//!    snapshotted, and every listener in the snapshot runs once, in
//!    registration order, with `(next, previous)`.
//!
//! # Re-entrancy
//!
//! No lock is held while user code runs (patch functions, `PartialEq` or
//! listeners). A listener may read the store, subscribe, unsubscribe or
//! write again. A nested write runs its own fan-out to completion before the
//! outer fan-out resumes, so propagation is depth-first.
//!
//! # Memory Layout
//!
//! The state is an `Arc<T>`. Readers get a clone of the `Arc`, which is an
//! immutable snapshot: the store only ever swaps the pointer, so a reader
//! can keep using an old snapshot while newer writes land. An unchanged
//! store keeps returning the same allocation, which observers can use for
//! cheap `Arc::ptr_eq` checks.

use std::fmt::{self, Debug};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::trace;

use super::listener::{ListenerSet, Subscription};
use super::patch::{Merge, Patch};
use crate::error::{Result, StateError};
use crate::graph::AtomId;

/// Store-level listener: `(next, previous)`.
pub(crate) type Listener<T> = dyn Fn(&T, &T) + Send + Sync;

pub(crate) struct StoreInner<T> {
    id: AtomId,
    state: RwLock<Arc<T>>,
    listeners: Arc<ListenerSet<Listener<T>>>,
}

impl<T> StoreInner<T>
where
    T: Send + Sync + 'static,
{
    fn new(initial: T) -> Self {
        Self {
            id: AtomId::new(),
            state: RwLock::new(Arc::new(initial)),
            listeners: Arc::new(ListenerSet::new()),
        }
    }
}

/// A single-value state container with change notification.
///
/// Clones share the same state and listeners.
///
/// # Example
///
/// ```rust
/// use serde_json::json;
/// use vessel_core::reactive::{Patch, Store};
///
/// let store = Store::new(json!({ "a": 1, "b": 2 }));
/// store.set_state(Patch::value(json!({ "b": 3 }).as_object().unwrap().clone()));
/// assert_eq!(*store.get_state(), json!({ "a": 1, "b": 3 }));
///
/// store.replace_state(Patch::value(json!({ "b": 3 })));
/// assert_eq!(*store.get_state(), json!({ "b": 3 }));
/// ```
pub struct Store<T> {
    inner: Arc<StoreInner<T>>,
}

impl<T> Store<T>
where
    T: PartialEq + Send + Sync + 'static,
{
    /// Create a store holding `initial`.
    pub fn new(initial: T) -> Self {
        Self {
            inner: Arc::new(StoreInner::new(initial)),
        }
    }

    pub fn id(&self) -> AtomId {
        self.inner.id
    }

    /// Current state. Never fails, never notifies.
    pub fn get_state(&self) -> Arc<T> {
        Arc::clone(&*self.inner.state.read())
    }

    /// Replace the state with the resolved patch value.
    pub fn replace_state(&self, patch: Patch<'_, T>) {
        let current = self.get_state();
        let next = patch.resolve(&current);
        self.install(Arc::new(next));
    }

    /// Shallow-merge the resolved partial into the state.
    pub fn set_state(&self, patch: Patch<'_, T, T::Partial>)
    where
        T: Merge,
    {
        let current = self.get_state();
        let partial = patch.resolve(&current);
        self.install(Arc::new(current.merge(partial)));
    }

    /// Register a listener called with `(next, previous)` after every
    /// change.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T, &T) + Send + Sync + 'static,
    {
        self.inner.listeners.insert(Arc::new(listener))
    }

    /// Get the number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }

    /// Install `next` if it differs from the current state, then notify.
    ///
    /// Returns whether the state changed.
    pub(crate) fn install(&self, next: Arc<T>) -> bool {
        // Compared outside the lock: `PartialEq` is user code.
        let current = self.get_state();
        if Arc::ptr_eq(&current, &next) || *current == *next {
            return false;
        }
        self.overwrite(next);
        true
    }

    /// Install `next` and notify every listener, changed or not.
    pub(crate) fn overwrite(&self, next: Arc<T>) {
        let previous = std::mem::replace(&mut *self.inner.state.write(), Arc::clone(&next));

        let listeners = self.inner.listeners.snapshot();
        trace!(store = %self.inner.id, listeners = listeners.len(), "state changed");
        for listener in listeners {
            listener(&next, &previous);
        }
    }
}

impl<T> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Debug for Store<T>
where
    T: PartialEq + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("id", &self.inner.id)
            .field("state", &self.get_state())
            .field("listener_count", &self.listener_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Factory
// ----------------------------------------------------------------------------

/// Destination of a [`SetState`] handle.
pub(crate) trait WriteState<T>: Send + Sync {
    fn write(&self, patch: Patch<'_, T>) -> Result<()>;
}

impl<T> WriteState<T> for Weak<StoreInner<T>>
where
    T: PartialEq + Send + Sync + 'static,
{
    fn write(&self, patch: Patch<'_, T>) -> Result<()> {
        let inner = self.upgrade().ok_or(StateError::Detached)?;
        Store { inner }.replace_state(patch);
        Ok(())
    }
}

/// Write handle given to a store initializer.
///
/// The handle does not keep the store alive; using it after the store is
/// gone, or before the initializer has returned, yields
/// [`StateError::Detached`].
pub struct SetState<T> {
    writer: Arc<dyn WriteState<T>>,
}

impl<T> SetState<T>
where
    T: PartialEq + Send + Sync + 'static,
{
    pub(crate) fn from_writer(writer: Arc<dyn WriteState<T>>) -> Self {
        Self { writer }
    }

    /// Shallow-merge a partial update, like [`Store::set_state`].
    pub fn set(&self, patch: Patch<'_, T, T::Partial>) -> Result<()>
    where
        T: Merge,
    {
        self.writer
            .write(Patch::with(move |current: &T| current.merge(patch.resolve(current))))
    }

    /// Replace the whole state, like [`Store::replace_state`].
    pub fn replace(&self, patch: Patch<'_, T>) -> Result<()> {
        self.writer.write(patch)
    }
}

impl<T> Clone for SetState<T> {
    fn clone(&self) -> Self {
        Self {
            writer: Arc::clone(&self.writer),
        }
    }
}

/// Read handle given to a store initializer.
pub struct GetState<T> {
    store: Weak<StoreInner<T>>,
}

impl<T> GetState<T>
where
    T: PartialEq + Send + Sync + 'static,
{
    pub fn get(&self) -> Result<Arc<T>> {
        let inner = self.store.upgrade().ok_or(StateError::Detached)?;
        Ok(Store { inner }.get_state())
    }
}

impl<T> Clone for GetState<T> {
    fn clone(&self) -> Self {
        Self {
            store: Weak::clone(&self.store),
        }
    }
}

/// Build a store from an initializer that receives its write and read
/// handles.
///
/// The handles are typically captured by closures stored alongside the
/// data, so the state carries its own actions.
///
/// ```rust
/// use vessel_core::reactive::{create, Patch};
///
/// let store = create(|_set, _get| 0_i64);
/// store.replace_state(Patch::with(|n| n + 1));
/// assert_eq!(*store.get_state(), 1);
/// ```
pub fn create<T, F>(init: F) -> Store<T>
where
    T: PartialEq + Send + Sync + 'static,
    F: FnOnce(SetState<T>, GetState<T>) -> T,
{
    create_with_writer(init, |store| Arc::new(store) as Arc<dyn WriteState<T>>)
}

/// Like [`create`], with the write handle routed through `writer` instead
/// of straight into the store.
pub(crate) fn create_with_writer<T, F, W>(init: F, writer: W) -> Store<T>
where
    T: PartialEq + Send + Sync + 'static,
    F: FnOnce(SetState<T>, GetState<T>) -> T,
    W: FnOnce(Weak<StoreInner<T>>) -> Arc<dyn WriteState<T>>,
{
    let inner = Arc::new_cyclic(|weak: &Weak<StoreInner<T>>| {
        let set = SetState::from_writer(writer(Weak::clone(weak)));
        let get = GetState {
            store: Weak::clone(weak),
        };
        StoreInner::new(init(set, get))
    });
    Store { inner }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::{json, Map, Value};
    use std::sync::atomic::{AtomicI32, Ordering};

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn counting(store: &Store<i32>) -> (Arc<AtomicI32>, Subscription) {
        let count = Arc::new(AtomicI32::new(0));
        let count_clone = count.clone();
        let sub = store.subscribe(move |_, _| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });
        (count, sub)
    }

    #[test]
    fn store_get_and_replace() {
        let store = Store::new(0);
        assert_eq!(*store.get_state(), 0);

        store.replace_state(Patch::value(42));
        assert_eq!(*store.get_state(), 42);

        store.replace_state(Patch::with(|n| n + 1));
        assert_eq!(*store.get_state(), 43);
    }

    #[test]
    fn merge_keeps_untouched_fields() {
        let store = Store::new(json!({ "a": 1, "b": 2 }));
        store.set_state(Patch::value(object(json!({ "b": 3 }))));
        assert_eq!(*store.get_state(), json!({ "a": 1, "b": 3 }));
    }

    #[test]
    fn replace_drops_missing_fields() {
        let store = Store::new(json!({ "a": 1, "b": 2 }));
        store.replace_state(Patch::value(json!({ "b": 3 })));
        assert_eq!(*store.get_state(), json!({ "b": 3 }));
    }

    #[test]
    fn functional_merge_reads_current_state() {
        let store = Store::new(json!({ "count": 1, "label": "x" }));
        store.set_state(Patch::with(|s: &Value| {
            object(json!({ "count": s["count"].as_i64().unwrap_or(0) + 1 }))
        }));
        assert_eq!(*store.get_state(), json!({ "count": 2, "label": "x" }));
    }

    #[test]
    fn identical_write_does_not_notify() {
        let store = Store::new(json!({ "a": 1 }));
        let count = Arc::new(AtomicI32::new(0));
        let count_clone = count.clone();
        let _sub = store.subscribe(move |_, _| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        let current = store.get_state();
        store.install(current.clone());
        store.replace_state(Patch::value((*current).clone()));
        store.set_state(Patch::value(Map::new()));

        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(Arc::ptr_eq(&current, &store.get_state()));
    }

    #[test]
    fn listener_receives_next_and_previous() {
        let store = Store::new(1);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let _sub = store.subscribe(move |next, prev| seen_clone.lock().push((*next, *prev)));

        store.replace_state(Patch::value(2));
        store.replace_state(Patch::value(5));

        assert_eq!(*seen.lock(), vec![(2, 1), (5, 2)]);
    }

    #[test]
    fn listeners_fire_in_subscription_order() {
        let store = Store::new(0);
        let order = Arc::new(Mutex::new(Vec::new()));
        let subs: Vec<_> = (0..3)
            .map(|n| {
                let order = order.clone();
                store.subscribe(move |_, _| order.lock().push(n))
            })
            .collect();

        store.replace_state(Patch::value(1));
        assert_eq!(*order.lock(), vec![0, 1, 2]);
        assert_eq!(subs.len(), 3);
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let store = Store::new(0);
        let (count, sub) = counting(&store);

        store.replace_state(Patch::value(1));
        sub.unsubscribe();
        sub.unsubscribe();
        store.replace_state(Patch::value(2));

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn listener_added_during_fanout_waits_for_next_write() {
        let store = Store::new(0);
        let late_count = Arc::new(AtomicI32::new(0));
        let late_subs = Arc::new(Mutex::new(Vec::new()));

        let store_clone = store.clone();
        let late_count_clone = late_count.clone();
        let late_subs_clone = late_subs.clone();
        let _adder = store.subscribe(move |_, _| {
            let late_count = late_count_clone.clone();
            let sub = store_clone.subscribe(move |_, _| {
                late_count.fetch_add(1, Ordering::SeqCst);
            });
            late_subs_clone.lock().push(sub);
        });

        store.replace_state(Patch::value(1));
        assert_eq!(late_count.load(Ordering::SeqCst), 0);

        store.replace_state(Patch::value(2));
        // Only the listener added during the first write has fired.
        assert_eq!(late_count.load(Ordering::SeqCst), 1);
        assert_eq!(late_subs.lock().len(), 2);
    }

    #[test]
    fn listener_removed_during_fanout_still_runs_in_that_pass() {
        let store = Store::new(0);
        let order = Arc::new(Mutex::new(Vec::new()));
        let victim: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let first = {
            let order = order.clone();
            store.subscribe(move |_, _| order.lock().push("first"))
        };
        let remover = {
            let order = order.clone();
            let victim = victim.clone();
            store.subscribe(move |_, _| {
                order.lock().push("remover");
                if let Some(sub) = victim.lock().as_ref() {
                    sub.unsubscribe();
                }
            })
        };
        let third = {
            let order = order.clone();
            store.subscribe(move |_, _| order.lock().push("third"))
        };
        *victim.lock() = Some(third);

        store.replace_state(Patch::value(1));
        assert_eq!(*order.lock(), vec!["first", "remover", "third"]);

        order.lock().clear();
        store.replace_state(Patch::value(2));
        assert_eq!(*order.lock(), vec!["first", "remover"]);

        assert!(first.is_active());
        assert!(remover.is_active());
    }

    #[test]
    fn nested_write_propagates_depth_first() {
        let store = Store::new(0);
        let log = Arc::new(Mutex::new(Vec::new()));

        let bumper = {
            let log = log.clone();
            let inner = store.clone();
            store.subscribe(move |next, prev| {
                log.lock().push(("bumper", *next, *prev));
                if *next == 1 {
                    inner.replace_state(Patch::value(2));
                }
            })
        };
        let watcher = {
            let log = log.clone();
            store.subscribe(move |next, prev| log.lock().push(("watcher", *next, *prev)))
        };

        store.replace_state(Patch::value(1));

        assert_eq!(
            *log.lock(),
            vec![
                ("bumper", 1, 0),
                ("bumper", 2, 1),
                ("watcher", 2, 1),
                ("watcher", 1, 0),
            ]
        );
        assert_eq!(*store.get_state(), 2);
        bumper.unsubscribe();
        watcher.unsubscribe();
    }

    #[test]
    fn clones_share_state() {
        let store1 = Store::new(0);
        let store2 = store1.clone();
        let (count, _sub) = counting(&store1);

        store2.replace_state(Patch::value(9));
        assert_eq!(*store1.get_state(), 9);
        assert_eq!(store1.id(), store2.id());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    /// Value whose equality check reads the store holding it.
    #[derive(Clone)]
    struct SelfReading {
        n: i32,
        store: Arc<Mutex<Option<Store<SelfReading>>>>,
    }

    impl PartialEq for SelfReading {
        fn eq(&self, other: &Self) -> bool {
            let store = self.store.lock().clone();
            if let Some(store) = store {
                let _ = store.get_state();
            }
            self.n == other.n
        }
    }

    #[test]
    fn equality_check_may_read_the_store() {
        let slot = Arc::new(Mutex::new(None));
        let value = |n| SelfReading {
            n,
            store: slot.clone(),
        };
        let store = Store::new(value(0));
        *slot.lock() = Some(store.clone());
        let (count, _sub) = {
            let count = Arc::new(AtomicI32::new(0));
            let count_clone = count.clone();
            let sub = store.subscribe(move |_, _| {
                count_clone.fetch_add(1, Ordering::SeqCst);
            });
            (count, sub)
        };

        store.replace_state(Patch::value(value(0)));
        store.replace_state(Patch::value(value(1)));

        assert_eq!(store.get_state().n, 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        slot.lock().take();
    }

    #[test]
    fn overwrite_notifies_even_when_equal() {
        let store = Store::new(3);
        let (count, _sub) = counting(&store);

        store.overwrite(Arc::new(3));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(*store.get_state(), 3);
    }

    #[derive(Clone)]
    struct Counter {
        count: i32,
        increment: Option<Arc<dyn Fn() + Send + Sync>>,
    }

    impl PartialEq for Counter {
        fn eq(&self, other: &Self) -> bool {
            self.count == other.count
        }
    }

    #[test]
    fn create_hands_out_bound_handles() {
        let store = create(|set: SetState<Counter>, get: GetState<Counter>| Counter {
            count: 0,
            increment: Some(Arc::new(move || {
                let _ = set.replace(Patch::with(|c: &Counter| Counter {
                    count: c.count + 1,
                    ..c.clone()
                }));
                let _ = get.get();
            })),
        });

        let increment = store.get_state().increment.clone();
        if let Some(increment) = increment {
            increment();
            increment();
        }
        assert_eq!(store.get_state().count, 2);
    }

    #[test]
    fn handles_are_detached_during_init_and_after_drop() {
        let mut kept = None;
        let store = create(|set: SetState<i32>, get: GetState<i32>| {
            assert!(matches!(get.get(), Err(StateError::Detached)));
            assert!(matches!(set.replace(Patch::value(1)), Err(StateError::Detached)));
            kept = Some((set, get));
            0
        });

        let (set, get) = kept.take().unwrap();
        set.replace(Patch::value(5)).unwrap();
        assert_eq!(*get.get().unwrap(), 5);

        drop(store);
        assert!(matches!(get.get(), Err(StateError::Detached)));
        assert!(matches!(set.replace(Patch::value(6)), Err(StateError::Detached)));
    }

    #[test]
    fn set_handle_merges() {
        let mut handle = None;
        let store = create(|set: SetState<Value>, _get| {
            handle = Some(set);
            json!({ "a": 1, "b": 2 })
        });

        let set = handle.unwrap();
        set.set(Patch::value(object(json!({ "a": 7 })))).unwrap();
        assert_eq!(*store.get_state(), json!({ "a": 7, "b": 2 }));
    }
}
