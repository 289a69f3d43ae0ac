//! Time-travel wrapper around a store.

use std::fmt::{self, Debug};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use serde::Serialize;
use tracing::debug;

use super::options::HistoryOptions;
use super::timeline::Timeline;
use crate::error::{Result, StateError};
use crate::reactive::{
    create_with_writer, GetState, Merge, Patch, SetState, Store, StoreInner, WriteState,
};

struct HistoryInner<T> {
    store: Store<T>,
    timeline: RwLock<Timeline<T>>,
}

/// Linear undo/redo over the states written through it.
///
/// Every write made through the history resolves to a complete snapshot,
/// is appended to the timeline, and then replaces the live state of the
/// wrapped store. Writes made on the store directly are not recorded.
///
/// # Example
///
/// ```rust
/// use vessel_core::history::{History, HistoryOptions};
/// use vessel_core::reactive::{Patch, Store};
///
/// let history = History::new(Store::new(0), HistoryOptions::new());
/// for _ in 0..3 {
///     history.replace_state(Patch::with(|n| n + 1));
/// }
/// assert_eq!(history.pointer(), Some(2));
///
/// history.undo();
/// history.undo();
/// assert_eq!(*history.get_state(), 1);
/// ```
pub struct History<T> {
    inner: Arc<HistoryInner<T>>,
}

impl<T> History<T>
where
    T: PartialEq + Send + Sync + 'static,
{
    /// Record writes to `store` from now on. Its current state is not
    /// recorded.
    pub fn new(store: Store<T>, options: HistoryOptions) -> Self {
        Self {
            inner: Arc::new(HistoryInner {
                store,
                timeline: RwLock::new(Timeline::new(options.capacity)),
            }),
        }
    }

    /// The wrapped store, for subscribing and untracked access.
    pub fn store(&self) -> &Store<T> {
        &self.inner.store
    }

    pub fn get_state(&self) -> Arc<T> {
        self.inner.store.get_state()
    }

    /// Merge a partial update into the current state and record the result.
    pub fn set_state(&self, patch: Patch<'_, T, T::Partial>)
    where
        T: Merge,
    {
        let current = self.get_state();
        let partial = patch.resolve(&current);
        let next = current.merge(partial);
        self.record(current, next);
    }

    /// Record a complete state.
    pub fn replace_state(&self, patch: Patch<'_, T>) {
        let current = self.get_state();
        let next = patch.resolve(&current);
        self.record(current, next);
    }

    /// A write equal to the live state records the live `Arc` itself, so
    /// the current snapshot and the store always share one allocation.
    fn record(&self, current: Arc<T>, next: T) {
        let snapshot = if *current == next {
            current
        } else {
            Arc::new(next)
        };
        self.inner.timeline.write().record(Arc::clone(&snapshot));
        self.inner.store.install(snapshot);
    }

    /// Restore the previous snapshot. No-op at the first snapshot.
    pub fn undo(&self) {
        let snapshot = self.inner.timeline.write().undo();
        if let Some(snapshot) = snapshot {
            debug!(store = %self.inner.store.id(), pointer = ?self.pointer(), "undo");
            self.inner.store.install(snapshot);
        }
    }

    /// Restore the next snapshot. No-op at the last snapshot.
    pub fn redo(&self) {
        let snapshot = self.inner.timeline.write().redo();
        if let Some(snapshot) = snapshot {
            debug!(store = %self.inner.store.id(), pointer = ?self.pointer(), "redo");
            self.inner.store.install(snapshot);
        }
    }

    /// Restore the snapshot at `index`, keeping the rest of the timeline.
    pub fn jump(&self, index: usize) -> Result<()> {
        let snapshot = self.inner.timeline.write().jump(index)?;
        debug!(store = %self.inner.store.id(), pointer = index, "jump");
        self.inner.store.install(snapshot);
        Ok(())
    }

    /// Forget every snapshot. The live state is left as it is.
    pub fn clear(&self) {
        self.inner.timeline.write().clear();
    }

    /// Index of the current snapshot; `None` before the first write.
    pub fn pointer(&self) -> Option<usize> {
        self.inner.timeline.read().pointer()
    }

    pub fn len(&self) -> usize {
        self.inner.timeline.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn can_undo(&self) -> bool {
        self.inner.timeline.read().can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.inner.timeline.read().can_redo()
    }

    /// Copy of the snapshot sequence, oldest first.
    pub fn snapshots(&self) -> Vec<Arc<T>> {
        self.inner.timeline.read().snapshots()
    }

    /// Snapshot sequence and pointer as JSON, for inspection tools.
    pub fn export_json(&self) -> Result<String>
    where
        T: Serialize,
    {
        let snapshots = self.snapshots();
        let log = SnapshotLog::new(self.pointer(), &snapshots);
        Ok(serde_json::to_string(&log)?)
    }

    /// Snapshot sequence and pointer as MessagePack (named fields).
    pub fn export_msgpack(&self) -> Result<Vec<u8>>
    where
        T: Serialize,
    {
        let snapshots = self.snapshots();
        let log = SnapshotLog::new(self.pointer(), &snapshots);
        Ok(rmp_serde::to_vec_named(&log)?)
    }
}

impl<T> Clone for History<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Debug for History<T>
where
    T: PartialEq + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("History")
            .field("store", &self.inner.store)
            .field("pointer", &self.pointer())
            .field("len", &self.len())
            .finish()
    }
}

#[derive(Serialize)]
struct SnapshotLog<'a, T> {
    pointer: Option<usize>,
    snapshots: Vec<&'a T>,
}

impl<'a, T> SnapshotLog<'a, T> {
    fn new(pointer: Option<usize>, snapshots: &'a [Arc<T>]) -> Self {
        Self {
            pointer,
            snapshots: snapshots.iter().map(|snapshot| &**snapshot).collect(),
        }
    }
}

impl<T> WriteState<T> for Weak<HistoryInner<T>>
where
    T: PartialEq + Send + Sync + 'static,
{
    fn write(&self, patch: Patch<'_, T>) -> Result<()> {
        let inner = self.upgrade().ok_or(StateError::Detached)?;
        History { inner }.replace_state(patch);
        Ok(())
    }
}

/// Build a store whose initializer writes go through a new history.
///
/// The `SetState` handle passed to `init` records every write; reach the
/// store itself through [`History::store`].
pub fn time_travel<T, F>(options: HistoryOptions, init: F) -> History<T>
where
    T: PartialEq + Send + Sync + 'static,
    F: FnOnce(SetState<T>, GetState<T>) -> T,
{
    let inner = Arc::new_cyclic(|weak: &Weak<HistoryInner<T>>| {
        let writer: Arc<dyn WriteState<T>> = Arc::new(Weak::clone(weak));
        let store = create_with_writer(init, move |_: Weak<StoreInner<T>>| writer);
        HistoryInner {
            store,
            timeline: RwLock::new(Timeline::new(options.capacity)),
        }
    });
    History { inner }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
