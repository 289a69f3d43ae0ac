//! Snapshot timeline.
//!
//! The bookkeeping half of time travel: an ordered list of snapshots and a
//! pointer to the current one. It knows nothing about stores; the caller
//! installs whatever snapshot a navigation returns.

use std::sync::Arc;

use tracing::debug;

use crate::error::{Result, StateError};

/// Linear, truncatable sequence of snapshots.
#[derive(Debug)]
pub(crate) struct Timeline<T> {
    snapshots: Vec<Arc<T>>,
    /// Index of the current snapshot. `None` until the first write.
    pointer: Option<usize>,
    capacity: Option<usize>,
}

impl<T> Timeline<T> {
    /// A capacity of zero is treated as one: the current snapshot is
    /// always kept.
    pub(crate) fn new(capacity: Option<usize>) -> Self {
        Self {
            snapshots: Vec::new(),
            pointer: None,
            capacity: capacity.map(|capacity| capacity.max(1)),
        }
    }

    /// Append `snapshot` after the current pointer.
    ///
    /// Everything after the pointer (an undone future) is discarded first.
    pub(crate) fn record(&mut self, snapshot: Arc<T>) {
        let keep = self.pointer.map_or(0, |pointer| pointer + 1);
        if keep < self.snapshots.len() {
            debug!(
                discarded = self.snapshots.len() - keep,
                "truncating redo branch"
            );
            self.snapshots.truncate(keep);
        }

        self.snapshots.push(snapshot);

        if let Some(capacity) = self.capacity {
            if self.snapshots.len() > capacity {
                let evicted = self.snapshots.len() - capacity;
                self.snapshots.drain(..evicted);
                debug!(evicted, capacity, "evicting oldest snapshots");
            }
        }

        self.pointer = Some(self.snapshots.len() - 1);
    }

    /// Step back. `None` when already at the first snapshot or empty.
    pub(crate) fn undo(&mut self) -> Option<Arc<T>> {
        match self.pointer {
            Some(pointer) if pointer > 0 => {
                self.pointer = Some(pointer - 1);
                Some(Arc::clone(&self.snapshots[pointer - 1]))
            }
            _ => None,
        }
    }

    /// Step forward. `None` when already at the last snapshot or empty.
    pub(crate) fn redo(&mut self) -> Option<Arc<T>> {
        match self.pointer {
            Some(pointer) if pointer + 1 < self.snapshots.len() => {
                self.pointer = Some(pointer + 1);
                Some(Arc::clone(&self.snapshots[pointer + 1]))
            }
            _ => None,
        }
    }

    /// Move the pointer to `index` without discarding anything.
    pub(crate) fn jump(&mut self, index: usize) -> Result<Arc<T>> {
        let snapshot = self.snapshots.get(index).ok_or(StateError::OutOfRange {
            index,
            len: self.snapshots.len(),
        })?;
        let snapshot = Arc::clone(snapshot);
        self.pointer = Some(index);
        Ok(snapshot)
    }

    pub(crate) fn clear(&mut self) {
        self.snapshots.clear();
        self.pointer = None;
    }

    pub(crate) fn pointer(&self) -> Option<usize> {
        self.pointer
    }

    pub(crate) fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub(crate) fn can_undo(&self) -> bool {
        matches!(self.pointer, Some(pointer) if pointer > 0)
    }

    pub(crate) fn can_redo(&self) -> bool {
        matches!(self.pointer, Some(pointer) if pointer + 1 < self.snapshots.len())
    }

    pub(crate) fn snapshots(&self) -> Vec<Arc<T>> {
        self.snapshots.clone()
    }
}
