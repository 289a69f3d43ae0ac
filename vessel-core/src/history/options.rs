//! History configuration.

use serde::{Deserialize, Serialize};

/// Options for a time-travel history.
///
/// Deserializable so a host can keep it in its own configuration file;
/// missing fields take their defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryOptions {
    /// Maximum number of snapshots kept. When a write would exceed it, the
    /// oldest snapshot is evicted. `None` keeps everything; zero is
    /// treated as one.
    pub capacity: Option<usize>,
}

impl HistoryOptions {
    /// Unbounded history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `capacity` snapshots. Clamped to at least one.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity.max(1));
        self
    }
}
