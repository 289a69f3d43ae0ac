//! Graph Nodes
//!
//! Identity and kind of every reactive cell that can take part in the
//! dependency graph.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Unique identifier for a store, atom or derived atom.
///
/// Every `Store` draws one on construction; atoms and derived atoms reuse
/// the id of the store they own, so an id names a cell for its whole life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AtomId(u64);

impl AtomId {
    /// Generate a new unique id.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw id value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for AtomId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<u64> for AtomId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for AtomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The kind of node in the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// A writable atom. Roots of the graph: no dependencies, only dependents.
    Primitive,

    /// A derived atom. Has dependencies and may have dependents.
    Derived,
}

/// A node as seen by the graph: its id, kind, optional label and the ids
/// it reads from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    id: AtomId,
    kind: NodeKind,
    name: Option<String>,
    dependencies: Vec<AtomId>,
}

impl Node {
    pub fn new(id: AtomId, kind: NodeKind, name: Option<String>, dependencies: Vec<AtomId>) -> Self {
        Self {
            id,
            kind,
            name,
            dependencies,
        }
    }

    pub fn id(&self) -> AtomId {
        self.id
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Ids this node reads from, in declaration order.
    pub fn dependencies(&self) -> &[AtomId] {
        &self.dependencies
    }
}
