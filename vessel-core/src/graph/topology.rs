//! Dependency Topology
//!
//! A read-only picture of how a set of cells depend on each other, for
//! debugging and inspection tools. Building one has no effect on the cells:
//! propagation is always driven by the subscriptions wired when each
//! derived atom was constructed.
//!
//! # Queries
//!
//! - `dependents_of`: direct readers of a cell.
//! - `affected_by`: every cell a change would reach, breadth-first.
//! - `topological_order`: dependencies before dependents (Kahn's algorithm).

use std::collections::{HashSet, VecDeque};

use indexmap::IndexMap;

use super::node::{AtomId, Node};
use crate::error::Result;
use crate::reactive::Observable;

/// Snapshot of the dependency relationships between cells.
#[derive(Debug, Default, Clone)]
pub struct DependencyGraph {
    /// All nodes, in insertion order.
    nodes: IndexMap<AtomId, Node>,

    /// Reverse edges: for each id, the nodes that read from it.
    dependents: IndexMap<AtomId, Vec<AtomId>>,
}

impl DependencyGraph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from `cells`, in the given order.
    pub fn from_cells(cells: &[&dyn Observable]) -> Self {
        let mut graph = Self::new();
        for cell in cells {
            graph.add(*cell);
        }
        graph
    }

    /// Add a cell. Re-adding a cell replaces nothing and returns its id.
    pub fn add(&mut self, cell: &dyn Observable) -> AtomId {
        self.add_node(cell.node())
    }

    /// Add a node and its dependency edges.
    ///
    /// Dependencies that are not (yet) in the graph still get a reverse
    /// edge, so adding cells in any order yields the same graph.
    pub fn add_node(&mut self, node: Node) -> AtomId {
        let id = node.id();
        if self.nodes.contains_key(&id) {
            return id;
        }
        for dependency in node.dependencies() {
            let readers = self.dependents.entry(*dependency).or_default();
            if !readers.contains(&id) {
                readers.push(id);
            }
        }
        self.nodes.insert(id, node);
        id
    }

    /// Get a reference to a node.
    pub fn get_node(&self, id: AtomId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// All nodes, in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get the total number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Direct dependencies of `id`, in declaration order.
    pub fn dependencies_of(&self, id: AtomId) -> &[AtomId] {
        self.nodes
            .get(&id)
            .map(|node| node.dependencies())
            .unwrap_or_default()
    }

    /// Direct dependents of `id`, in insertion order.
    pub fn dependents_of(&self, id: AtomId) -> &[AtomId] {
        self.dependents
            .get(&id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Every cell transitively downstream of `source`, in breadth-first
    /// order. `source` itself is not included.
    pub fn affected_by(&self, source: AtomId) -> Vec<AtomId> {
        let mut affected = Vec::new();
        let mut visited = HashSet::new();
        let mut queue: VecDeque<AtomId> = self.dependents_of(source).iter().copied().collect();

        while let Some(id) = queue.pop_front() {
            if !visited.insert(id) {
                continue;
            }
            affected.push(id);
            queue.extend(self.dependents_of(id).iter().copied());
        }

        affected
    }

    /// All nodes ordered so that dependencies come before dependents.
    ///
    /// Only edges between nodes in the graph count. Nodes on a cycle (which
    /// the atom API cannot build) are left out.
    pub fn topological_order(&self) -> Vec<AtomId> {
        let mut in_degree: IndexMap<AtomId, usize> = IndexMap::new();
        let mut queue = VecDeque::new();
        let mut result = Vec::with_capacity(self.nodes.len());

        for (id, node) in &self.nodes {
            let degree = node
                .dependencies()
                .iter()
                .filter(|dependency| self.nodes.contains_key(*dependency))
                .count();
            in_degree.insert(*id, degree);
            if degree == 0 {
                queue.push_back(*id);
            }
        }

        // Kahn's algorithm
        while let Some(id) = queue.pop_front() {
            result.push(id);

            for dependent in self.dependents_of(id) {
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree = degree.saturating_sub(1);
                    if *degree == 0 {
                        queue.push_back(*dependent);
                    }
                }
            }
        }

        result
    }

    /// Nodes as a JSON array, in insertion order.
    pub fn to_json(&self) -> Result<String> {
        let nodes: Vec<&Node> = self.nodes.values().collect();
        Ok(serde_json::to_string(&nodes)?)
    }
}
