//! Dependency Graph
//!
//! Identity of reactive cells and an inspectable view of how they depend on
//! each other.
//!
//! # Overview
//!
//! The dependency graph is a directed acyclic graph (DAG) where:
//!
//! - Nodes are atoms (primitive) and derived atoms
//! - Edges are dependencies: if B reads A, there is an edge from A to B
//!
//! Propagation never consults this module. Each derived atom subscribes to
//! its dependencies directly when it is built, and changes travel along
//! those subscriptions. [`DependencyGraph`] reconstructs the same picture
//! from the cells' declared dependency lists for debugging tools.
//!
//! Acyclicity holds by construction: a derived atom can only list cells
//! that already exist.

mod node;
mod topology;

pub use node::{AtomId, Node, NodeKind};
pub use topology::DependencyGraph;
