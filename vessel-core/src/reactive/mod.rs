//! Reactive Primitives
//!
//! This module implements the state container and the reactive cells built
//! on it: stores, atoms and derived atoms.
//!
//! # Concepts
//!
//! ## Stores
//!
//! A Store holds one value and a set of listeners. Writes either replace
//! the value or shallow-merge a partial update into it. When, and only
//! when, the value changes, every listener is called with the new and the
//! previous value.
//!
//! ## Atoms
//!
//! An Atom is a single-value cell with its own store. Its listeners take no
//! arguments; they re-read the atom if they need the value.
//!
//! ## Derived Atoms
//!
//! A Derived atom caches a computation over a fixed list of atoms (or other
//! derived atoms) and recomputes it whenever one of them notifies.
//!
//! # Implementation Notes
//!
//! Dependencies are declared explicitly when a derived atom is built; there
//! is no automatic tracking of reads. Everything runs synchronously on the
//! calling thread: a write returns only after every listener, including
//! every derived atom downstream, has run.

mod atom;
mod derived;
mod listener;
mod patch;
mod store;

pub use atom::{Atom, Notify, Observable, Readable};
pub use derived::Derived;
pub use listener::{ListenerId, Subscription};
pub use patch::{Merge, Patch};
pub use store::{create, GetState, SetState, Store};

pub(crate) use store::{create_with_writer, StoreInner, WriteState};
