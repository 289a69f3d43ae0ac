//! Vessel Core
//!
//! This crate provides a small reactive state container. It implements:
//!
//! - Stores: a single value with merge-or-replace writes, change detection
//!   and synchronous, ordered listener notification
//! - Atoms and derived atoms: reactive cells built on stores, wired into a
//!   dependency graph that recomputes on change
//! - Time-travel history: linear undo/redo over recorded snapshots
//!
//! Everything is synchronous. A write returns after every listener it
//! triggered, directly or through derived atoms, has run.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: stores, atoms, derived atoms and the store factory
//! - `graph`: cell identity and dependency graph inspection
//! - `history`: snapshot timeline and the time-travel wrapper
//! - `error`: the crate's error type
//!
//! # Example
//!
//! ```rust
//! use vessel_core::reactive::{Atom, Derived};
//!
//! // Create an atom
//! let count = Atom::new(0);
//!
//! // Create a derived value
//! let doubled = Derived::new({
//!     let count = count.clone();
//!     move || count.get() * 2
//! }, &[&count]);
//!
//! // React to changes
//! let _sub = doubled.subscribe(|| println!("doubled changed"));
//!
//! // Update the atom; `doubled` recomputes before `set` returns
//! count.set(5);
//! assert_eq!(doubled.get(), 10);
//! ```

pub mod error;
pub mod graph;
pub mod history;
pub mod reactive;

pub use error::{Result, StateError};
