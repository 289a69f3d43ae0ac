//! Time-Travel History
//!
//! Undo/redo over a store's states.
//!
//! # Overview
//!
//! A [`History`] sits on the write path of a store. Every write made through
//! it is resolved against the current state into a *complete* snapshot
//! (partial updates are merged here, not in the store), appended to the
//! timeline, and installed in the store with replace semantics.
//!
//! The timeline is strictly linear:
//!
//! - A write while the pointer is not at the tail discards every snapshot
//!   after the pointer before appending.
//! - `undo` at the first snapshot and `redo` at the last are silent no-ops.
//! - Navigation installs the stored snapshot itself, so the restored state
//!   is exactly what was recorded.
//!
//! The state the store held before the first recorded write is not part
//! of the timeline; undo stops at the first recorded snapshot.

mod options;
mod time_travel;
mod timeline;

pub use options::HistoryOptions;
pub use time_travel::{time_travel, History};
