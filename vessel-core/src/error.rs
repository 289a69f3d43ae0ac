//! Error types.
//!
//! Almost every operation in this crate is total: reads never fail, writes
//! either change the state or are no-ops, and undo/redo past either end of
//! the history is silently ignored. The variants below cover the few edges
//! that can genuinely go wrong.

use thiserror::Error;

/// Errors produced by the state container.
#[derive(Debug, Error)]
pub enum StateError {
    /// A `SetState`/`GetState` handle was used while its store did not
    /// exist: either the initializer has not returned yet, or every owner
    /// of the store has been dropped.
    #[error("state handle is detached from its store")]
    Detached,

    /// `History::jump` was asked for a snapshot that is not recorded.
    #[error("snapshot index {index} out of range (history length {len})")]
    OutOfRange { index: usize, len: usize },

    /// Exporting the snapshot sequence to JSON failed.
    #[error("failed to encode snapshots as JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Exporting the snapshot sequence to MessagePack failed.
    #[error("failed to encode snapshots as MessagePack: {0}")]
    MessagePack(#[from] rmp_serde::encode::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_message_names_index_and_len() {
        let err = StateError::OutOfRange { index: 7, len: 3 };
        assert_eq!(
            err.to_string(),
            "snapshot index 7 out of range (history length 3)"
        );
    }

    #[test]
    fn detached_message() {
        assert_eq!(
            StateError::Detached.to_string(),
            "state handle is detached from its store"
        );
    }
}
