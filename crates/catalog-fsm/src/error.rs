//! Error types for the catalog state machine.

use catalog_state::StateError;
use thiserror::Error;

/// Result type alias for state machine operations.
pub type FsmResult<T> = Result<T, FsmError>;

/// Errors that can occur while applying log entries or snapshots.
#[derive(Debug, Error)]
pub enum FsmError {
    #[error("log entry {index} is not after last applied index {last_applied}")]
    OutOfOrder { index: u64, last_applied: u64 },

    #[error(transparent)]
    State(#[from] StateError),

    #[error("snapshot codec error: {0}")]
    Codec(#[from] serde_json::Error),
}
