//! Error types for the memory crate.

use syncara_models::UserId;
use thiserror::Error;

/// Errors that can occur in memory operations.
#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("unknown user: {0}")]
    UnknownUser(UserId),

    #[error("storage error: {0}")]
    Storage(#[from] syncara_persistence::PersistenceError),
}

/// Result type for memory operations.
pub type Result<T> = std::result::Result<T, MemoryError>;
