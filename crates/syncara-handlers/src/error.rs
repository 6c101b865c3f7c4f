//! Error types for the handler library.

use syncara_autonomous::AutonomousError;
use syncara_core::TransportError;
use syncara_memory::MemoryError;
use syncara_persistence::PersistenceError;
use thiserror::Error;

/// Errors raised inside a handler body. They never reach the dispatcher;
/// [`settle`](crate::settle) turns them into a failed outcome.
#[derive(Error, Debug)]
pub enum HandlerError {
    /// Missing or malformed shortcode params.
    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Owner-only action requested by someone else.
    #[error("owner only")]
    NotOwner,

    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("memory error: {0}")]
    Memory(#[from] MemoryError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("channel error: {0}")]
    Channel(#[from] AutonomousError),

    #[error("image service error: {0}")]
    Image(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl HandlerError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidParams(msg.into())
    }
}

/// Result type alias for handler bodies.
pub type Result<T> = std::result::Result<T, HandlerError>;
