//! Error types for autonomous jobs.

use syncara_agent::AgentError;
use syncara_core::TransportError;
use syncara_memory::MemoryError;
use syncara_persistence::PersistenceError;
use thiserror::Error;

/// Errors surfaced by a job iteration. The scheduler logs them and keeps
/// going.
#[derive(Error, Debug)]
pub enum AutonomousError {
    #[error("memory error: {0}")]
    Memory(#[from] MemoryError),

    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("content generation failed: {0}")]
    Generation(#[from] AgentError),

    /// No channel id is configured.
    #[error("no channel configured")]
    NoChannel,

    /// No running assistant client to send with.
    #[error("no assistant client available")]
    NoClient,
}

/// Result type alias for autonomous operations.
pub type Result<T> = std::result::Result<T, AutonomousError>;
