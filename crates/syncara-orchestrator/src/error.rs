//! Error types for the orchestrator.

use thiserror::Error;

/// Orchestrator-specific errors.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Agent error: {0}")]
    Agent(#[from] syncara_agent::AgentError),

    #[error("Memory error: {0}")]
    Memory(#[from] syncara_memory::MemoryError),

    #[error("Transport error: {0}")]
    Transport(#[from] syncara_core::TransportError),

    /// No assistant with this id is configured.
    #[error("Unknown assistant: {0}")]
    UnknownAssistant(String),

    #[error("Assistant already running: {0}")]
    AlreadyRunning(String),

    #[error("Assistant not running: {0}")]
    NotRunning(String),

    /// The assistant was stopped and cannot start again in this process.
    #[error("Assistant {0} was stopped; restart the process to start it again")]
    StoppedForProcess(String),

    /// The manager has been shut down.
    #[error("Assistant manager is shut down")]
    ShutDown,

    /// The session could not be brought up.
    #[error("Failed to launch {assistant}: {message}")]
    Launch { assistant: String, message: String },
}

/// Result type for orchestrator operations.
pub type Result<T> = std::result::Result<T, OrchestratorError>;
