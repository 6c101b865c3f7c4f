//! Error types for the agent crate.

use thiserror::Error;

/// Errors that can occur while building prompts or calling the model.
#[derive(Error, Debug)]
pub enum AgentError {
    /// The persona template references a placeholder the assembler does not know.
    #[error("prompt assembly failed: unknown placeholder {{{0}}}")]
    PromptAssembly(String),

    #[error("unknown persona: {0}")]
    UnknownPersona(String),

    /// Connection-level failure; the gateway retries these once.
    #[error("network error: {0}")]
    Network(String),

    /// The inference service answered with an error.
    #[error("model invocation failed: {0}")]
    ModelInvocation(String),

    #[error("failed to parse response: {0}")]
    ResponseParse(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AgentError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

/// Result type for agent operations.
pub type Result<T> = std::result::Result<T, AgentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AgentError::PromptAssembly("mood".into());
        assert_eq!(err.to_string(), "prompt assembly failed: unknown placeholder {mood}");
        assert!(AgentError::Network("reset".into()).is_retryable());
        assert!(!AgentError::ModelInvocation("500".into()).is_retryable());
    }
}
