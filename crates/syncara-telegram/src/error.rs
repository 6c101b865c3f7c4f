//! Error types for the Telegram layer.

use thiserror::Error;

/// Errors that can occur while wiring or running the bots.
#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("Configuration error: {0}")]
    Config(#[from] syncara_core::ConfigError),

    /// A bot could not log in or start polling.
    #[error("Failed to start bot: {0}")]
    BotStartFailed(String),

    #[error("Storage error: {0}")]
    Persistence(#[from] syncara_persistence::PersistenceError),

    #[error("Handler error: {0}")]
    Handler(#[from] syncara_handlers::HandlerError),

    #[error("Shortcode registry error: {0}")]
    Registry(#[from] syncara_shortcode::ShortcodeError),
}

/// Result type for Telegram operations.
pub type Result<T> = std::result::Result<T, TelegramError>;
