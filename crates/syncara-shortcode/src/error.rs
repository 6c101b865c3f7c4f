//! Error types for shortcode registration.

use thiserror::Error;

/// Errors raised while building or using the registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShortcodeError {
    /// Key does not have the `CATEGORY:ACTION` shape.
    #[error("invalid shortcode key: {0}")]
    InvalidKey(String),

    /// A handler is already registered under this key.
    #[error("shortcode already registered: {0}")]
    Duplicate(String),

    /// Registration attempted after the registry was sealed.
    #[error("registry is sealed, cannot register {0}")]
    Sealed(String),

    /// The registry was torn down.
    #[error("registry has been torn down")]
    TornDown,
}

/// Result type alias for shortcode operations.
pub type Result<T> = std::result::Result<T, ShortcodeError>;
