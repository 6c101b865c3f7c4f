//! Error types for the persistence layer.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while reading or writing the document store.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Failed to read a file.
    #[error("failed to read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a file.
    #[error("failed to write {path}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to create a directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A document with the same key already exists.
    #[error("duplicate key in {collection}: {key}")]
    DuplicateKey { collection: String, key: String },

    /// Document not found.
    #[error("{collection} not found: {key}")]
    NotFound { collection: String, key: String },
}

/// Result type for persistence operations.
pub type Result<T> = std::result::Result<T, PersistenceError>;
