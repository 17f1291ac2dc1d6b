//! Error types for tomtimer-core

use thiserror::Error;

/// Result type alias using tomtimer-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in tomtimer-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Task not found
    #[error("Task not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
