//! Common error types for Hermon

use thiserror::Error;

/// Common result type for Hermon operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across Hermon crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON column could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Unique field already taken (e.g. email)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Optimistic write lost against a concurrent writer
    #[error("Version conflict on {0}")]
    VersionConflict(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}
