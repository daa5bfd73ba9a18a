//! Error types for sqlcompat

use thiserror::Error;

/// Core error type for database-facing operations
#[derive(Error, Debug)]
pub enum SqlCompatError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Security error: {0}")]
    Security(String),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Timeout: {0}")]
    Timeout(String),
}

/// Result type alias for sqlcompat operations
pub type Result<T> = std::result::Result<T, SqlCompatError>;
