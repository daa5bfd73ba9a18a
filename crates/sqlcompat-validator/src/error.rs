//! Validator error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors that end a validation run early
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Validation interrupted for {label}")]
    Interrupted { label: String },
}

/// Errors writing the JSON report
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to create report directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write report {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}
