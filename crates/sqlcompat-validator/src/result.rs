//! Per-statement outcomes

use serde::Serialize;
use sqlcompat_core::StatementRecord;
use std::sync::Arc;

/// Outcome of validating one statement against one database
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub statement: Arc<StatementRecord>,
    /// Label of the database the statement ran against
    pub database: String,
    pub success: bool,
    /// `"<label>: <error>"` when the statement failed
    pub error: Option<String>,
}

impl ValidationResult {
    pub fn success(statement: Arc<StatementRecord>, database: impl Into<String>) -> Self {
        Self {
            statement,
            database: database.into(),
            success: true,
            error: None,
        }
    }

    pub fn failure(
        statement: Arc<StatementRecord>,
        database: impl Into<String>,
        error: impl std::fmt::Display,
    ) -> Self {
        let database = database.into();
        let error = format!("{}: {}", database, error);
        Self {
            statement,
            database,
            success: false,
            error: Some(error),
        }
    }
}

/// Counts for one database pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationSummary {
    pub label: String,
    pub total: usize,
    pub failures: usize,
}

impl ValidationSummary {
    pub fn from_results(label: impl Into<String>, results: &[ValidationResult]) -> Self {
        Self {
            label: label.into(),
            total: results.len(),
            failures: results.iter().filter(|r| !r.success).count(),
        }
    }

    pub fn passed(&self) -> bool {
        self.failures == 0
    }
}
