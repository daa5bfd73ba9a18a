//! JSON report and outcome logging

use crate::error::ReportError;
use crate::result::{ValidationResult, ValidationSummary};
use crate::run::RunReport;
use indexmap::IndexMap;
use serde::Serialize;
use sqlcompat_core::StatementKind;
use std::path::{Path, PathBuf};

/// Serialized form of a run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub total: usize,
    pub failures: usize,
    pub databases: Vec<ValidationSummary>,
    /// Entries grouped by database label in first-seen order
    pub entries_by_database: IndexMap<String, Vec<ReportEntry>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportEntry {
    pub id: String,
    pub kind: StatementKind,
    pub file: PathBuf,
    pub database: String,
    pub success: bool,
    pub error: Option<String>,
}

impl From<&ValidationResult> for ReportEntry {
    fn from(result: &ValidationResult) -> Self {
        Self {
            id: result.statement.full_id(),
            kind: result.statement.kind(),
            file: result.statement.source_file().to_path_buf(),
            database: result.database.clone(),
            success: result.success,
            error: result.error.clone(),
        }
    }
}

impl ValidationReport {
    pub fn from_run(run: &RunReport) -> Self {
        let mut entries_by_database: IndexMap<String, Vec<ReportEntry>> = IndexMap::new();
        for result in &run.results {
            entries_by_database
                .entry(result.database.clone())
                .or_default()
                .push(ReportEntry::from(result));
        }

        Self {
            total: run.total(),
            failures: run.failures(),
            databases: run.summaries().cloned().collect(),
            entries_by_database,
        }
    }

    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Write the report, creating parent directories.
    ///
    /// Returns the absolute path written.
    pub fn write_to(&self, path: &Path) -> Result<PathBuf, ReportError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| ReportError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, self.to_json()?).map_err(|source| ReportError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf()))
    }
}

/// Write the report when a path is configured. Failures are logged only.
pub fn write_report(run: &RunReport, path: Option<&Path>) -> Option<PathBuf> {
    let path = path?;
    match ValidationReport::from_run(run).write_to(path) {
        Ok(written) => {
            tracing::info!("Wrote validation report to {}", written.display());
            Some(written)
        }
        Err(err) => {
            tracing::warn!("Failed to write report: {}", err);
            None
        }
    }
}

/// Log the per-database summary and one line per statement
pub fn log_outcome(run: &RunReport) {
    tracing::info!("Validation summary:");
    for summary in run.summaries() {
        tracing::info!(
            " - {}: {} failure(s) out of {}",
            summary.label,
            summary.failures,
            summary.total
        );
    }
    if run.target.is_none() {
        tracing::info!(" - target: skipped");
    }

    for result in &run.results {
        let statement = &result.statement;
        if result.success {
            tracing::info!(
                "OK   {} ({}) [{}]",
                statement.full_id(),
                statement.kind(),
                result.database
            );
        } else {
            tracing::error!(
                "FAIL {} ({}) [{}] {}",
                statement.full_id(),
                statement.kind(),
                result.database,
                result.error.as_deref().unwrap_or_default()
            );
        }
    }
}
