//! Origin then target validation

use crate::engine::{DatabaseTarget, ValidationEngine};
use crate::error::ValidationError;
use crate::result::{ValidationResult, ValidationSummary};
use sqlcompat_core::StatementRecord;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Everything a run recorded
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Origin results followed by target results
    pub results: Vec<ValidationResult>,
    pub origin: ValidationSummary,
    /// `None` when the target pass was skipped
    pub target: Option<ValidationSummary>,
}

impl RunReport {
    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn failures(&self) -> usize {
        self.results.iter().filter(|r| !r.success).count()
    }

    pub fn passed(&self) -> bool {
        self.failures() == 0
    }

    pub fn summaries(&self) -> impl Iterator<Item = &ValidationSummary> {
        std::iter::once(&self.origin).chain(self.target.as_ref())
    }

    pub fn failed_results(&self) -> impl Iterator<Item = &ValidationResult> {
        self.results.iter().filter(|r| !r.success)
    }
}

/// Validate against the origin database, then the target.
///
/// The target pass only runs when every statement passed on the origin.
pub async fn run_validation(
    engine: &ValidationEngine,
    origin: &DatabaseTarget,
    target: &DatabaseTarget,
    statements: &[Arc<StatementRecord>],
    cancel: &CancellationToken,
) -> Result<RunReport, ValidationError> {
    tracing::info!("Found {} mapped statements. Validating...", statements.len());

    let origin_pass = engine.validate_database(origin, statements, cancel).await?;
    let mut results = origin_pass.results;

    let target_summary = if origin_pass.summary.passed() {
        let target_pass = engine.validate_database(target, statements, cancel).await?;
        results.extend(target_pass.results);
        Some(target_pass.summary)
    } else {
        tracing::warn!("Skipping target database validation because origin database had failures.");
        None
    };

    Ok(RunReport {
        results,
        origin: origin_pass.summary,
        target: target_summary,
    })
}
