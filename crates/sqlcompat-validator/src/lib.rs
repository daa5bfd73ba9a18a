//! sqlcompat validator - runs resolved mapper statements against databases
//!
//! - `SampleValueGenerator` - typed sample values for bind parameters
//! - `rewrite_placeholders` - dialect bind markers
//! - `ValidationEngine` - one bounded, cancellable pass per database
//! - `run_validation` - origin pass, then target pass when origin is clean
//! - `ValidationReport` - JSON report of a run

mod engine;
mod error;
mod generator;
mod placeholders;
mod report;
mod result;
mod run;

#[cfg(test)]
mod testing;
#[cfg(test)]
mod tests;

pub use engine::{
    DEFAULT_CONCURRENCY, DEFAULT_STATEMENT_TIMEOUT, DatabasePass, DatabaseTarget, SAVEPOINT_NAME,
    ValidationEngine, ValidationOptions,
};
pub use error::{ReportError, ValidationError};
pub use generator::SampleValueGenerator;
pub use placeholders::{RewrittenSql, count_placeholders, rewrite_placeholders};
pub use report::{ReportEntry, ValidationReport, log_outcome, write_report};
pub use result::{ValidationResult, ValidationSummary};
pub use run::{RunReport, run_validation};
pub use tokio_util::sync::CancellationToken;
