//! Per-database validation pass
//!
//! Every statement runs as an independent unit on a pooled connection:
//! a transaction is opened, savepoint `sql_valid` is set, the statement is
//! prepared with sample values and executed (or EXPLAINed), and everything
//! is rolled back. Nothing is ever committed.

use crate::error::ValidationError;
use crate::generator::SampleValueGenerator;
use crate::placeholders::rewrite_placeholders;
use crate::result::{ValidationResult, ValidationSummary};
use futures::{FutureExt, StreamExt, stream};
use sqlcompat_connection::{ConnectionFactory, ConnectionPool, PoolConfig};
use sqlcompat_core::{
    DialectInfo, Result, SqlCompatError, StatementRecord, Transaction, TransactionOptions,
};
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Savepoint every statement is rolled back to
pub const SAVEPOINT_NAME: &str = "sql_valid";

pub const DEFAULT_STATEMENT_TIMEOUT: Duration = Duration::from_secs(8);

pub const DEFAULT_CONCURRENCY: usize = 4;

/// How statements are validated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOptions {
    /// Run statements for real in a read-write transaction instead of EXPLAIN
    pub execute: bool,
    /// Per-statement limit. Zero disables it.
    pub statement_timeout: Duration,
    pub concurrency: usize,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            execute: false,
            statement_timeout: DEFAULT_STATEMENT_TIMEOUT,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl ValidationOptions {
    /// Number of statements in flight, never less than one
    pub fn width(&self) -> usize {
        self.concurrency.max(1)
    }

    fn transaction_options(&self) -> TransactionOptions {
        if self.execute {
            TransactionOptions::read_write()
        } else {
            TransactionOptions::read_only()
        }
    }
}

/// A database to validate against
#[derive(Clone)]
pub struct DatabaseTarget {
    /// `origin` or `target`
    pub label: String,
    /// Connection string with the password redacted
    pub display: String,
    pub dialect: DialectInfo,
    pub factory: Arc<dyn ConnectionFactory>,
}

impl DatabaseTarget {
    pub fn new(
        label: impl Into<String>,
        display: impl Into<String>,
        dialect: DialectInfo,
        factory: impl ConnectionFactory,
    ) -> Self {
        Self {
            label: label.into(),
            display: display.into(),
            dialect,
            factory: Arc::new(factory),
        }
    }
}

impl fmt::Debug for DatabaseTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseTarget")
            .field("label", &self.label)
            .field("display", &self.display)
            .field("dialect", &self.dialect.id)
            .finish_non_exhaustive()
    }
}

/// Results of one database pass, in statement order
#[derive(Debug, Clone)]
pub struct DatabasePass {
    pub summary: ValidationSummary,
    pub results: Vec<ValidationResult>,
}

pub struct ValidationEngine {
    options: ValidationOptions,
}

impl ValidationEngine {
    pub fn new(options: ValidationOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ValidationOptions {
        &self.options
    }

    /// Validate every statement against one database.
    ///
    /// Results come back in the order of `statements`, whatever order the
    /// units finish in. Cancelling `cancel` drops the in-flight units and
    /// fails the pass. The pool is closed on every path.
    #[tracing::instrument(skip_all, fields(database = %target.label))]
    pub async fn validate_database(
        &self,
        target: &DatabaseTarget,
        statements: &[Arc<StatementRecord>],
        cancel: &CancellationToken,
    ) -> std::result::Result<DatabasePass, ValidationError> {
        let width = self.options.width();
        tracing::info!(
            "Validating against {} database: {} with {} thread(s)",
            target.label,
            target.display,
            width
        );

        let pool = ConnectionPool::new(PoolConfig::for_width(width), Arc::clone(&target.factory));
        let generator = SampleValueGenerator::new();
        let outcome = self
            .run_pass(&pool, target, &generator, statements, cancel)
            .await;
        pool.close().await;
        outcome
    }

    async fn run_pass(
        &self,
        pool: &ConnectionPool,
        target: &DatabaseTarget,
        generator: &SampleValueGenerator,
        statements: &[Arc<StatementRecord>],
        cancel: &CancellationToken,
    ) -> std::result::Result<DatabasePass, ValidationError> {
        let units = stream::iter(statements.iter().cloned())
            .map(|statement| self.validate_unit(pool, target, generator, statement))
            .buffered(self.options.width());
        let mut units = std::pin::pin!(units);

        let mut results = Vec::with_capacity(statements.len());
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::warn!(completed = results.len(), "validation cancelled");
                    return Err(ValidationError::Interrupted {
                        label: target.label.clone(),
                    });
                }
                next = units.next() => match next {
                    Some(result) => results.push(result),
                    None => break,
                },
            }
        }

        Ok(DatabasePass {
            summary: ValidationSummary::from_results(&target.label, &results),
            results,
        })
    }

    /// One statement, with panics turned into a failed result
    async fn validate_unit(
        &self,
        pool: &ConnectionPool,
        target: &DatabaseTarget,
        generator: &SampleValueGenerator,
        statement: Arc<StatementRecord>,
    ) -> ValidationResult {
        let unit = AssertUnwindSafe(self.validate_statement(pool, target, generator, &statement))
            .catch_unwind()
            .await;

        match unit {
            Ok(Ok(())) => {
                tracing::debug!(statement = %statement.full_id(), "statement accepted");
                ValidationResult::success(statement, &target.label)
            }
            Ok(Err(err)) => {
                tracing::debug!(statement = %statement.full_id(), error = %err, "statement rejected");
                ValidationResult::failure(statement, &target.label, err)
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::error!(statement = %statement.full_id(), panic = %message, "validation unit panicked");
                ValidationResult::failure(
                    statement,
                    &target.label,
                    format!("validation task panicked: {}", message),
                )
            }
        }
    }

    async fn validate_statement(
        &self,
        pool: &ConnectionPool,
        target: &DatabaseTarget,
        generator: &SampleValueGenerator,
        statement: &StatementRecord,
    ) -> Result<()> {
        let connection = pool.get().await?;
        let tx = connection
            .begin_transaction(self.options.transaction_options())
            .await?;

        let outcome = self
            .run_in_savepoint(tx.as_ref(), target, generator, statement)
            .await;

        if let Err(err) = tx.rollback().await {
            tracing::warn!(statement = %statement.full_id(), error = %err, "transaction rollback failed");
        }
        outcome
    }

    async fn run_in_savepoint(
        &self,
        tx: &dyn Transaction,
        target: &DatabaseTarget,
        generator: &SampleValueGenerator,
        statement: &StatementRecord,
    ) -> Result<()> {
        let savepoints = tx.as_savepoint_support().ok_or_else(|| {
            SqlCompatError::NotSupported(format!(
                "{} transactions do not support savepoints",
                target.dialect.display_name
            ))
        })?;
        savepoints.savepoint(SAVEPOINT_NAME).await?;

        let outcome = self.execute_statement(tx, target, generator, statement).await;

        match savepoints.rollback_to_savepoint(SAVEPOINT_NAME).await {
            Ok(()) => outcome,
            Err(err) => {
                tracing::warn!(statement = %statement.full_id(), error = %err, "rollback to savepoint failed");
                outcome.and(Err(err))
            }
        }
    }

    async fn execute_statement(
        &self,
        tx: &dyn Transaction,
        target: &DatabaseTarget,
        generator: &SampleValueGenerator,
        statement: &StatementRecord,
    ) -> Result<()> {
        let rewritten = rewrite_placeholders(statement.resolved_sql(), target.dialect.placeholder_style);
        if rewritten.markers != statement.parameters().len() {
            tracing::debug!(
                statement = %statement.full_id(),
                markers = rewritten.markers,
                parameters = statement.parameters().len(),
                "marker count differs from parameter count"
            );
        }

        let sql = if self.options.execute {
            rewritten.sql
        } else {
            target.dialect.explain_config.format_explain(&rewritten.sql)
        };

        let timeout = self.options.statement_timeout;
        if timeout.is_zero() {
            return prepare_and_execute(tx, generator, statement, &sql).await;
        }

        tx.set_statement_timeout(timeout).await?;
        match tokio::time::timeout(timeout, prepare_and_execute(tx, generator, statement, &sql)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(SqlCompatError::Timeout(format!(
                "statement did not finish within {:?}",
                timeout
            ))),
        }
    }
}

async fn prepare_and_execute(
    tx: &dyn Transaction,
    generator: &SampleValueGenerator,
    statement: &StatementRecord,
    sql: &str,
) -> Result<()> {
    let mut prepared = tx.prepare(sql).await?;
    generator.bind(prepared.as_mut(), statement.parameters())?;
    prepared.execute().await?;
    Ok(())
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
