//! Savepoint support for database transactions
//!
//! Validation wraps every statement in a savepoint so a failing statement
//! can be undone without tearing down the surrounding transaction first.

use crate::{Result, SqlCompatError};
use async_trait::async_trait;

/// Longest identifier PostgreSQL keeps without truncation
const MAX_SAVEPOINT_NAME_LEN: usize = 63;

/// A savepoint within a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Savepoint {
    name: String,
}

impl Savepoint {
    /// Create a savepoint handle after checking the name is a plain identifier.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_savepoint_name(&name)?;
        Ok(Self { name })
    }

    /// Get the name of the savepoint.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Check that a savepoint name can be interpolated into SQL unquoted.
///
/// Names must start with a letter or underscore, contain only ASCII
/// alphanumerics and underscores, and fit in an identifier.
pub fn validate_savepoint_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if !valid_start || !valid_rest || name.len() > MAX_SAVEPOINT_NAME_LEN {
        return Err(SqlCompatError::Query(format!(
            "invalid savepoint name '{}'",
            name
        )));
    }
    Ok(())
}

/// Trait for transactions that support savepoints.
///
/// # Example
/// ```ignore
/// let tx = conn.begin_transaction(TransactionOptions::read_only()).await?;
/// let savepoints = tx.as_savepoint_support().expect("savepoints");
///
/// savepoints.savepoint("sql_valid").await?;
/// let outcome = tx.execute("SELECT 1", &[]).await;
/// savepoints.rollback_to_savepoint("sql_valid").await?;
///
/// tx.rollback().await?;
/// ```
#[async_trait]
pub trait SavepointSupport: Send + Sync {
    /// Create a savepoint with the given name.
    ///
    /// # Errors
    /// Returns an error if the name is invalid or the database rejects it.
    async fn savepoint(&self, name: &str) -> Result<Savepoint>;

    /// Rollback to a previously created savepoint.
    ///
    /// All changes made after the savepoint was created are undone. The
    /// savepoint itself remains valid and can be rolled back to again.
    async fn rollback_to_savepoint(&self, name: &str) -> Result<()>;

    /// Release (delete) a savepoint.
    async fn release_savepoint(&self, name: &str) -> Result<()>;

    /// Check if the transaction supports savepoints.
    fn supports_savepoints(&self) -> bool {
        true
    }
}
