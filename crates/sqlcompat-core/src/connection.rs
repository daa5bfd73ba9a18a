//! Connection trait and transaction handling

use crate::{Result, SavepointSupport, StatementResult, Value};
use async_trait::async_trait;
use std::time::Duration;

/// Options applied when a transaction is opened
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionOptions {
    /// Open the transaction in read-only access mode
    pub read_only: bool,
}

impl TransactionOptions {
    pub const fn read_only() -> Self {
        Self { read_only: true }
    }

    pub const fn read_write() -> Self {
        Self { read_only: false }
    }
}

/// A database connection
#[async_trait]
pub trait Connection: Send + Sync {
    /// Get the driver name (e.g., "postgresql")
    fn driver_name(&self) -> &str;

    /// Get the dialect identifier for this connection (e.g., "postgresql")
    ///
    /// Used to look up dialect-specific behavior like placeholder markers
    /// and EXPLAIN syntax. Returns None if the dialect is unknown.
    fn dialect_id(&self) -> Option<&'static str> {
        None
    }

    /// Execute a statement outside of any explicit transaction
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult>;

    /// Begin a transaction. Auto-commit is off until it ends.
    async fn begin_transaction(&self, options: TransactionOptions) -> Result<Box<dyn Transaction>>;

    /// Close the connection
    async fn close(&self) -> Result<()>;

    /// Check if the connection is closed
    fn is_closed(&self) -> bool;
}

/// A database transaction
#[async_trait]
pub trait Transaction: Send + Sync {
    /// Commit the transaction
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Rollback the transaction
    async fn rollback(self: Box<Self>) -> Result<()>;

    /// Execute a statement within the transaction
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult>;

    /// Prepare a statement for positional binding within the transaction
    async fn prepare(&self, sql: &str) -> Result<Box<dyn PreparedStatement>>;

    /// Limit how long any single statement in this transaction may run.
    ///
    /// The limit is scoped to the transaction and disappears with it.
    async fn set_statement_timeout(&self, timeout: Duration) -> Result<()>;

    /// Get savepoint support if the transaction has it
    fn as_savepoint_support(&self) -> Option<&dyn SavepointSupport> {
        None
    }
}

/// A prepared statement with positional parameter slots
#[async_trait]
pub trait PreparedStatement: Send + Sync {
    /// Number of parameter slots the server reported for the statement
    fn parameter_count(&self) -> usize;

    /// Bind a value to a 1-based parameter position
    fn bind(&mut self, position: usize, value: Value) -> Result<()>;

    /// Execute with the values bound so far. Unbound slots are sent as NULL.
    async fn execute(&mut self) -> Result<StatementResult>;
}
