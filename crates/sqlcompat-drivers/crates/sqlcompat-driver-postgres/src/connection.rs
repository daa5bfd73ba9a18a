//! PostgreSQL connection, transaction and prepared statement

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use postgres_native_tls::MakeTlsConnector;
use sqlcompat_core::{
    Connection, PreparedStatement, Result, Savepoint, SavepointSupport, SqlCompatError,
    StatementResult, Transaction, TransactionOptions, Value, validate_savepoint_name,
};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls, Statement};

use crate::params::PgValue;

/// Render a tokio-postgres error with SQLSTATE, detail and hint
pub(crate) fn format_postgres_error(error: &tokio_postgres::Error) -> String {
    let Some(db_error) = error.as_db_error() else {
        return error.to_string();
    };

    let mut message = db_error.message().to_string();
    if let Some(detail) = db_error.detail().filter(|d| !d.trim().is_empty()) {
        message.push_str(&format!(" (detail: {})", detail));
    }
    if let Some(hint) = db_error.hint().filter(|h| !h.trim().is_empty()) {
        message.push_str(&format!(" (hint: {})", hint));
    }
    format!("{} [SQLSTATE {}]", message, db_error.code().code())
}

fn query_error(context: &str, error: &tokio_postgres::Error) -> SqlCompatError {
    SqlCompatError::Query(format!("{}: {}", context, format_postgres_error(error)))
}

fn closed_error() -> SqlCompatError {
    SqlCompatError::Connection("PostgreSQL connection is closed".into())
}

type SharedClient = Arc<Mutex<Option<Client>>>;

async fn batch(client: &SharedClient, sql: &str, context: &str) -> Result<()> {
    let guard = client.lock().await;
    let client = guard.as_ref().ok_or_else(closed_error)?;
    client
        .batch_execute(sql)
        .await
        .map_err(|e| query_error(context, &e))
}

/// Bind `values` to the server-inferred parameter types and run the statement.
///
/// Statements that describe result columns are run as queries, everything
/// else as commands.
async fn run_statement(
    client: &Client,
    statement: &Statement,
    values: &[Value],
) -> Result<StatementResult> {
    let params: Vec<PgValue> = statement
        .params()
        .iter()
        .enumerate()
        .map(|(index, ty)| {
            values
                .get(index)
                .map_or(PgValue::Null, |value| PgValue::for_type(value, ty))
        })
        .collect();
    let refs: Vec<&(dyn ToSql + Sync)> = params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();

    if statement.columns().is_empty() {
        let affected = client
            .execute(statement, &refs)
            .await
            .map_err(|e| query_error("Failed to execute statement", &e))?;
        Ok(StatementResult::affected(affected))
    } else {
        let rows = client
            .query(statement, &refs)
            .await
            .map_err(|e| query_error("Failed to execute query", &e))?;
        Ok(StatementResult::rows(rows.len() as u64))
    }
}

async fn prepare(client: &Client, sql: &str) -> Result<Statement> {
    client
        .prepare(sql)
        .await
        .map_err(|e| query_error("Failed to prepare statement", &e))
}

/// A single PostgreSQL session
pub struct PostgresConnection {
    client: SharedClient,
    closed: Arc<AtomicBool>,
}

impl PostgresConnection {
    /// Open a session. `tls` of `None` connects without TLS.
    pub async fn connect(
        config: tokio_postgres::Config,
        tls: Option<MakeTlsConnector>,
    ) -> Result<Self> {
        let closed = Arc::new(AtomicBool::new(false));
        let connect_error =
            |e: tokio_postgres::Error| SqlCompatError::Connection(format_postgres_error(&e));

        let client = match tls {
            Some(tls) => {
                let (client, connection) = config.connect(tls).await.map_err(connect_error)?;
                spawn_connection(connection, Arc::clone(&closed));
                client
            }
            None => {
                let (client, connection) = config.connect(NoTls).await.map_err(connect_error)?;
                spawn_connection(connection, Arc::clone(&closed));
                client
            }
        };

        Ok(Self {
            client: Arc::new(Mutex::new(Some(client))),
            closed,
        })
    }
}

/// Drive the protocol connection in the background until the client goes away
fn spawn_connection<S, T>(connection: tokio_postgres::Connection<S, T>, closed: Arc<AtomicBool>)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::warn!(error = %e, "PostgreSQL connection terminated");
        }
        closed.store(true, Ordering::SeqCst);
    });
}

#[async_trait]
impl Connection for PostgresConnection {
    fn driver_name(&self) -> &str {
        "postgresql"
    }

    fn dialect_id(&self) -> Option<&'static str> {
        Some("postgresql")
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult> {
        let guard = self.client.lock().await;
        let client = guard.as_ref().ok_or_else(closed_error)?;
        let statement = prepare(client, sql).await?;
        if statement.params().len() != params.len() {
            return Err(SqlCompatError::Query(format!(
                "statement expects {} parameters, got {}",
                statement.params().len(),
                params.len()
            )));
        }
        run_statement(client, &statement, params).await
    }

    async fn begin_transaction(&self, options: TransactionOptions) -> Result<Box<dyn Transaction>> {
        let sql = if options.read_only {
            "BEGIN READ ONLY"
        } else {
            "BEGIN"
        };
        batch(&self.client, sql, "Failed to begin transaction").await?;
        tracing::trace!(read_only = options.read_only, "PostgreSQL transaction begun");

        Ok(Box::new(PostgresTransaction {
            client: Arc::clone(&self.client),
            finished: false,
        }))
    }

    async fn close(&self) -> Result<()> {
        // Dropping the client ends the background connection task
        if self.client.lock().await.take().is_some() {
            tracing::debug!("closing PostgreSQL connection");
        }
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        if self.closed.load(Ordering::SeqCst) {
            return true;
        }
        self.client
            .try_lock()
            .map(|guard| guard.as_ref().is_none_or(Client::is_closed))
            .unwrap_or(false)
    }
}

/// An open transaction on a [`PostgresConnection`].
///
/// Holds no lock between calls; each operation locks the client.
pub struct PostgresTransaction {
    client: SharedClient,
    finished: bool,
}

impl Drop for PostgresTransaction {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        tracing::warn!("PostgreSQL transaction dropped without commit or rollback, rolling back");
        let client = Arc::clone(&self.client);
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                let _ = batch(&client, "ROLLBACK", "Failed to rollback transaction").await;
            });
        }
    }
}

#[async_trait]
impl Transaction for PostgresTransaction {
    async fn commit(mut self: Box<Self>) -> Result<()> {
        batch(&self.client, "COMMIT", "Failed to commit transaction").await?;
        self.finished = true;
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> Result<()> {
        // Leave `finished` unset on failure so Drop retries
        batch(&self.client, "ROLLBACK", "Failed to rollback transaction").await?;
        self.finished = true;
        tracing::trace!("PostgreSQL transaction rolled back");
        Ok(())
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult> {
        let guard = self.client.lock().await;
        let client = guard.as_ref().ok_or_else(closed_error)?;
        let statement = prepare(client, sql).await?;
        run_statement(client, &statement, params).await
    }

    async fn prepare(&self, sql: &str) -> Result<Box<dyn PreparedStatement>> {
        let statement = {
            let guard = self.client.lock().await;
            let client = guard.as_ref().ok_or_else(closed_error)?;
            prepare(client, sql).await?
        };
        let slots = statement.params().len();
        Ok(Box::new(PostgresPreparedStatement {
            client: Arc::clone(&self.client),
            statement,
            values: vec![Value::Null; slots],
        }))
    }

    async fn set_statement_timeout(&self, timeout: Duration) -> Result<()> {
        // 0 would disable the limit
        let millis = timeout.as_millis().max(1);
        batch(
            &self.client,
            &format!("SET LOCAL statement_timeout = {}", millis),
            "Failed to set statement timeout",
        )
        .await
    }

    fn as_savepoint_support(&self) -> Option<&dyn SavepointSupport> {
        Some(self)
    }
}

#[async_trait]
impl SavepointSupport for PostgresTransaction {
    async fn savepoint(&self, name: &str) -> Result<Savepoint> {
        let savepoint = Savepoint::new(name)?;
        batch(
            &self.client,
            &format!("SAVEPOINT {}", savepoint.name()),
            "Failed to create savepoint",
        )
        .await?;
        Ok(savepoint)
    }

    async fn rollback_to_savepoint(&self, name: &str) -> Result<()> {
        validate_savepoint_name(name)?;
        batch(
            &self.client,
            &format!("ROLLBACK TO SAVEPOINT {}", name),
            "Failed to rollback to savepoint",
        )
        .await
    }

    async fn release_savepoint(&self, name: &str) -> Result<()> {
        validate_savepoint_name(name)?;
        batch(
            &self.client,
            &format!("RELEASE SAVEPOINT {}", name),
            "Failed to release savepoint",
        )
        .await
    }
}

/// A server-side prepared statement with positional slots
pub struct PostgresPreparedStatement {
    client: SharedClient,
    statement: Statement,
    values: Vec<Value>,
}

#[async_trait]
impl PreparedStatement for PostgresPreparedStatement {
    fn parameter_count(&self) -> usize {
        self.values.len()
    }

    fn bind(&mut self, position: usize, value: Value) -> Result<()> {
        let count = self.values.len();
        let slot = position
            .checked_sub(1)
            .and_then(|index| self.values.get_mut(index))
            .ok_or_else(|| {
                SqlCompatError::Query(format!(
                    "parameter index {} is out of range (statement has {} parameters)",
                    position, count
                ))
            })?;
        *slot = value;
        Ok(())
    }

    async fn execute(&mut self) -> Result<StatementResult> {
        let guard = self.client.lock().await;
        let client = guard.as_ref().ok_or_else(closed_error)?;
        run_statement(client, &self.statement, &self.values).await
    }
}
