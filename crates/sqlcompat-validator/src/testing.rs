//! In-memory database doubles for engine and run tests

use async_trait::async_trait;
use parking_lot::Mutex;
use sqlcompat_connection::ConnectionFactory;
use sqlcompat_core::{
    Connection, ParameterSpec, PreparedStatement, Result, Savepoint, SavepointSupport,
    SqlCompatError, StatementKind, StatementRecord, StatementResult, Transaction,
    TransactionOptions, Value,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// What a prepared statement does when executed
#[derive(Debug, Clone, Default)]
pub enum Behavior {
    #[default]
    Accept,
    Fail(String),
    Panic,
    Hang,
    /// Succeed after sleeping
    Delay(Duration),
}

type Script = dyn Fn(&str) -> Behavior + Send + Sync;

/// Everything the mocks saw
#[derive(Debug, Default)]
pub struct Recorder {
    pub connections: AtomicUsize,
    pub savepoints: AtomicUsize,
    pub savepoint_rollbacks: AtomicUsize,
    pub rollbacks: AtomicUsize,
    pub commits: AtomicUsize,
    pub begins: Mutex<Vec<TransactionOptions>>,
    pub timeouts: Mutex<Vec<Duration>>,
    pub prepared: Mutex<Vec<String>>,
    pub bound: Mutex<Vec<Vec<Value>>>,
}

impl Recorder {
    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

/// A connection factory whose statements behave per `script`
#[derive(Clone)]
pub struct MockDatabase {
    pub recorder: Arc<Recorder>,
    script: Arc<Script>,
}

impl MockDatabase {
    pub fn accepting() -> Self {
        Self::scripted(|_| Behavior::Accept)
    }

    pub fn failing(message: &str) -> Self {
        let message = message.to_string();
        Self::scripted(move |_| Behavior::Fail(message.clone()))
    }

    /// Decide each statement's behavior from its final SQL text
    pub fn scripted(script: impl Fn(&str) -> Behavior + Send + Sync + 'static) -> Self {
        Self {
            recorder: Arc::new(Recorder::default()),
            script: Arc::new(script),
        }
    }
}

#[async_trait]
impl ConnectionFactory for MockDatabase {
    async fn create(&self) -> Result<Arc<dyn Connection>> {
        self.recorder.connections.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MockConnection {
            database: self.clone(),
        }))
    }
}

struct MockConnection {
    database: MockDatabase,
}

#[async_trait]
impl Connection for MockConnection {
    fn driver_name(&self) -> &str {
        "mock"
    }

    async fn execute(&self, _sql: &str, _params: &[Value]) -> Result<StatementResult> {
        Ok(StatementResult::affected(0))
    }

    async fn begin_transaction(&self, options: TransactionOptions) -> Result<Box<dyn Transaction>> {
        self.database.recorder.begins.lock().push(options);
        Ok(Box::new(MockTransaction {
            database: self.database.clone(),
        }))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }

    fn is_closed(&self) -> bool {
        false
    }
}

struct MockTransaction {
    database: MockDatabase,
}

#[async_trait]
impl Transaction for MockTransaction {
    async fn commit(self: Box<Self>) -> Result<()> {
        self.database.recorder.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.database.recorder.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn execute(&self, _sql: &str, _params: &[Value]) -> Result<StatementResult> {
        Ok(StatementResult::affected(0))
    }

    async fn prepare(&self, sql: &str) -> Result<Box<dyn PreparedStatement>> {
        self.database.recorder.prepared.lock().push(sql.to_string());
        Ok(Box::new(MockStatement {
            behavior: (self.database.script)(sql),
            recorder: Arc::clone(&self.database.recorder),
            values: Vec::new(),
        }))
    }

    async fn set_statement_timeout(&self, timeout: Duration) -> Result<()> {
        self.database.recorder.timeouts.lock().push(timeout);
        Ok(())
    }

    fn as_savepoint_support(&self) -> Option<&dyn SavepointSupport> {
        Some(self)
    }
}

#[async_trait]
impl SavepointSupport for MockTransaction {
    async fn savepoint(&self, name: &str) -> Result<Savepoint> {
        self.database.recorder.savepoints.fetch_add(1, Ordering::SeqCst);
        Savepoint::new(name)
    }

    async fn rollback_to_savepoint(&self, _name: &str) -> Result<()> {
        self.database
            .recorder
            .savepoint_rollbacks
            .fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn release_savepoint(&self, _name: &str) -> Result<()> {
        Ok(())
    }
}

struct MockStatement {
    behavior: Behavior,
    recorder: Arc<Recorder>,
    values: Vec<Value>,
}

#[async_trait]
impl PreparedStatement for MockStatement {
    fn parameter_count(&self) -> usize {
        self.values.len()
    }

    fn bind(&mut self, position: usize, value: Value) -> Result<()> {
        if position != self.values.len() + 1 {
            return Err(SqlCompatError::Query(format!(
                "out of order bind at position {}",
                position
            )));
        }
        self.values.push(value);
        Ok(())
    }

    async fn execute(&mut self) -> Result<StatementResult> {
        self.recorder.bound.lock().push(self.values.clone());
        match &self.behavior {
            Behavior::Accept => Ok(StatementResult::rows(0)),
            Behavior::Fail(message) => Err(SqlCompatError::Query(message.clone())),
            Behavior::Panic => panic!("mock statement panicked"),
            Behavior::Hang => std::future::pending().await,
            Behavior::Delay(duration) => {
                tokio::time::sleep(*duration).await;
                Ok(StatementResult::rows(0))
            }
        }
    }
}

/// A select record with the given `?` SQL and parameters
pub fn record(id: &str, sql: &str, parameters: Vec<ParameterSpec>) -> Arc<StatementRecord> {
    Arc::new(StatementRecord::new(
        "com.example.UserMapper",
        id,
        StatementKind::Select,
        "/mappers/UserMapper.xml",
        "UserMapper.xml",
        sql,
        parameters,
    ))
}
