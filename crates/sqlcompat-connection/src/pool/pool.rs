//! Bounded connection pool

use std::collections::VecDeque;
use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Instant;

use async_trait::async_trait;
use parking_lot::Mutex;
use sqlcompat_core::{Connection, Result, SqlCompatError};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use super::config::PoolConfig;
use super::stats::PoolStats;

/// Opens new connections for a pool
#[async_trait]
pub trait ConnectionFactory: Send + Sync + 'static {
    async fn create(&self) -> Result<Arc<dyn Connection>>;

    /// Whether an idle connection may be handed out again
    async fn validate(&self, conn: &dyn Connection) -> bool {
        !conn.is_closed()
    }
}

#[async_trait]
impl<T: ConnectionFactory + ?Sized> ConnectionFactory for Arc<T> {
    async fn create(&self) -> Result<Arc<dyn Connection>> {
        (**self).create().await
    }

    async fn validate(&self, conn: &dyn Connection) -> bool {
        (**self).validate(conn).await
    }
}

struct IdleConnection {
    connection: Arc<dyn Connection>,
    created_at: Instant,
    returned_at: Instant,
}

/// A pool of at most `max_size` live connections.
///
/// Borrowed connections go back to the idle queue when their
/// [`PooledConnection`] is dropped.
pub struct ConnectionPool {
    config: PoolConfig,
    factory: Arc<dyn ConnectionFactory>,
    idle: Mutex<VecDeque<IdleConnection>>,
    semaphore: Arc<Semaphore>,
    active_count: AtomicUsize,
    waiting_count: AtomicUsize,
    closed: AtomicBool,
}

impl ConnectionPool {
    pub fn new<F: ConnectionFactory>(config: PoolConfig, factory: F) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_size()));
        Self {
            config,
            factory: Arc::new(factory),
            idle: Mutex::new(VecDeque::new()),
            semaphore,
            active_count: AtomicUsize::new(0),
            waiting_count: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Borrow a connection, reusing an idle one when possible.
    ///
    /// Waits up to the configured acquire timeout for a free slot. Fails
    /// once the pool has been closed.
    pub async fn get(&self) -> Result<PooledConnection<'_>> {
        if self.is_closed() {
            return Err(SqlCompatError::Connection("Pool is closed".into()));
        }
        self.waiting_count.fetch_add(1, Ordering::SeqCst);

        let result = tokio::time::timeout(self.config.acquire_timeout(), async {
            let permit = self
                .semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| SqlCompatError::Connection("Pool is closed".into()))?;

            let (connection, created_at) = match self.try_get_idle().await {
                Some(idle) => idle,
                None => (self.factory.create().await?, Instant::now()),
            };
            Ok((connection, created_at, permit))
        })
        .await;

        self.waiting_count.fetch_sub(1, Ordering::SeqCst);

        match result {
            Ok(Ok((connection, created_at, permit))) => {
                self.active_count.fetch_add(1, Ordering::SeqCst);
                Ok(PooledConnection {
                    connection,
                    created_at,
                    pool: self,
                    _permit: permit,
                })
            }
            Ok(Err(err)) => Err(err),
            Err(_) => Err(SqlCompatError::Timeout(format!(
                "Timed out waiting for connection (timeout: {:?})",
                self.config.acquire_timeout()
            ))),
        }
    }

    async fn try_get_idle(&self) -> Option<(Arc<dyn Connection>, Instant)> {
        loop {
            let candidate = self.idle.lock().pop_front()?;

            let expired = self
                .config
                .max_lifetime()
                .is_some_and(|max| candidate.created_at.elapsed() > max);
            let stale = candidate.returned_at.elapsed() > self.config.idle_timeout();

            if expired || stale || !self.factory.validate(&*candidate.connection).await {
                tracing::debug!(expired, stale, "discarding pooled connection");
                let _ = candidate.connection.close().await;
                continue;
            }

            return Some((candidate.connection, candidate.created_at));
        }
    }

    fn return_connection(&self, connection: Arc<dyn Connection>, created_at: Instant) {
        self.active_count.fetch_sub(1, Ordering::SeqCst);

        if connection.is_closed() {
            return;
        }

        if self.is_closed() {
            // Nothing will borrow it again
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    let _ = connection.close().await;
                });
            }
            return;
        }

        self.idle.lock().push_back(IdleConnection {
            connection,
            created_at,
            returned_at: Instant::now(),
        });
    }

    pub fn stats(&self) -> PoolStats {
        let idle = self.idle.lock().len();
        let active = self.active_count.load(Ordering::SeqCst);
        let waiting = self.waiting_count.load(Ordering::SeqCst);
        PoolStats::new(idle + active, idle, active, waiting)
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Close every idle connection. Borrowed connections are unaffected.
    pub async fn close_idle(&self) {
        let connections: Vec<_> = self.idle.lock().drain(..).collect();
        for idle in connections {
            if let Err(err) = idle.connection.close().await {
                tracing::debug!(error = %err, "failed to close idle connection");
            }
        }
    }

    /// Shut the pool down.
    ///
    /// Pending and future `get` calls fail. Idle connections are closed now;
    /// borrowed ones are closed as they come back.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.semaphore.close();
        self.close_idle().await;
        tracing::debug!(stats = ?self.stats(), "connection pool closed");
    }
}

/// A connection borrowed from a [`ConnectionPool`]
pub struct PooledConnection<'a> {
    connection: Arc<dyn Connection>,
    created_at: Instant,
    pool: &'a ConnectionPool,
    _permit: OwnedSemaphorePermit,
}

impl PooledConnection<'_> {
    pub fn inner(&self) -> &Arc<dyn Connection> {
        &self.connection
    }
}

impl Deref for PooledConnection<'_> {
    type Target = dyn Connection;

    fn deref(&self) -> &Self::Target {
        self.connection.as_ref()
    }
}

impl Drop for PooledConnection<'_> {
    fn drop(&mut self) {
        self.pool
            .return_connection(Arc::clone(&self.connection), self.created_at);
    }
}
