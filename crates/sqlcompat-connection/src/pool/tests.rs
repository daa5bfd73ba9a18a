use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use sqlcompat_core::{
    Connection, Result, SqlCompatError, StatementResult, Transaction, TransactionOptions, Value,
};

use super::config::PoolConfig;
use super::pool::{ConnectionFactory, ConnectionPool};
use super::stats::PoolStats;

struct MockConnection {
    closed: AtomicBool,
}

impl MockConnection {
    fn new() -> Self {
        Self {
            closed: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl Connection for MockConnection {
    fn driver_name(&self) -> &str {
        "mock"
    }

    async fn execute(&self, _sql: &str, _params: &[Value]) -> Result<StatementResult> {
        Ok(StatementResult::affected(0))
    }

    async fn begin_transaction(
        &self,
        _options: TransactionOptions,
    ) -> Result<Box<dyn Transaction>> {
        Err(SqlCompatError::NotSupported(
            "Transactions not supported in mock".into(),
        ))
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

struct MockConnectionFactory {
    created: AtomicUsize,
    fail: bool,
}

impl MockConnectionFactory {
    fn new() -> Self {
        Self {
            created: AtomicUsize::new(0),
            fail: false,
        }
    }

    fn failing() -> Self {
        Self {
            created: AtomicUsize::new(0),
            fail: true,
        }
    }

    fn count(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConnectionFactory for MockConnectionFactory {
    async fn create(&self) -> Result<Arc<dyn Connection>> {
        if self.fail {
            return Err(SqlCompatError::Connection("connection refused".into()));
        }
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MockConnection::new()))
    }
}

// ===== PoolConfig tests =====

#[test]
fn config_defaults() {
    let config = PoolConfig::default();
    assert_eq!(config.min_size(), 1);
    assert_eq!(config.max_size(), 10);
    assert_eq!(config.acquire_timeout(), Duration::from_secs(30));
    assert_eq!(config.idle_timeout(), Duration::from_secs(600));
    assert_eq!(config.max_lifetime(), None);
}

#[test]
fn config_builders() {
    let config = PoolConfig::new(2, 8)
        .with_acquire_timeout_ms(500)
        .with_idle_timeout_ms(1_000)
        .with_max_lifetime_ms(60_000);
    assert_eq!(config.acquire_timeout(), Duration::from_millis(500));
    assert_eq!(config.idle_timeout(), Duration::from_secs(1));
    assert_eq!(config.max_lifetime(), Some(Duration::from_secs(60)));
}

#[test]
fn config_for_width() {
    let config = PoolConfig::for_width(4);
    assert_eq!(config.min_size(), 1);
    assert_eq!(config.max_size(), 4);

    let config = PoolConfig::for_width(0);
    assert_eq!(config.max_size(), 1);
}

#[test]
#[should_panic(expected = "max_size must be greater than 0")]
fn config_rejects_zero_max() {
    PoolConfig::new(0, 0);
}

#[test]
#[should_panic(expected = "cannot exceed max_size")]
fn config_rejects_min_above_max() {
    PoolConfig::new(5, 2);
}

#[test]
fn config_serialization() {
    let config = PoolConfig::new(2, 10).with_acquire_timeout_ms(5000);
    let json = serde_json::to_string(&config).expect("serialize");
    let restored: PoolConfig = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(restored.max_size(), 10);
    assert_eq!(restored.acquire_timeout(), Duration::from_millis(5000));
}

// ===== PoolStats tests =====

#[test]
fn stats_utilization() {
    assert!((PoolStats::new(10, 5, 5, 0).utilization() - 0.5).abs() < 0.001);
    assert!((PoolStats::new(0, 0, 0, 0).utilization()).abs() < 0.001);
}

#[test]
fn stats_is_full() {
    assert!(PoolStats::new(4, 0, 4, 1).is_full());
    assert!(!PoolStats::new(4, 1, 3, 0).is_full());
    assert!(!PoolStats::default().is_full());
}

// ===== ConnectionPool tests =====

#[tokio::test]
async fn get_creates_connection() {
    let pool = ConnectionPool::new(PoolConfig::new(1, 5), MockConnectionFactory::new());

    let conn = pool.get().await.expect("get connection");
    assert_eq!(conn.driver_name(), "mock");
    assert_eq!(pool.stats(), PoolStats::new(1, 0, 1, 0));
}

#[tokio::test]
async fn dropped_connection_is_reused() {
    let factory = Arc::new(MockConnectionFactory::new());
    let pool = ConnectionPool::new(PoolConfig::new(1, 5), factory.clone());

    {
        let _conn = pool.get().await.expect("get connection");
    }
    assert_eq!(pool.stats().idle(), 1);
    assert_eq!(pool.stats().active(), 0);

    let _again = pool.get().await.expect("get connection");
    assert_eq!(factory.count(), 1);
}

#[tokio::test]
async fn max_size_bounds_concurrent_borrows() {
    let config = PoolConfig::new(1, 2).with_acquire_timeout_ms(100);
    let pool = ConnectionPool::new(config, MockConnectionFactory::new());

    let first = pool.get().await.expect("first");
    let second = pool.get().await.expect("second");

    let err = pool.get().await.err().expect("third borrow should time out");
    assert!(matches!(err, SqlCompatError::Timeout(_)));
    assert!(err.to_string().contains("Timed out"));
    assert_eq!(pool.stats().waiting(), 0);

    drop(first);
    drop(second);
}

#[tokio::test]
async fn factory_errors_propagate() {
    let pool = ConnectionPool::new(PoolConfig::new(1, 2), MockConnectionFactory::failing());

    let err = pool.get().await.err().expect("factory failure");
    assert!(err.to_string().contains("connection refused"));
    assert_eq!(pool.stats(), PoolStats::default());
}

#[tokio::test]
async fn closed_connections_are_not_pooled() {
    let pool = ConnectionPool::new(PoolConfig::new(1, 2), MockConnectionFactory::new());

    {
        let conn = pool.get().await.expect("get");
        conn.close().await.expect("close");
    }
    assert_eq!(pool.stats().idle(), 0);
}

#[tokio::test]
async fn idle_timeout_discards_stale_connections() {
    let factory = Arc::new(MockConnectionFactory::new());
    let config = PoolConfig::new(1, 2).with_idle_timeout_ms(0);
    let pool = ConnectionPool::new(config, factory.clone());

    drop(pool.get().await.expect("get"));
    tokio::time::sleep(Duration::from_millis(5)).await;
    let _conn = pool.get().await.expect("get");

    assert_eq!(factory.count(), 2);
}

#[tokio::test]
async fn close_idle_empties_queue() {
    let pool = ConnectionPool::new(PoolConfig::new(1, 5), MockConnectionFactory::new());
    {
        let _a = pool.get().await.expect("get");
        let _b = pool.get().await.expect("get");
    }
    assert_eq!(pool.stats().idle(), 2);

    pool.close_idle().await;
    assert_eq!(pool.stats().idle(), 0);
    assert!(!pool.is_closed());
}

#[tokio::test]
async fn close_rejects_further_borrows() {
    let pool = ConnectionPool::new(PoolConfig::new(1, 2), MockConnectionFactory::new());
    let borrowed = pool.get().await.expect("get");
    let inner = Arc::clone(borrowed.inner());

    pool.close().await;
    assert!(pool.is_closed());
    assert!(pool.get().await.is_err());

    drop(borrowed);
    tokio::task::yield_now().await;
    tokio::time::sleep(Duration::from_millis(5)).await;
    assert!(inner.is_closed());
    assert_eq!(pool.stats().idle(), 0);
}
