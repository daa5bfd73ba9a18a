//! Connection pooling
//!
//! # Example
//!
//! ```ignore
//! use sqlcompat_connection::pool::{ConnectionPool, PoolConfig};
//!
//! let config = PoolConfig::for_width(4).with_acquire_timeout_ms(5000);
//! let pool = ConnectionPool::new(config, factory);
//! let conn = pool.get().await?;
//! // Returned to the pool on drop
//! pool.close().await;
//! ```

mod config;
#[allow(clippy::module_inception)]
mod pool;
mod stats;

#[cfg(test)]
mod tests;

pub use config::PoolConfig;
pub use pool::{ConnectionFactory, ConnectionPool, PooledConnection};
pub use stats::PoolStats;
