//! Connection pooling for the databases under validation
//!
//! A [`ConnectionPool`] hands out at most `max_size` live connections at a
//! time. Connections come from a [`ConnectionFactory`]; the
//! [`DriverConnectionFactory`] opens them through a registered
//! [`sqlcompat_core::DatabaseDriver`].

mod factory;
pub mod pool;

pub use factory::DriverConnectionFactory;
pub use pool::{ConnectionFactory, ConnectionPool, PoolConfig, PoolStats, PooledConnection};
