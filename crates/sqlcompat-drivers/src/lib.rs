//! Database drivers available to the validator
//!
//! Concrete drivers live in their own crates under `crates/` and are
//! enabled through cargo features.

#[cfg(feature = "postgres")]
pub use sqlcompat_driver_postgres as postgres;

mod registry;

pub use registry::DriverRegistry;

pub use sqlcompat_core::{
    Connection, ConnectionConfig, DatabaseDriver, DialectInfo, PreparedStatement, Result,
    SqlCompatError, StatementResult, Transaction, Value,
};
