//! sqlcompat core - shared abstractions for the SQL compatibility validator
//!
//! This crate provides the traits and types every other sqlcompat crate
//! depends on:
//!
//! - `DatabaseDriver` - Trait for database driver implementations
//! - `Connection`, `Transaction`, `PreparedStatement` - Execution traits
//! - `SavepointSupport` - Partial rollback inside a transaction
//! - `DialectInfo` - Placeholder style and EXPLAIN syntax per dialect
//! - `StatementRecord`, `ParameterSpec` - Resolved mapped statements
//! - Common types like `Value` and `StatementResult`

mod connection;
mod dialect;
mod driver;
mod error;
mod statement;
pub mod transaction;
mod types;

pub use connection::*;
pub use dialect::*;
pub use driver::*;
pub use error::*;
pub use statement::*;
pub use transaction::*;
pub use types::*;
