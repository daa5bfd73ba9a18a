//! PostgreSQL driver implementation

mod connection;
mod dialect;
mod driver;
mod params;
mod tls;

pub use connection::{PostgresConnection, PostgresPreparedStatement, PostgresTransaction};
pub use dialect::postgres_dialect;
pub use driver::{PostgresDriver, client_config};
pub use tls::{PostgresTlsConnector, SslMode, TlsError, TlsSettings};
