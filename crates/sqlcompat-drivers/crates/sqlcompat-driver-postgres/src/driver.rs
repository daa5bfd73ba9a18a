//! PostgreSQL driver implementation

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlcompat_core::{
    Connection, ConnectionConfig, DatabaseDriver, DialectInfo, Result, SqlCompatError,
};

use crate::tls::{PostgresTlsConnector, TlsSettings};
use crate::PostgresConnection;

const DEFAULT_PORT: u16 = 5432;
const DEFAULT_DATABASE: &str = "postgres";
const DEFAULT_APPLICATION_NAME: &str = "sqlcompat";

/// PostgreSQL database driver
pub struct PostgresDriver;

impl PostgresDriver {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PostgresDriver {
    fn default() -> Self {
        Self::new()
    }
}

/// Translate a [`ConnectionConfig`] into a tokio-postgres client config.
///
/// Recognised parameters: `connect_timeout` (seconds), `application_name`,
/// `options`, and the JDBC-style `currentSchema`.
pub fn client_config(
    config: &ConnectionConfig,
    tls: &TlsSettings,
) -> Result<tokio_postgres::Config> {
    let mut pg = tokio_postgres::Config::new();
    let host = if config.host.is_empty() {
        "localhost"
    } else {
        config.host.as_str()
    };
    let port = if config.port > 0 {
        config.port
    } else {
        DEFAULT_PORT
    };

    pg.host(host)
        .port(port)
        .dbname(config.database.as_deref().unwrap_or(DEFAULT_DATABASE))
        .ssl_mode(tls.mode.to_client_mode())
        .application_name(
            config
                .params
                .get("application_name")
                .map(String::as_str)
                .unwrap_or(DEFAULT_APPLICATION_NAME),
        );

    if let Some(user) = &config.username {
        pg.user(user);
    }
    if let Some(password) = &config.password {
        pg.password(password);
    }

    if let Some(raw) = config.params.get("connect_timeout") {
        let seconds: u64 = raw.trim().parse().map_err(|_| {
            SqlCompatError::Configuration(format!(
                "connect_timeout for {} must be a whole number of seconds, got '{}'",
                config.name, raw
            ))
        })?;
        pg.connect_timeout(Duration::from_secs(seconds));
    }

    let mut options: Vec<String> = config.params.get("options").cloned().into_iter().collect();
    if let Some(schema) = config.params.get("currentSchema") {
        options.push(format!("-c search_path={}", schema));
    }
    if !options.is_empty() {
        pg.options(&options.join(" "));
    }

    Ok(pg)
}

#[async_trait]
impl DatabaseDriver for PostgresDriver {
    fn id(&self) -> &'static str {
        "postgres"
    }

    fn name(&self) -> &'static str {
        "postgres"
    }

    fn display_name(&self) -> &'static str {
        "PostgreSQL"
    }

    fn url_schemes(&self) -> &'static [&'static str] {
        &["postgres", "postgresql"]
    }

    fn default_port(&self) -> Option<u16> {
        Some(DEFAULT_PORT)
    }

    fn dialect_info(&self) -> DialectInfo {
        crate::postgres_dialect()
    }

    #[tracing::instrument(skip(self, config), fields(database = %config.name, host = %config.host))]
    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connection>> {
        let tls = TlsSettings::from_config(config)
            .map_err(|e| SqlCompatError::Security(e.to_string()))?;
        let client_config = client_config(config, &tls)?;
        let connector =
            PostgresTlsConnector::build(&tls).map_err(|e| SqlCompatError::Security(e.to_string()))?;

        let connection = PostgresConnection::connect(client_config, connector)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "failed to connect to PostgreSQL database");
                SqlCompatError::Connection(format!(
                    "Failed to connect to {}: {}",
                    self.build_connection_string(config),
                    e
                ))
            })?;

        tracing::debug!(ssl_mode = %tls.mode, "PostgreSQL connection established");
        Ok(Arc::new(connection))
    }

    async fn test_connection(&self, config: &ConnectionConfig) -> Result<()> {
        let connection = self.connect(config).await?;
        let outcome = connection.execute("SELECT 1", &[]).await;
        connection.close().await?;
        outcome.map(|_| ())
    }

    fn build_connection_string(&self, config: &ConnectionConfig) -> String {
        let host = if config.host.is_empty() {
            "localhost"
        } else {
            config.host.as_str()
        };
        let port = if config.port > 0 {
            config.port
        } else {
            DEFAULT_PORT
        };
        let database = config.database.as_deref().unwrap_or(DEFAULT_DATABASE);

        let mut out = String::from("postgresql://");
        if let Some(user) = &config.username {
            out.push_str(user);
            if config.password.is_some() {
                out.push_str(":********");
            }
            out.push('@');
        }
        out.push_str(&format!("{}:{}/{}", host, port, database));
        out
    }
}
