//! Database driver trait definition

use crate::{Connection, DialectInfo, Result, SqlCompatError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Core driver trait that all database drivers must implement
#[async_trait]
pub trait DatabaseDriver: Send + Sync {
    /// Unique identifier for this driver (e.g., "postgres")
    fn id(&self) -> &'static str {
        self.name()
    }

    /// Human-readable name (e.g., "PostgreSQL")
    fn name(&self) -> &'static str;

    /// Display name for logs
    fn display_name(&self) -> &'static str {
        self.name()
    }

    /// URL schemes routed to this driver (e.g., "postgres", "postgresql")
    fn url_schemes(&self) -> &'static [&'static str];

    /// Default connection port
    fn default_port(&self) -> Option<u16> {
        None
    }

    /// Get SQL dialect information
    ///
    /// The validator uses this to pick bind markers and the analysis-only
    /// EXPLAIN form for the dialect.
    fn dialect_info(&self) -> DialectInfo {
        DialectInfo::default()
    }

    /// Create a new connection
    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connection>>;

    /// Test connection without keeping it open
    async fn test_connection(&self, config: &ConnectionConfig) -> Result<()>;

    /// Build a connection string from configuration, with the password redacted
    fn build_connection_string(&self, config: &ConnectionConfig) -> String;
}

/// Connection configuration
#[derive(Clone)]
pub struct ConnectionConfig {
    /// Unique identifier
    pub id: uuid::Uuid,
    /// Display name, used as the database label in logs
    pub name: String,
    /// Driver ID or URL scheme (e.g., "postgres", "postgresql")
    pub driver: String,
    /// Host address
    pub host: String,
    /// Port number (0 for default)
    pub port: u16,
    /// Database name
    pub database: Option<String>,
    /// Username
    pub username: Option<String>,
    /// Password
    pub password: Option<String>,
    /// Additional connection parameters (sslmode, connect_timeout, ...)
    pub params: HashMap<String, String>,
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("name", &self.name)
            .field("driver", &self.driver)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "********"))
            .field("params", &self.params)
            .finish()
    }
}

impl ConnectionConfig {
    /// Create a new configuration with default values
    pub fn new(driver: &str, name: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            name: name.to_string(),
            driver: driver.to_string(),
            host: String::new(),
            port: 0,
            database: None,
            username: None,
            password: None,
            params: HashMap::new(),
        }
    }

    /// Parse a database URL such as `postgres://user:pw@host:5432/db?sslmode=require`.
    ///
    /// A leading `jdbc:` is accepted and ignored. Explicit credentials take
    /// precedence over the ones embedded in the URL. Query pairs become
    /// connection parameters.
    pub fn from_url(
        name: &str,
        raw_url: &str,
        username: Option<&str>,
        password: Option<&str>,
    ) -> Result<Self> {
        let trimmed = raw_url.trim();
        let trimmed = trimmed.strip_prefix("jdbc:").unwrap_or(trimmed);
        let parsed = url::Url::parse(trimmed).map_err(|e| {
            SqlCompatError::Configuration(format!("invalid database URL for {}: {}", name, e))
        })?;

        let host = parsed.host_str().ok_or_else(|| {
            SqlCompatError::Configuration(format!("database URL for {} has no host", name))
        })?;

        let mut config = Self::new(parsed.scheme(), name);
        config.host = host.to_string();
        config.port = parsed.port().unwrap_or(0);

        let database = parsed.path().trim_start_matches('/');
        if !database.is_empty() {
            config.database = Some(database.to_string());
        }
        if !parsed.username().is_empty() {
            config.username = Some(parsed.username().to_string());
        }
        config.password = parsed.password().map(str::to_string);

        for (key, value) in parsed.query_pairs() {
            match key.as_ref() {
                "user" if config.username.is_none() => config.username = Some(value.into_owned()),
                "password" if config.password.is_none() => {
                    config.password = Some(value.into_owned())
                }
                _ => {
                    config.params.insert(key.into_owned(), value.into_owned());
                }
            }
        }

        if let Some(user) = username.filter(|u| !u.is_empty()) {
            config.username = Some(user.to_string());
        }
        if let Some(pass) = password {
            config.password = Some(pass.to_string());
        }

        Ok(config)
    }

    /// Set a connection parameter
    pub fn with_param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    /// Get a string parameter
    pub fn get_string(&self, key: &str) -> Option<String> {
        if let Some(val) = self.params.get(key) {
            return Some(val.clone());
        }
        match key {
            "host" => Some(self.host.clone()),
            "database" => self.database.clone(),
            "username" | "user" => self.username.clone(),
            "password" => self.password.clone(),
            _ => None,
        }
    }

    /// Get port
    pub fn get_port(&self) -> u16 {
        self.port
    }
}

#[cfg(test)]
mod tests;
