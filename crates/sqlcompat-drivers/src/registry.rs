//! Registry of database drivers, addressable by name or URL scheme

use std::collections::BTreeMap;
use std::sync::Arc;

use sqlcompat_core::{ConnectionConfig, DatabaseDriver, DialectInfo, Result, SqlCompatError};

/// Registered drivers
pub struct DriverRegistry {
    drivers: BTreeMap<String, Arc<dyn DatabaseDriver>>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self {
            drivers: BTreeMap::new(),
        }
    }

    /// A registry holding every driver compiled into this build
    pub fn with_defaults() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::new();

        #[cfg(feature = "postgres")]
        registry.register(Arc::new(crate::postgres::PostgresDriver::new()));

        registry
    }

    pub fn register(&mut self, driver: Arc<dyn DatabaseDriver>) {
        let id = driver.id().to_string();
        tracing::debug!(driver = %id, schemes = ?driver.url_schemes(), "registering database driver");
        self.drivers.insert(id, driver);
    }

    /// Look a driver up by its id
    pub fn get(&self, id: &str) -> Option<Arc<dyn DatabaseDriver>> {
        self.drivers.get(id).cloned()
    }

    /// Find the driver that accepts `scheme`, case-insensitively
    pub fn for_scheme(&self, scheme: &str) -> Option<Arc<dyn DatabaseDriver>> {
        self.drivers
            .values()
            .find(|driver| {
                driver
                    .url_schemes()
                    .iter()
                    .any(|s| s.eq_ignore_ascii_case(scheme))
            })
            .cloned()
    }

    /// Resolve the driver for a parsed connection configuration
    pub fn resolve(&self, config: &ConnectionConfig) -> Result<Arc<dyn DatabaseDriver>> {
        self.get(&config.driver)
            .or_else(|| self.for_scheme(&config.driver))
            .ok_or_else(|| {
                tracing::warn!(driver = %config.driver, "driver not found in registry");
                SqlCompatError::NotSupported(format!(
                    "No database driver for '{}' (available: {})",
                    config.driver,
                    self.schemes().join(", ")
                ))
            })
    }

    /// Registered driver ids, sorted
    pub fn list(&self) -> Vec<&str> {
        self.drivers.keys().map(|s| s.as_str()).collect()
    }

    /// Every URL scheme some driver accepts
    pub fn schemes(&self) -> Vec<&'static str> {
        self.drivers
            .values()
            .flat_map(|driver| driver.url_schemes().iter().copied())
            .collect()
    }

    pub fn has(&self, id: &str) -> bool {
        self.drivers.contains_key(id)
    }

    pub fn dialect_info(&self, id: &str) -> Option<DialectInfo> {
        self.drivers.get(id).map(|driver| driver.dialect_info())
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use sqlcompat_core::Connection;

    struct FakeDriver;

    #[async_trait]
    impl DatabaseDriver for FakeDriver {
        fn name(&self) -> &'static str {
            "fake"
        }

        fn url_schemes(&self) -> &'static [&'static str] {
            &["fake", "fakedb"]
        }

        async fn connect(&self, _config: &ConnectionConfig) -> Result<Arc<dyn Connection>> {
            Err(SqlCompatError::NotSupported("fake".into()))
        }

        async fn test_connection(&self, _config: &ConnectionConfig) -> Result<()> {
            Ok(())
        }

        fn build_connection_string(&self, config: &ConnectionConfig) -> String {
            format!("fake://{}", config.host)
        }
    }

    fn registry() -> DriverRegistry {
        let mut registry = DriverRegistry::new();
        registry.register(Arc::new(FakeDriver));
        registry
    }

    #[test]
    fn lookup_by_id_and_scheme() {
        let registry = registry();
        assert!(registry.has("fake"));
        assert!(registry.get("fakedb").is_none());
        assert_eq!(
            registry.for_scheme("FAKEDB").map(|d| d.name()),
            Some("fake")
        );
        assert_eq!(registry.schemes(), vec!["fake", "fakedb"]);
    }

    #[test]
    fn resolve_reports_available_schemes() {
        let registry = registry();
        let config = ConnectionConfig::new("mysql", "origin");
        let err = registry.resolve(&config).err().expect("unknown scheme");
        assert_eq!(
            err.to_string(),
            "Not supported: No database driver for 'mysql' (available: fake, fakedb)"
        );

        let config = ConnectionConfig::new("fakedb", "origin");
        assert_eq!(registry.resolve(&config).map(|d| d.id()).ok(), Some("fake"));
    }

    #[cfg(feature = "postgres")]
    #[test]
    fn defaults_include_postgres() {
        let registry = DriverRegistry::with_defaults();
        assert!(registry.for_scheme("postgresql").is_some());
        assert!(registry.for_scheme("postgres").is_some());
    }
}
