//! Driver-backed connection factory

use std::sync::Arc;

use async_trait::async_trait;
use sqlcompat_core::{Connection, ConnectionConfig, DatabaseDriver, Result};

use crate::pool::ConnectionFactory;

/// Opens connections to one configured database through its driver
pub struct DriverConnectionFactory {
    driver: Arc<dyn DatabaseDriver>,
    config: ConnectionConfig,
}

impl DriverConnectionFactory {
    pub fn new(driver: Arc<dyn DatabaseDriver>, config: ConnectionConfig) -> Self {
        Self { driver, config }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }
}

#[async_trait]
impl ConnectionFactory for DriverConnectionFactory {
    async fn create(&self) -> Result<Arc<dyn Connection>> {
        tracing::debug!(
            driver = self.driver.id(),
            database = %self.config.name,
            host = self.config.host.as_str(),
            "opening connection"
        );
        self.driver.connect(&self.config).await
    }
}
