//! Pool sizing and timeouts

use std::time::Duration;

use serde::{Deserialize, Serialize};

const DEFAULT_ACQUIRE_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_IDLE_TIMEOUT_MS: u64 = 600_000;

/// Sizing and connection lifecycle limits for a [`super::ConnectionPool`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    min_size: usize,
    max_size: usize,
    /// How long `get` waits for a free slot
    acquire_timeout_ms: u64,
    /// Idle connections older than this are closed instead of reused
    idle_timeout_ms: u64,
    max_lifetime_ms: Option<u64>,
}

impl PoolConfig {
    /// # Panics
    ///
    /// Panics if `max_size` is 0 or smaller than `min_size`.
    pub fn new(min_size: usize, max_size: usize) -> Self {
        assert!(
            max_size > 0,
            "max_size must be greater than 0, got {}",
            max_size
        );
        assert!(
            min_size <= max_size,
            "min_size ({}) cannot exceed max_size ({})",
            min_size,
            max_size
        );

        Self {
            min_size,
            max_size,
            acquire_timeout_ms: DEFAULT_ACQUIRE_TIMEOUT_MS,
            idle_timeout_ms: DEFAULT_IDLE_TIMEOUT_MS,
            max_lifetime_ms: None,
        }
    }

    /// A pool sized for `width` concurrent validation workers.
    ///
    /// A width of 0 is treated as 1.
    pub fn for_width(width: usize) -> Self {
        let width = width.max(1);
        Self::new(width.min(1), width)
    }

    pub fn with_acquire_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.acquire_timeout_ms = timeout_ms;
        self
    }

    pub fn with_idle_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.idle_timeout_ms = timeout_ms;
        self
    }

    pub fn with_max_lifetime_ms(mut self, lifetime_ms: u64) -> Self {
        self.max_lifetime_ms = Some(lifetime_ms);
        self
    }

    pub fn min_size(&self) -> usize {
        self.min_size
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn max_lifetime(&self) -> Option<Duration> {
        self.max_lifetime_ms.map(Duration::from_millis)
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new(1, 10)
    }
}
