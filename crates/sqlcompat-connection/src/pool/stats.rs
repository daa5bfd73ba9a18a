//! Pool statistics

use serde::{Deserialize, Serialize};

/// Snapshot of a pool's occupancy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    total: usize,
    idle: usize,
    active: usize,
    waiting: usize,
}

impl PoolStats {
    pub fn new(total: usize, idle: usize, active: usize, waiting: usize) -> Self {
        Self {
            total,
            idle,
            active,
            waiting,
        }
    }

    /// Idle plus borrowed connections
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn idle(&self) -> usize {
        self.idle
    }

    /// Connections currently borrowed by workers
    pub fn active(&self) -> usize {
        self.active
    }

    /// Callers blocked in `get`
    pub fn waiting(&self) -> usize {
        self.waiting
    }

    /// Share of live connections in use, 0.0 when the pool is empty
    pub fn utilization(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.active as f64 / self.total as f64
        }
    }

    pub fn is_full(&self) -> bool {
        self.total > 0 && self.idle == 0
    }
}
