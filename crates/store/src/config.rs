//! Pool configuration shared by every tenant pool.

use deadpool_postgres::{Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime};
use insight_core::{error::DbErrorCode, DbCoordinates, Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_postgres::NoTls;

/// Settings applied to each pool the registry creates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolSettings {
    /// Maximum connections per pool
    #[serde(default = "default_max_size")]
    pub max_size: usize,
    /// Connect timeout in seconds
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// How long a checkout waits for a free connection, in seconds
    #[serde(default = "default_wait_timeout_secs")]
    pub wait_timeout_secs: u64,
}

fn default_max_size() -> usize {
    10
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_wait_timeout_secs() -> u64 {
    30
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_size: default_max_size(),
            connect_timeout_secs: default_connect_timeout_secs(),
            wait_timeout_secs: default_wait_timeout_secs(),
        }
    }
}

impl PoolSettings {
    /// Builds a pool for the given coordinates.
    ///
    /// Connections are opened lazily on first checkout. Recycled connections
    /// are rolled back, so a session abandoned mid-transaction never leaks
    /// uncommitted state to the next borrower.
    pub fn create_pool(&self, coordinates: &DbCoordinates) -> Result<Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(coordinates.host.clone());
        cfg.port = Some(coordinates.port);
        cfg.dbname = Some(coordinates.db_name.clone());
        cfg.user = Some(coordinates.user.clone());
        cfg.password = Some(coordinates.password.clone());
        cfg.connect_timeout = Some(Duration::from_secs(self.connect_timeout_secs));

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Custom("ROLLBACK".to_string()),
        });

        let mut pool_config = PoolConfig::new(self.max_size.max(1));
        pool_config.timeouts.wait = Some(Duration::from_secs(self.wait_timeout_secs));
        cfg.pool = Some(pool_config);

        cfg.create_pool(Some(Runtime::Tokio1), NoTls).map_err(|e| {
            Error::persistence(
                DbErrorCode::PoolUnavailable,
                format!("Failed to create pool for {}: {}", coordinates.pool_key(), e),
            )
        })
    }
}
