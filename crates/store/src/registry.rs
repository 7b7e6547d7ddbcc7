//! Process-wide cache of connection pools, one per physical database.

use std::collections::HashMap;
use std::sync::Arc;

use deadpool_postgres::Pool;
use insight_core::{DbCoordinates, PoolKey, Result};
use parking_lot::Mutex;
use telemetry::metrics;
use tracing::{debug, info};

use crate::config::PoolSettings;

/// Hands out a shared pool per `(host, port, database, user)`.
///
/// Lookup and insertion happen under one lock, so concurrent first requests
/// for the same key always observe the same pool. Pools are never evicted
/// before [`PoolRegistry::close_all`]. A pool keeps the password it was
/// created with; rotating a password requires a restart.
pub struct PoolRegistry {
    settings: PoolSettings,
    pools: Mutex<HashMap<PoolKey, Arc<Pool>>>,
}

impl PoolRegistry {
    pub fn new(settings: PoolSettings) -> Self {
        Self {
            settings,
            pools: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the pool for these coordinates, creating it on first use.
    pub fn get_pool(&self, coordinates: &DbCoordinates) -> Result<Arc<Pool>> {
        let key = coordinates.pool_key();
        let mut pools = self.pools.lock();

        if let Some(pool) = pools.get(&key) {
            return Ok(Arc::clone(pool));
        }

        let pool = Arc::new(self.settings.create_pool(coordinates)?);
        info!(pool = %key, max_size = self.settings.max_size, "Created connection pool");
        pools.insert(key, Arc::clone(&pool));
        metrics().open_pools.set(pools.len() as u64);

        Ok(pool)
    }

    /// Number of distinct pools created so far.
    pub fn len(&self) -> usize {
        self.pools.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.lock().is_empty()
    }

    pub fn settings(&self) -> &PoolSettings {
        &self.settings
    }

    /// Closes every pool and empties the registry.
    ///
    /// Connections currently checked out are dropped when returned.
    pub fn close_all(&self) {
        let drained: Vec<(PoolKey, Arc<Pool>)> = self.pools.lock().drain().collect();
        for (key, pool) in &drained {
            pool.close();
            debug!(pool = %key, "Closed connection pool");
        }
        metrics().open_pools.set(0);
        info!(count = drained.len(), "Closed all connection pools");
    }
}

impl Default for PoolRegistry {
    fn default() -> Self {
        Self::new(PoolSettings::default())
    }
}
