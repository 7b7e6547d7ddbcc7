//! Database health checks.

use deadpool_postgres::Pool;
use tracing::{debug, error};

/// Check that a connection can be checked out and answers `SELECT 1`.
pub async fn check_connection(pool: &Pool) -> bool {
    let client = match pool.get().await {
        Ok(client) => client,
        Err(e) => {
            error!("Database checkout failed: {}", e);
            return false;
        }
    };

    match client.query_one("SELECT 1", &[]).await {
        Ok(_) => {
            debug!("Database connection healthy");
            true
        }
        Err(e) => {
            error!("Database health check failed: {}", e);
            false
        }
    }
}
