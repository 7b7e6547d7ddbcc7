//! Tenant discovery.
//!
//! Two directories are supported: a `tenant_registry` table in the master
//! database, and a scan of `tenant_%` schemas inside one shared database.

use std::sync::Arc;

use async_trait::async_trait;
use deadpool_postgres::Pool;
use insight_core::error::{DbErrorCode, TenantErrorCode};
use insight_core::schema::TENANT_SCHEMA_PREFIX;
use insight_core::{DbCoordinates, Error, Result, SchemaName, TenantRecord};
use telemetry::{health, metrics};
use tracing::{debug, warn};

use crate::postgres::query_error;

/// Source of the tenants the workers iterate over.
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    /// Every active tenant, in a stable order.
    async fn fetch_tenants(&self) -> Result<Vec<TenantRecord>>;

    /// Looks up one tenant by id.
    async fn find_tenant(&self, tenant_id: &str) -> Result<Option<TenantRecord>> {
        Ok(self
            .fetch_tenants()
            .await?
            .into_iter()
            .find(|t| t.tenant_id == tenant_id))
    }
}

/// Lists tenants, failing open.
///
/// A directory error is logged and yields an empty list so the calling
/// cycle simply does nothing this round.
pub async fn list_tenants(directory: &dyn TenantDirectory) -> Vec<TenantRecord> {
    match directory.fetch_tenants().await {
        Ok(tenants) => {
            health().master_db.set_healthy();
            debug!(count = tenants.len(), "Listed tenants");
            tenants
        }
        Err(e) => {
            metrics().tenant_enumeration_failures.inc();
            health().master_db.set_unhealthy(e.to_string());
            warn!(error = %e, "Tenant enumeration failed, skipping cycle");
            Vec::new()
        }
    }
}

async fn checkout(pool: &Pool) -> Result<deadpool_postgres::Object> {
    pool.get().await.map_err(|e| {
        Error::persistence(
            DbErrorCode::PoolUnavailable,
            format!("master database checkout failed: {}", e),
        )
    })
}

fn enumeration_error(e: tokio_postgres::Error) -> Error {
    Error::tenant(TenantErrorCode::EnumerationFailed, format!("read tenant registry: {}", e))
}

const REGISTRY_COLUMNS: &str = "tenant_id, host, port, db_name, db_user, db_password";

/// Tenants listed in the master database's `tenant_registry` table.
pub struct RegistryDirectory {
    master: Arc<Pool>,
}

impl RegistryDirectory {
    pub fn new(master: Arc<Pool>) -> Self {
        Self { master }
    }

    fn record(row: &tokio_postgres::Row) -> Result<TenantRecord> {
        let port: i32 = row.try_get("port").map_err(enumeration_error)?;
        let port = u16::try_from(port).map_err(|_| {
            Error::tenant(TenantErrorCode::EnumerationFailed, format!("invalid port {}", port))
        })?;

        Ok(TenantRecord::new(
            row.try_get::<_, String>("tenant_id").map_err(enumeration_error)?,
            DbCoordinates {
                host: row.try_get("host").map_err(enumeration_error)?,
                port,
                db_name: row.try_get("db_name").map_err(enumeration_error)?,
                user: row.try_get("db_user").map_err(enumeration_error)?,
                password: row.try_get("db_password").map_err(enumeration_error)?,
            },
        ))
    }
}

#[async_trait]
impl TenantDirectory for RegistryDirectory {
    async fn fetch_tenants(&self) -> Result<Vec<TenantRecord>> {
        let client = checkout(&self.master).await?;
        let sql = format!("SELECT {REGISTRY_COLUMNS} FROM tenant_registry WHERE active ORDER BY tenant_id");
        let rows = client.query(sql.as_str(), &[]).await.map_err(enumeration_error)?;
        rows.iter().map(Self::record).collect()
    }

    async fn find_tenant(&self, tenant_id: &str) -> Result<Option<TenantRecord>> {
        let client = checkout(&self.master).await?;
        let sql = format!("SELECT {REGISTRY_COLUMNS} FROM tenant_registry WHERE active AND tenant_id = $1");
        let row = client
            .query_opt(sql.as_str(), &[&tenant_id])
            .await
            .map_err(|e| query_error("look up tenant", e))?;
        row.as_ref().map(Self::record).transpose()
    }
}

/// Tenants discovered from `tenant_%` schemas in one shared database.
pub struct SchemaScanDirectory {
    master: Arc<Pool>,
    coordinates: DbCoordinates,
}

impl SchemaScanDirectory {
    /// `coordinates` describe the shared database every tenant lives in.
    pub fn new(master: Arc<Pool>, coordinates: DbCoordinates) -> Self {
        Self { master, coordinates }
    }
}

/// Maps catalog schema names to tenants, skipping names that do not
/// round-trip through tenant schema derivation.
pub fn tenants_from_schemas<'a>(
    schemas: impl IntoIterator<Item = &'a str>,
    coordinates: &DbCoordinates,
) -> Vec<TenantRecord> {
    schemas
        .into_iter()
        .filter_map(|name| {
            let schema = match SchemaName::parse(name) {
                Ok(schema) => schema,
                Err(e) => {
                    warn!(schema = %name, error = %e, "Skipping schema with unsafe name");
                    return None;
                }
            };
            let tenant_id = schema.tenant_id().filter(|id| !id.is_empty())?.to_string();
            Some(TenantRecord::new(tenant_id, coordinates.clone()))
        })
        .collect()
}

#[async_trait]
impl TenantDirectory for SchemaScanDirectory {
    async fn fetch_tenants(&self) -> Result<Vec<TenantRecord>> {
        let client = checkout(&self.master).await?;
        let pattern = format!("{}%", TENANT_SCHEMA_PREFIX.replace('_', "\\_"));
        let rows = client
            .query(
                "SELECT schema_name::text FROM information_schema.schemata \
                 WHERE schema_name::text LIKE $1 ORDER BY schema_name",
                &[&pattern],
            )
            .await
            .map_err(enumeration_error)?;

        let names: Vec<String> = rows
            .iter()
            .map(|r| r.try_get(0).map_err(enumeration_error))
            .collect::<Result<_>>()?;

        Ok(tenants_from_schemas(names.iter().map(String::as_str), &self.coordinates))
    }
}
