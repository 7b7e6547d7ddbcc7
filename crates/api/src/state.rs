//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use insight_core::error::TenantErrorCode;
use insight_core::{DbCoordinates, Error, TenantRecord};
use llm_client::LanguageModel;
use moka::future::Cache;
use tenant_store::{TenantDirectory, TenantWriter};
use tracing::debug;

/// Cache TTL for tenant lookups (30 seconds).
const TENANT_CACHE_TTL: Duration = Duration::from_secs(30);

/// Maximum cache entries.
const TENANT_CACHE_MAX_CAPACITY: u64 = 10_000;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Tenant lookup (registry table or schema scan)
    pub directory: Arc<dyn TenantDirectory>,
    /// Raw event, registration, bootstrap and analysis writes
    pub writer: Arc<dyn TenantWriter>,
    /// Backs `/analysis/summarize`; absent means the endpoint answers 503
    pub model: Option<Arc<dyn LanguageModel>>,
    /// Shared database for schema-scan deployments; lets bootstrap create
    /// tenants the directory cannot see yet
    pub shared_database: Option<DbCoordinates>,
    tenants: Cache<String, TenantRecord>,
}

impl AppState {
    pub fn new(directory: Arc<dyn TenantDirectory>, writer: Arc<dyn TenantWriter>) -> Self {
        Self {
            directory,
            writer,
            model: None,
            shared_database: None,
            tenants: Cache::builder()
                .max_capacity(TENANT_CACHE_MAX_CAPACITY)
                .time_to_live(TENANT_CACHE_TTL)
                .build(),
        }
    }

    pub fn with_model(mut self, model: Arc<dyn LanguageModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_shared_database(mut self, coordinates: DbCoordinates) -> Self {
        self.shared_database = Some(coordinates);
        self
    }

    /// Resolves a registered tenant, caching hits briefly.
    pub async fn resolve_tenant(&self, tenant_id: &str) -> Result<TenantRecord, Error> {
        if let Some(cached) = self.tenants.get(tenant_id).await {
            debug!(tenant_id = %tenant_id, "Tenant cache hit");
            return Ok(cached);
        }

        let tenant = self.directory.find_tenant(tenant_id).await?.ok_or_else(|| {
            Error::tenant(
                TenantErrorCode::UnknownTenant,
                format!("tenant '{}' is not registered", tenant_id),
            )
        })?;

        self.tenants.insert(tenant_id.to_string(), tenant.clone()).await;
        Ok(tenant)
    }

    /// Like [`AppState::resolve_tenant`], but falls back to the shared
    /// database for tenants that have no schema yet.
    pub async fn resolve_or_provision(&self, tenant_id: &str) -> Result<TenantRecord, Error> {
        match (self.resolve_tenant(tenant_id).await, &self.shared_database) {
            (Err(Error::Tenant { code, .. }), Some(shared))
                if code == TenantErrorCode::UnknownTenant.code() =>
            {
                Ok(TenantRecord::new(tenant_id, shared.clone()))
            }
            (result, _) => result,
        }
    }

    pub async fn forget_tenant(&self, tenant_id: &str) {
        self.tenants.invalidate(tenant_id).await;
    }
}
