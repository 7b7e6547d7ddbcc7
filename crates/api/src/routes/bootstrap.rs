//! Tenant schema bootstrap endpoint.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::response::{ApiError, BootstrapResponse};
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct BootstrapRequest {
    pub tenant_id: String,
}

/// POST /schema/bootstrap - create the tenant's schema and tables.
///
/// Idempotent; bootstrapping an existing tenant changes nothing.
pub async fn bootstrap_handler(
    State(state): State<AppState>,
    Json(request): Json<BootstrapRequest>,
) -> Result<Json<BootstrapResponse>, ApiError> {
    let tenant = state.resolve_or_provision(&request.tenant_id).await?;

    let schema = state.writer.bootstrap(&tenant).await.map_err(|e| {
        error!(tenant_id = %tenant.tenant_id, error = %e, "Tenant bootstrap failed");
        ApiError::from(e)
    })?;
    state.forget_tenant(&tenant.tenant_id).await;

    info!(tenant_id = %tenant.tenant_id, schema = %schema, "Tenant bootstrapped");
    Ok(Json(BootstrapResponse {
        tenant_id: tenant.tenant_id,
        schema: schema.as_str().to_string(),
    }))
}
