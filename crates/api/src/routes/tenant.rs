//! Tenant registration endpoint.

use axum::{extract::State, Json};
use insight_core::TenantRegistration;
use tracing::{error, info};

use crate::response::{ApiError, RegisterResponse};
use crate::state::AppState;

/// POST /tenant/register - add or update a tenant in the registry.
///
/// Re-registering an organisation overwrites its connection details. The
/// schema itself is created by `/schema/bootstrap`.
pub async fn register_handler(
    State(state): State<AppState>,
    Json(request): Json<TenantRegistration>,
) -> Result<Json<RegisterResponse>, ApiError> {
    let tenant = request.into_record()?;
    let schema = tenant.schema()?;

    state.writer.register(&tenant).await.map_err(|e| {
        error!(tenant_id = %tenant.tenant_id, error = %e, "Tenant registration failed");
        ApiError::from(e)
    })?;
    state.forget_tenant(&tenant.tenant_id).await;

    info!(
        tenant_id = %tenant.tenant_id,
        host = %tenant.coordinates.host,
        db = %tenant.coordinates.db_name,
        "Tenant registered"
    );
    Ok(Json(RegisterResponse {
        tenant_id: tenant.tenant_id,
        schema: schema.as_str().to_string(),
    }))
}
