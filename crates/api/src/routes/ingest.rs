//! Raw-event ingestion endpoint.
//!
//! Accepts one payload per request for a known domain, hashes it, and
//! stores it in the tenant's `raw_events` table. No retries.

use axum::{
    body::Bytes,
    extract::{Path, State},
    Json,
};
use insight_core::{validate_domain, IngestRequest, RawEvent};
use std::time::Instant;
use telemetry::metrics;
use tracing::{debug, error, info};

use crate::response::{ApiError, IngestResponse};
use crate::state::AppState;

/// POST /ingest/:domain
pub async fn ingest_handler(
    State(state): State<AppState>,
    Path(domain): Path<String>,
    body: Bytes,
) -> Result<Json<IngestResponse>, ApiError> {
    let start = Instant::now();

    validate_domain(&domain).map_err(|e| {
        metrics().ingest_failures.inc();
        ApiError::from(e)
    })?;

    let request: IngestRequest = serde_json::from_slice(&body).map_err(|e| {
        metrics().ingest_failures.inc();
        debug!(error = %e, "Rejected malformed ingest body");
        ApiError::bad_request(e.to_string())
    })?;

    let tenant_id = request.tenant_id.clone();
    let event = RawEvent::from_request(&domain, request).map_err(|e| {
        metrics().ingest_failures.inc();
        ApiError::from(e)
    })?;

    let tenant = state.resolve_tenant(&tenant_id).await.map_err(|e| {
        metrics().ingest_failures.inc();
        ApiError::from(e)
    })?;

    state.writer.insert_raw_event(&tenant, &event).await.map_err(|e| {
        metrics().ingest_failures.inc();
        error!(tenant_id = %tenant_id, domain = %domain, error = %e, "Failed to store raw event");
        ApiError::from(e)
    })?;

    info!(
        tenant_id = %tenant_id,
        domain = %domain,
        payload_hash = %event.payload_hash,
        latency_ms = start.elapsed().as_millis() as u64,
        "Raw event stored"
    );

    Ok(Json(IngestResponse::success(domain, event.payload_hash)))
}
