//! On-demand analysis of a JSON document.
//!
//! Two digests of the payload are generated, combined with the current
//! time, embedded, and stored in the tenant's `post_embeddings` table.

use axum::{extract::State, http::HeaderMap, Json};
use chrono::Utc;
use insight_core::{AnalysisDigest, AnalysisRequest, Error};
use llm_client::prompts::{PAYLOAD_KPI_INSTRUCTION, PAYLOAD_OVERVIEW_INSTRUCTION};
use llm_client::{CapabilityError, LanguageModel};
use std::time::Instant;
use telemetry::{health, metrics};
use tracing::{error, info, warn};

use crate::response::{AnalysisResponse, ApiError};
use crate::state::AppState;

pub const TENANT_HEADER: &str = "x-tenant-id";

fn tenant_header(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get(TENANT_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiError::bad_request("missing X-Tenant-Id header"))
}

/// Runs one model call, recording latency and LLM health.
async fn call<T>(
    what: &str,
    request: impl std::future::Future<Output = Result<T, CapabilityError>>,
) -> Result<T, Error> {
    let start = Instant::now();
    let outcome = request.await;
    metrics().capability_latency_ms.observe(start.elapsed().as_millis() as u64);
    health().llm.observe(&outcome);
    outcome.map_err(|e| Error::capability(format!("{} failed: {}", what, e)))
}

/// POST /analysis/summarize
pub async fn summarize_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<AnalysisRequest>,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let start = Instant::now();
    let tenant_id = tenant_header(&headers)?;
    let payload = request.render_payload()?;

    let model = state.model.clone().ok_or_else(ApiError::model_unavailable)?;
    let tenant = state.resolve_tenant(&tenant_id).await?;

    let digest = summarize(model.as_ref(), &payload).await.map_err(|e| {
        metrics().analysis_failures.inc();
        warn!(tenant_id = %tenant_id, error = %e, "Analysis generation failed");
        ApiError::from(e)
    })?;

    let now = Utc::now();
    let combined = digest.combined_text(now);
    let embedding = call("embedding", model.embed(&combined)).await.map_err(|e| {
        metrics().analysis_failures.inc();
        warn!(tenant_id = %tenant_id, error = %e, "Analysis embedding failed");
        ApiError::from(e)
    })?;
    let record = digest.into_record(now, embedding);

    state.writer.insert_embedding(&tenant, &record).await.map_err(|e| {
        error!(tenant_id = %tenant_id, error = %e, "Failed to store analysis");
        ApiError::from(e)
    })?;

    info!(
        tenant_id = %tenant_id,
        post_id = %record.post_id,
        latency_ms = start.elapsed().as_millis() as u64,
        "Analysis stored"
    );

    Ok(Json(AnalysisResponse::ok(record.post_id, now)))
}

async fn summarize(model: &dyn LanguageModel, payload: &str) -> Result<AnalysisDigest, Error> {
    let overview = call(
        "overview summary",
        model.summarize_payload(PAYLOAD_OVERVIEW_INSTRUCTION, payload),
    )
    .await?;
    let highlights = call("KPI summary", model.summarize_payload(PAYLOAD_KPI_INSTRUCTION, payload)).await?;
    Ok(AnalysisDigest {
        overview,
        highlights,
    })
}
