//! API routes.

pub mod analysis;
pub mod bootstrap;
pub mod health;
pub mod ingest;
pub mod tenant;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use insight_core::limits::MAX_INGEST_BODY_BYTES;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::state::AppState;

/// Creates the API router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ingest/:domain", post(ingest::ingest_handler))
        .route("/tenant/register", post(tenant::register_handler))
        .route("/schema/bootstrap", post(bootstrap::bootstrap_handler))
        .route("/analysis/summarize", post(analysis::summarize_handler))
        .route("/health", get(health::health_handler))
        .route("/health/ready", get(health::ready_handler))
        .route("/health/live", get(health::live_handler))
        .layer(DefaultBodyLimit::max(MAX_INGEST_BODY_BYTES))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
