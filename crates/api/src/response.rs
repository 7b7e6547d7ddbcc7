//! Standardized API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use insight_core::error::DbErrorCode;
use serde::{Deserialize, Serialize};
use telemetry::ComponentHealthReport;

/// Accepted ingest payload.
#[derive(Debug, Serialize, Deserialize)]
pub struct IngestResponse {
    pub success: bool,
    pub domain: String,
    pub payload_hash: String,
    pub timestamp: i64,
}

impl IngestResponse {
    pub fn success(domain: impl Into<String>, payload_hash: impl Into<String>) -> Self {
        Self {
            success: true,
            domain: domain.into(),
            payload_hash: payload_hash.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BootstrapResponse {
    pub tenant_id: String,
    pub schema: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub tenant_id: String,
    pub schema: String,
}

/// Stored on-demand analysis.
#[derive(Debug, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub status: String,
    pub post_id: String,
    pub created_at: String,
}

impl AnalysisResponse {
    pub fn ok(post_id: impl Into<String>, created_at: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            status: "ok".to_string(),
            post_id: post_id.into(),
            created_at: created_at.to_rfc3339(),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub master_db_connected: bool,
    pub llm_available: bool,
    pub open_pools: u64,
    pub components: Vec<ComponentHealthReport>,
}

/// Error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = Some(details);
        self
    }
}

/// API error type with coded responses.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub response: ErrorResponse,
}

impl ApiError {
    pub fn with_code(status: StatusCode, code: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            status,
            response: ErrorResponse::new(msg, code),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::with_code(StatusCode::BAD_REQUEST, "VALID_001", msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::with_code(StatusCode::INTERNAL_SERVER_ERROR, DbErrorCode::StoreFailed.code(), msg)
    }

    /// No language model is wired into the API.
    pub fn model_unavailable() -> Self {
        Self::with_code(StatusCode::SERVICE_UNAVAILABLE, "LLM_001", "language model is not configured")
    }

    pub fn validation(code: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            response: ErrorResponse::new("Validation failed", code).with_details(errors),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.response)).into_response()
    }
}

impl From<insight_core::Error> for ApiError {
    fn from(err: insight_core::Error) -> Self {
        use insight_core::Error;

        let status = StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        match &err {
            Error::Validation { code, message, .. } => ApiError::validation(*code, vec![message.clone()]),
            Error::InvalidIdentifier(_) => {
                ApiError::validation(err.error_code().unwrap_or("VALID_002"), vec![err.to_string()])
            }
            Error::Tenant { code, message, .. } => ApiError::with_code(status, *code, message),
            // Storage failures surface as a plain internal error; callers retry.
            Error::Persistence { .. } => ApiError::internal("Failed to store data"),
            Error::Serialization(e) => ApiError::bad_request(e.to_string()),
            Error::Capability(message) => ApiError::with_code(status, "LLM_001", message),
            _ => ApiError::internal(err.to_string()),
        }
    }
}
