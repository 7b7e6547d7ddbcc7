//! On-demand analysis of a caller-supplied JSON document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result, ValidationErrorCode};

/// Body of `POST /analysis/summarize`.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisRequest {
    /// A JSON object or array.
    pub payload: serde_json::Value,
}

impl AnalysisRequest {
    /// Serializes the payload once for the model. Scalars are rejected.
    pub fn render_payload(&self) -> Result<String> {
        match &self.payload {
            serde_json::Value::Object(_) | serde_json::Value::Array(_) => Ok(serde_json::to_string(&self.payload)?),
            _ => Err(Error::validation(
                ValidationErrorCode::InvalidFormat,
                "payload must be a JSON object or array",
            )),
        }
    }
}

/// A row for the tenant's `post_embeddings` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub post_id: String,
    pub payload: serde_json::Value,
    pub embedding: Vec<f32>,
}

/// The two digests of one analysed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisDigest {
    pub overview: String,
    pub highlights: String,
}

impl AnalysisDigest {
    /// Dated text that gets embedded and stored.
    pub fn combined_text(&self, now: DateTime<Utc>) -> String {
        format!(
            "Date: {}\n\nSummary 1:\n{}\n\nSummary 2:\n{}\n\nOriginal Content Context: Summary of input.",
            now.to_rfc3339(),
            self.overview,
            self.highlights
        )
    }

    /// Builds the stored row under a fresh random post id.
    pub fn into_record(self, now: DateTime<Utc>, embedding: Vec<f32>) -> EmbeddingRecord {
        EmbeddingRecord {
            post_id: uuid::Uuid::new_v4().to_string(),
            payload: serde_json::json!({ "combined_text": self.combined_text(now) }),
            embedding,
        }
    }
}
