//! Raw ingest payloads and their content hash.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use validator::Validate;

use crate::error::{Error, Result, ValidationErrorCode};
use crate::limits::ALLOWED_DOMAINS;

fn default_schema_version() -> String {
    "v1".to_string()
}

/// Body of `POST /ingest/{domain}`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct IngestRequest {
    #[validate(length(min = 1, max = 200))]
    pub tenant_id: String,
    #[validate(length(min = 1, max = 200))]
    pub brand_id: String,
    #[validate(length(max = 64))]
    pub platform: Option<String>,
    pub payload: serde_json::Map<String, serde_json::Value>,
    #[serde(default = "default_schema_version")]
    #[validate(length(min = 1, max = 16))]
    pub schema_version: String,
}

/// A raw event row ready for insertion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawEvent {
    pub brand_id: String,
    pub domain: String,
    pub platform: Option<String>,
    pub payload: serde_json::Value,
    pub schema_version: String,
    pub payload_hash: String,
}

impl RawEvent {
    /// Validates the request and domain, then hashes the payload.
    pub fn from_request(domain: &str, request: IngestRequest) -> Result<Self> {
        request
            .validate()
            .map_err(|e| Error::validation(ValidationErrorCode::InvalidFormat, e.to_string()))?;
        validate_domain(domain)?;

        let payload = serde_json::Value::Object(request.payload);
        let payload_hash = hash_payload(&payload)?;

        Ok(Self {
            brand_id: request.brand_id,
            domain: domain.to_string(),
            platform: request.platform,
            payload,
            schema_version: request.schema_version,
            payload_hash,
        })
    }
}

/// Rejects domains outside [`ALLOWED_DOMAINS`].
pub fn validate_domain(domain: &str) -> Result<()> {
    if ALLOWED_DOMAINS.contains(&domain) {
        Ok(())
    } else {
        Err(Error::validation(
            ValidationErrorCode::UnknownDomain,
            format!("domain '{}' is not one of {:?}", domain, ALLOWED_DOMAINS),
        ))
    }
}

/// SHA-256 (hex) of the payload serialized with sorted keys.
pub fn hash_payload(payload: &serde_json::Value) -> Result<String> {
    let canonical = serde_json::to_string(&sorted(payload))?;
    Ok(hex::encode(Sha256::digest(canonical.as_bytes())))
}

/// Rebuilds objects with keys in sorted order, recursively.
fn sorted(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            serde_json::Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), sorted(v)))
                    .collect(),
            )
        }
        serde_json::Value::Array(items) => serde_json::Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}
