//! The language-model capability seam.

use async_trait::async_trait;
use insight_core::Classification;

use crate::error::CapabilityError;

/// Classification, summarization and embedding as remote, fallible calls.
///
/// Implementations never substitute defaults themselves; the workers pick
/// the fallback for each failure.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Classifies one interaction's text.
    async fn classify(&self, text: &str) -> Result<Classification, CapabilityError>;

    /// Summarizes the rendered changes of one table.
    async fn summarize(&self, table: &str, changes: &str) -> Result<String, CapabilityError>;

    /// Summarizes a serialized JSON document following `instruction`.
    async fn summarize_payload(&self, instruction: &str, payload: &str) -> Result<String, CapabilityError>;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, CapabilityError>;

    /// Recorded with every sentiment row.
    fn model_version(&self) -> &str;
}
