//! Incremental summary types: checkpoints, changed rows, and artifacts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::limits::{SUMMARY_EXCLUDED_TABLES, SUMMARY_TYPE, TIMESTAMP_COLUMN_PRIORITY};

/// Low-water mark for already-summarized data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryCheckpoint {
    pub last_summarized_at: DateTime<Utc>,
    pub summary_type: String,
}

/// Returns true if `table` takes part in summarization.
pub fn is_summarizable_table(table: &str) -> bool {
    !SUMMARY_EXCLUDED_TABLES.contains(&table)
}

/// Picks the first recognized change-tracking column present in `columns`.
pub fn pick_timestamp_column(columns: &[String]) -> Option<&'static str> {
    TIMESTAMP_COLUMN_PRIORITY
        .iter()
        .copied()
        .find(|candidate| columns.iter().any(|c| c == candidate))
}

/// One changed row, as `(column, rendered value)` pairs in column order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChangedRow {
    pub fields: Vec<(String, String)>,
}

impl ChangedRow {
    pub fn new(fields: Vec<(String, String)>) -> Self {
        Self { fields }
    }

    /// Flat `col=value, col=value` rendering.
    pub fn render(&self) -> String {
        self.fields
            .iter()
            .map(|(col, value)| format!("{}={}", col, value))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Renders changed rows one per line.
pub fn render_changes(rows: &[ChangedRow]) -> String {
    rows.iter().map(ChangedRow::render).collect::<Vec<_>>().join("\n")
}

/// Renders a JSON value for change text. Strings are unquoted.
pub fn render_json_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "null".to_string(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// A per-table partial summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSummary {
    pub table: String,
    pub summary: String,
}

impl TableSummary {
    /// `### Table: <name>` header followed by the summary text.
    pub fn render(&self) -> String {
        format!("### Table: {}\n{}", self.table, self.summary)
    }
}

/// JSON payload stored with each artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryPayload {
    pub summary: String,
    pub partial_summaries: Vec<String>,
    #[serde(rename = "type")]
    pub summary_type: String,
    pub source_tables_count: usize,
}

/// One completed summarization cycle for a tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryArtifact {
    pub id: String,
    pub payload: SummaryPayload,
    /// Empty when the embedding capability failed.
    pub embedding: Vec<f32>,
}

impl SummaryArtifact {
    /// Concatenates partials (in discovery order) into the final summary.
    pub fn from_partials(partials: &[TableSummary], embedding: Vec<f32>, now: DateTime<Utc>) -> Self {
        let rendered: Vec<String> = partials.iter().map(TableSummary::render).collect();
        Self {
            id: artifact_id(now),
            payload: SummaryPayload {
                summary: rendered.join("\n\n"),
                source_tables_count: rendered.len(),
                partial_summaries: rendered,
                summary_type: SUMMARY_TYPE.to_string(),
            },
            embedding,
        }
    }

    pub fn summary(&self) -> &str {
        &self.payload.summary
    }
}

/// Final summary text for a set of partials.
pub fn concatenate_partials(partials: &[TableSummary]) -> String {
    partials
        .iter()
        .map(TableSummary::render)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// `summary_<YYYYmmdd_HHMMSS>`.
pub fn artifact_id(now: DateTime<Utc>) -> String {
    format!("summary_{}", now.format("%Y%m%d_%H%M%S"))
}
