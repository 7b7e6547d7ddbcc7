//! Batch sizes, concurrency defaults, and fixed table/column lists.
//!
//! Worker defaults are overridable through configuration; the table and
//! column lists are fixed.

use chrono::{DateTime, TimeZone, Utc};

// === Worker Defaults ===

/// Tenants processed concurrently per chunk.
pub const DEFAULT_MAX_CONCURRENT_TENANTS: usize = 5;

/// In-flight capability calls allowed across all tenants in a chunk.
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 20;

/// Pause between sentiment poll cycles.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// Unclassified interactions fetched per tenant per cycle.
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Upper bound on one external capability call.
pub const DEFAULT_CAPABILITY_TIMEOUT_SECS: u64 = 60;

/// Pause between summary cycles when the scheduler drives them.
pub const DEFAULT_SUMMARY_INTERVAL_SECS: u64 = 86_400;

// === Summarization ===

/// Changed rows read per table per summary cycle.
pub const SUMMARY_ROW_CAP: usize = 50;

/// Bookkeeping tables that never take part in summarization.
pub const SUMMARY_EXCLUDED_TABLES: &[&str] = &["post_embeddings", "summary_checkpoint", "raw_events"];

/// Change-tracking columns, highest priority first.
///
/// A table with none of these is invisible to the summary pipeline.
pub const TIMESTAMP_COLUMN_PRIORITY: &[&str] = &[
    "last_updated",
    "processed_at",
    "fetched_at",
    "ingested_at",
    "snapshot_time",
    "created_at",
];

/// Marker written with every checkpoint and artifact.
pub const SUMMARY_TYPE: &str = "global_daily";

/// Checkpoint used when a tenant has never been summarized.
pub fn summary_epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

// === Tenant Tables ===

pub const RAW_EVENTS_TABLE: &str = "raw_events";
pub const RAW_INTERACTIONS_TABLE: &str = "raw_social_interactions";
pub const SENTIMENT_RESULTS_TABLE: &str = "sentiment_results";
pub const SUMMARY_CHECKPOINT_TABLE: &str = "summary_checkpoint";
pub const POST_EMBEDDINGS_TABLE: &str = "post_embeddings";

/// JSON keys tried, in order, for an interaction's text.
pub const INTERACTION_TEXT_KEYS: &[&str] = &["text", "message", "caption", "comment"];

// === Ingest ===

/// Domains accepted by the raw-event ingest endpoint.
pub const ALLOWED_DOMAINS: &[&str] = &["social", "web", "crm", "ads"];

/// Maximum raw-event request body (1MB).
pub const MAX_INGEST_BODY_BYTES: usize = 1024 * 1024;
