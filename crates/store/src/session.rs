//! The transactional view of one tenant's schema used by the workers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use insight_core::{
    ChangedRow, EmbeddingRecord, Identifier, Interaction, RawEvent, Result, SchemaName, SentimentResult, SummaryArtifact,
    TenantRecord,
};

/// One open transaction scoped to a tenant schema.
///
/// Every statement runs inside the same transaction. Dropping a session
/// without calling [`TenantSession::commit`] discards its writes.
#[async_trait]
pub trait TenantSession: Send + Sync {
    fn schema(&self) -> &SchemaName;

    /// Interactions that have text and no sentiment row yet.
    async fn fetch_unclassified(&self, limit: usize) -> Result<Vec<Interaction>>;

    /// Inserts a sentiment row. Returns `false` when the interaction already
    /// had one.
    async fn insert_sentiment(&self, result: &SentimentResult) -> Result<bool>;

    /// Most recent summary checkpoint, if any.
    async fn last_checkpoint(&self) -> Result<Option<DateTime<Utc>>>;

    /// Every table in the schema, sorted by name.
    async fn discover_tables(&self) -> Result<Vec<String>>;

    /// Column names of `table` in ordinal order.
    async fn table_columns(&self, table: &Identifier) -> Result<Vec<String>>;

    /// Up to `limit` rows whose `timestamp_column` is later than `since`.
    async fn changed_rows(
        &self,
        table: &Identifier,
        columns: &[String],
        timestamp_column: &Identifier,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ChangedRow>>;

    async fn insert_artifact(&self, artifact: &SummaryArtifact) -> Result<()>;

    /// Appends a checkpoint at the database's current time, never earlier
    /// than the latest existing one. Returns the recorded instant.
    async fn append_checkpoint(&self, summary_type: &str) -> Result<DateTime<Utc>>;

    async fn commit(self: Box<Self>) -> Result<()>;

    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// Opens tenant sessions.
#[async_trait]
pub trait TenantConnector: Send + Sync {
    async fn open(&self, tenant: &TenantRecord) -> Result<Box<dyn TenantSession>>;
}

/// Writes that the HTTP layer performs on behalf of a tenant.
#[async_trait]
pub trait TenantWriter: Send + Sync {
    /// Stores one accepted ingest payload in the tenant's `raw_events`.
    async fn insert_raw_event(&self, tenant: &TenantRecord, event: &RawEvent) -> Result<()>;

    /// Creates the tenant's schema and tables if missing.
    async fn bootstrap(&self, tenant: &TenantRecord) -> Result<SchemaName>;

    /// Adds or updates a tenant in the master registry.
    async fn register(&self, tenant: &TenantRecord) -> Result<()>;

    /// Stores one analysed document in the tenant's `post_embeddings`.
    async fn insert_embedding(&self, tenant: &TenantRecord, record: &EmbeddingRecord) -> Result<()>;
}
