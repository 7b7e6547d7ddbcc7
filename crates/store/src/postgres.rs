//! PostgreSQL-backed tenant sessions.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::{Object, Pool};
use insight_core::error::DbErrorCode;
use insight_core::limits::{
    INTERACTION_TEXT_KEYS, POST_EMBEDDINGS_TABLE, RAW_INTERACTIONS_TABLE, SENTIMENT_RESULTS_TABLE,
    SUMMARY_CHECKPOINT_TABLE,
};
use insight_core::{
    render_json_value, ChangedRow, EmbeddingRecord, Error, Identifier, Interaction, RawEvent, Result, SchemaName,
    SentimentResult, SummaryArtifact, TenantRecord,
};
use tracing::{debug, warn};

use crate::bootstrap::{bootstrap_tenant, ensure_registry, register_tenant};
use crate::ingest::{insert_embedding, insert_raw_event};
use crate::registry::PoolRegistry;
use crate::session::{TenantConnector, TenantSession, TenantWriter};

pub(crate) fn query_error(context: &str, e: tokio_postgres::Error) -> Error {
    Error::persistence(DbErrorCode::QueryFailed, format!("{}: {}", context, e))
}

/// `COALESCE(r.raw_json->>'text', r.raw_json->>'message', ...)`.
fn interaction_text_expr() -> String {
    let keys: Vec<String> = INTERACTION_TEXT_KEYS
        .iter()
        .map(|key| format!("r.raw_json->>'{}'", key))
        .collect();
    format!("COALESCE({})", keys.join(", "))
}

/// Opens sessions on pools from a shared [`PoolRegistry`].
///
/// Registration writes to the master database and is only available once
/// [`PgConnector::with_master`] has been called.
#[derive(Clone)]
pub struct PgConnector {
    registry: Arc<PoolRegistry>,
    master: Option<Arc<Pool>>,
}

impl PgConnector {
    pub fn new(registry: Arc<PoolRegistry>) -> Self {
        Self { registry, master: None }
    }

    pub fn with_master(mut self, master: Arc<Pool>) -> Self {
        self.master = Some(master);
        self
    }

    pub fn registry(&self) -> &Arc<PoolRegistry> {
        &self.registry
    }
}

#[async_trait]
impl TenantConnector for PgConnector {
    async fn open(&self, tenant: &TenantRecord) -> Result<Box<dyn TenantSession>> {
        let schema = tenant.schema()?;
        let pool = self.registry.get_pool(&tenant.coordinates)?;
        let client = pool.get().await.map_err(|e| {
            Error::persistence(
                DbErrorCode::PoolUnavailable,
                format!("checkout for tenant {} failed: {}", tenant.tenant_id, e),
            )
        })?;

        PgTenantSession::begin(client, schema)
            .await
            .map(|session| Box::new(session) as Box<dyn TenantSession>)
    }
}

#[async_trait]
impl TenantWriter for PgConnector {
    async fn insert_raw_event(&self, tenant: &TenantRecord, event: &RawEvent) -> Result<()> {
        let schema = tenant.schema()?;
        let pool = self.registry.get_pool(&tenant.coordinates)?;
        insert_raw_event(&pool, &schema, event).await
    }

    async fn bootstrap(&self, tenant: &TenantRecord) -> Result<SchemaName> {
        let schema = tenant.schema()?;
        let pool = self.registry.get_pool(&tenant.coordinates)?;
        bootstrap_tenant(&pool, &schema).await?;
        Ok(schema)
    }

    async fn register(&self, tenant: &TenantRecord) -> Result<()> {
        let master = self
            .master
            .as_ref()
            .ok_or_else(|| Error::config("tenant registration needs the master registry"))?;
        ensure_registry(master).await?;
        register_tenant(master, tenant).await
    }

    async fn insert_embedding(&self, tenant: &TenantRecord, record: &EmbeddingRecord) -> Result<()> {
        let schema = tenant.schema()?;
        let pool = self.registry.get_pool(&tenant.coordinates)?;
        insert_embedding(&pool, &schema, record).await
    }
}

/// A pooled connection holding an open transaction with its search path
/// pinned to one tenant schema.
pub struct PgTenantSession {
    client: Object,
    schema: SchemaName,
}

impl PgTenantSession {
    pub async fn begin(client: Object, schema: SchemaName) -> Result<Self> {
        client
            .batch_execute(&format!("BEGIN; SET LOCAL search_path TO {}, public", schema.quoted()))
            .await
            .map_err(|e| query_error("begin tenant transaction", e))?;
        debug!(schema = %schema, "Opened tenant session");
        Ok(Self { client, schema })
    }
}

#[async_trait]
impl TenantSession for PgTenantSession {
    fn schema(&self) -> &SchemaName {
        &self.schema
    }

    async fn fetch_unclassified(&self, limit: usize) -> Result<Vec<Interaction>> {
        let raw = self.schema.table(RAW_INTERACTIONS_TABLE)?;
        let results = self.schema.table(SENTIMENT_RESULTS_TABLE)?;
        let text = interaction_text_expr();
        let sql = format!(
            "SELECT r.raw_json->>'interaction_id' AS interaction_id, \
                    {text} AS text, \
                    r.raw_json->>'platform' AS platform \
             FROM {raw} r \
             WHERE r.raw_json->>'interaction_id' IS NOT NULL \
               AND {text} IS NOT NULL \
               AND NOT EXISTS ( \
                   SELECT 1 FROM {results} s \
                   WHERE s.interaction_id = r.raw_json->>'interaction_id') \
             LIMIT $1"
        );

        let rows = self
            .client
            .query(sql.as_str(), &[&(limit as i64)])
            .await
            .map_err(|e| query_error("fetch unclassified interactions", e))?;

        rows.iter()
            .map(|row| {
                Ok(Interaction {
                    interaction_id: row
                        .try_get("interaction_id")
                        .map_err(|e| query_error("read interaction_id", e))?,
                    text: row.try_get("text").map_err(|e| query_error("read text", e))?,
                    platform: row.try_get("platform").map_err(|e| query_error("read platform", e))?,
                })
            })
            .collect()
    }

    async fn insert_sentiment(&self, result: &SentimentResult) -> Result<bool> {
        let table = self.schema.table(SENTIMENT_RESULTS_TABLE)?;
        let sql = format!(
            "INSERT INTO {table} (interaction_id, sentiment, emotion, confidence, model_version) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (interaction_id) DO NOTHING"
        );

        let inserted = self
            .client
            .execute(
                sql.as_str(),
                &[
                    &result.interaction_id,
                    &result.sentiment.as_str(),
                    &result.emotion,
                    &result.confidence,
                    &result.model_version,
                ],
            )
            .await
            .map_err(|e| {
                Error::persistence(
                    DbErrorCode::StoreFailed,
                    format!("insert sentiment for {}: {}", result.interaction_id, e),
                )
            })?;

        Ok(inserted > 0)
    }

    async fn last_checkpoint(&self) -> Result<Option<DateTime<Utc>>> {
        let table = self.schema.table(SUMMARY_CHECKPOINT_TABLE)?;
        let sql = format!(
            "SELECT last_summarized_at::timestamptz FROM {table} \
             ORDER BY last_summarized_at DESC LIMIT 1"
        );

        let row = self
            .client
            .query_opt(sql.as_str(), &[])
            .await
            .map_err(|e| query_error("read summary checkpoint", e))?;

        row.map(|r| r.try_get(0).map_err(|e| query_error("read last_summarized_at", e)))
            .transpose()
    }

    async fn discover_tables(&self) -> Result<Vec<String>> {
        let rows = self
            .client
            .query(
                "SELECT table_name::text FROM information_schema.tables \
                 WHERE table_schema::text = $1 ORDER BY table_name",
                &[&self.schema.as_str()],
            )
            .await
            .map_err(|e| query_error("discover tables", e))?;

        rows.iter()
            .map(|r| r.try_get(0).map_err(|e| query_error("read table_name", e)))
            .collect()
    }

    async fn table_columns(&self, table: &Identifier) -> Result<Vec<String>> {
        let rows = self
            .client
            .query(
                "SELECT column_name::text FROM information_schema.columns \
                 WHERE table_schema::text = $1 AND table_name::text = $2 \
                 ORDER BY ordinal_position",
                &[&self.schema.as_str(), &table.as_str()],
            )
            .await
            .map_err(|e| query_error("list columns", e))?;

        rows.iter()
            .map(|r| r.try_get(0).map_err(|e| query_error("read column_name", e)))
            .collect()
    }

    async fn changed_rows(
        &self,
        table: &Identifier,
        columns: &[String],
        timestamp_column: &Identifier,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ChangedRow>> {
        let qualified = self.schema.table(table.as_str())?;
        let sql = format!(
            "SELECT row_to_json(t)::text FROM {qualified} t \
             WHERE t.{ts}::timestamptz > $1::timestamptz \
             LIMIT $2",
            ts = timestamp_column.quoted()
        );

        let rows = self
            .client
            .query(sql.as_str(), &[&since, &(limit as i64)])
            .await
            .map_err(|e| query_error(&format!("read changes from {}", table), e))?;

        let mut changed = Vec::with_capacity(rows.len());
        for row in rows {
            let json: String = row.try_get(0).map_err(|e| query_error("read row json", e))?;
            let object: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&json)?;
            let fields = columns
                .iter()
                .map(|column| {
                    let value = object
                        .get(column)
                        .map(render_json_value)
                        .unwrap_or_else(|| "null".to_string());
                    (column.clone(), value)
                })
                .collect();
            changed.push(ChangedRow::new(fields));
        }

        Ok(changed)
    }

    async fn insert_artifact(&self, artifact: &SummaryArtifact) -> Result<()> {
        let table = self.schema.table(POST_EMBEDDINGS_TABLE)?;
        let sql = format!("INSERT INTO {table} (post_id, payload, embedding) VALUES ($1, $2, $3)");

        let payload = serde_json::to_value(&artifact.payload)?;
        let embedding: Option<&Vec<f32>> = if artifact.embedding.is_empty() {
            warn!(schema = %self.schema, post_id = %artifact.id, "Storing summary without embedding");
            None
        } else {
            Some(&artifact.embedding)
        };

        self.client
            .execute(sql.as_str(), &[&artifact.id, &payload, &embedding])
            .await
            .map_err(|e| {
                Error::persistence(DbErrorCode::StoreFailed, format!("insert summary artifact: {}", e))
            })?;

        Ok(())
    }

    async fn append_checkpoint(&self, summary_type: &str) -> Result<DateTime<Utc>> {
        let table = self.schema.table(SUMMARY_CHECKPOINT_TABLE)?;
        let sql = format!(
            "INSERT INTO {table} (last_summarized_at, summary_type) \
             SELECT GREATEST(now(), COALESCE(MAX(last_summarized_at), now())), $1 FROM {table} \
             RETURNING last_summarized_at::timestamptz"
        );

        let row = self
            .client
            .query_one(sql.as_str(), &[&summary_type])
            .await
            .map_err(|e| {
                Error::persistence(DbErrorCode::StoreFailed, format!("append summary checkpoint: {}", e))
            })?;

        row.try_get(0).map_err(|e| query_error("read checkpoint", e))
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.client
            .batch_execute("COMMIT")
            .await
            .map_err(|e| Error::persistence(DbErrorCode::StoreFailed, format!("commit: {}", e)))?;
        debug!(schema = %self.schema, "Committed tenant session");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.client
            .batch_execute("ROLLBACK")
            .await
            .map_err(|e| query_error("rollback", e))?;
        debug!(schema = %self.schema, "Rolled back tenant session");
        Ok(())
    }
}
