//! Raw event and analysis persistence for the ingest API.

use deadpool_postgres::Pool;
use insight_core::error::DbErrorCode;
use insight_core::limits::{POST_EMBEDDINGS_TABLE, RAW_EVENTS_TABLE};
use insight_core::{EmbeddingRecord, Error, RawEvent, Result, SchemaName};
use telemetry::metrics;
use tracing::debug;

/// Inserts one raw event into the tenant's `raw_events` table.
pub async fn insert_raw_event(pool: &Pool, schema: &SchemaName, event: &RawEvent) -> Result<()> {
    let table = schema.table(RAW_EVENTS_TABLE)?;
    let client = pool.get().await.map_err(|e| {
        Error::persistence(DbErrorCode::PoolUnavailable, format!("checkout failed: {}", e))
    })?;

    let sql = format!(
        "INSERT INTO {table} (brand_id, domain, platform, raw_json, schema_version, payload_hash) \
         VALUES ($1, $2, $3, $4, $5, $6)"
    );

    client
        .execute(
            sql.as_str(),
            &[
                &event.brand_id,
                &event.domain,
                &event.platform,
                &event.payload,
                &event.schema_version,
                &event.payload_hash,
            ],
        )
        .await
        .map_err(|e| {
            metrics().ingest_failures.inc();
            Error::persistence(DbErrorCode::StoreFailed, format!("insert raw event: {}", e))
        })?;

    metrics().raw_events_ingested.inc();
    debug!(schema = %schema, domain = %event.domain, hash = %event.payload_hash, "Stored raw event");
    Ok(())
}

/// Inserts one analysed document into the tenant's `post_embeddings` table.
pub async fn insert_embedding(pool: &Pool, schema: &SchemaName, record: &EmbeddingRecord) -> Result<()> {
    let table = schema.table(POST_EMBEDDINGS_TABLE)?;
    let client = pool.get().await.map_err(|e| {
        Error::persistence(DbErrorCode::PoolUnavailable, format!("checkout failed: {}", e))
    })?;

    let sql = format!("INSERT INTO {table} (post_id, payload, embedding) VALUES ($1, $2, $3)");
    let embedding = (!record.embedding.is_empty()).then_some(&record.embedding);

    client
        .execute(sql.as_str(), &[&record.post_id, &record.payload, &embedding])
        .await
        .map_err(|e| {
            metrics().analysis_failures.inc();
            Error::persistence(DbErrorCode::StoreFailed, format!("insert analysis: {}", e))
        })?;

    metrics().analyses_stored.inc();
    debug!(schema = %schema, post_id = %record.post_id, "Stored analysis");
    Ok(())
}
