//! DDL for the master registry and for tenant schemas.
//!
//! Every statement is idempotent, so bootstrapping an existing tenant is a
//! no-op.

use deadpool_postgres::Pool;
use insight_core::error::DbErrorCode;
use insight_core::limits::{
    POST_EMBEDDINGS_TABLE, RAW_EVENTS_TABLE, RAW_INTERACTIONS_TABLE, SENTIMENT_RESULTS_TABLE,
    SUMMARY_CHECKPOINT_TABLE,
};
use insight_core::{Error, Result, SchemaName, TenantRecord};
use tracing::info;

/// Tenant directory table in the master database.
pub const CREATE_TENANT_REGISTRY: &str = r#"
CREATE TABLE IF NOT EXISTS tenant_registry (
    tenant_id   TEXT PRIMARY KEY,
    host        TEXT NOT NULL,
    port        INTEGER NOT NULL DEFAULT 5432,
    db_name     TEXT NOT NULL,
    db_user     TEXT NOT NULL,
    db_password TEXT NOT NULL,
    active      BOOLEAN NOT NULL DEFAULT TRUE,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT now()
)
"#;

/// Raw ingest envelope, one row per accepted payload.
const CREATE_RAW_EVENTS: &str = r#"
CREATE TABLE IF NOT EXISTS {table} (
    id             BIGSERIAL PRIMARY KEY,
    brand_id       TEXT NOT NULL,
    domain         TEXT NOT NULL,
    platform       TEXT,
    raw_json       JSONB NOT NULL,
    schema_version TEXT NOT NULL DEFAULT 'v1',
    payload_hash   TEXT NOT NULL,
    ingested_at    TIMESTAMPTZ NOT NULL DEFAULT now()
)
"#;

/// Social interactions as delivered by connectors.
const CREATE_RAW_INTERACTIONS: &str = r#"
CREATE TABLE IF NOT EXISTS {table} (
    id          BIGSERIAL PRIMARY KEY,
    raw_json    JSONB NOT NULL,
    ingested_at TIMESTAMPTZ NOT NULL DEFAULT now()
)
"#;

const CREATE_SENTIMENT_RESULTS: &str = r#"
CREATE TABLE IF NOT EXISTS {table} (
    interaction_id TEXT PRIMARY KEY,
    sentiment      TEXT NOT NULL CHECK (sentiment IN ('positive', 'neutral', 'negative')),
    emotion        TEXT,
    confidence     DOUBLE PRECISION NOT NULL DEFAULT 0,
    model_version  TEXT NOT NULL,
    created_at     TIMESTAMPTZ NOT NULL DEFAULT now()
)
"#;

const CREATE_SUMMARY_CHECKPOINT: &str = r#"
CREATE TABLE IF NOT EXISTS {table} (
    id                 BIGSERIAL PRIMARY KEY,
    last_summarized_at TIMESTAMPTZ NOT NULL,
    summary_type       TEXT NOT NULL
)
"#;

const CREATE_POST_EMBEDDINGS: &str = r#"
CREATE TABLE IF NOT EXISTS {table} (
    id         BIGSERIAL PRIMARY KEY,
    post_id    TEXT NOT NULL,
    payload    JSONB NOT NULL,
    embedding  REAL[],
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
)
"#;

/// Table DDL templates in creation order.
const TENANT_TABLES: &[(&str, &str)] = &[
    (RAW_EVENTS_TABLE, CREATE_RAW_EVENTS),
    (RAW_INTERACTIONS_TABLE, CREATE_RAW_INTERACTIONS),
    (SENTIMENT_RESULTS_TABLE, CREATE_SENTIMENT_RESULTS),
    (SUMMARY_CHECKPOINT_TABLE, CREATE_SUMMARY_CHECKPOINT),
    (POST_EMBEDDINGS_TABLE, CREATE_POST_EMBEDDINGS),
];

/// Renders every statement needed to provision `schema`.
pub fn tenant_ddl(schema: &SchemaName) -> Result<Vec<String>> {
    let mut statements = vec![format!("CREATE SCHEMA IF NOT EXISTS {}", schema.quoted())];
    for (table, template) in TENANT_TABLES {
        let qualified = schema.table(table)?;
        statements.push(template.replace("{table}", qualified.as_str()));
    }
    Ok(statements)
}

async fn execute_all(pool: &Pool, statements: &[String]) -> Result<()> {
    let mut client = pool.get().await.map_err(|e| {
        Error::persistence(DbErrorCode::PoolUnavailable, format!("checkout for DDL failed: {}", e))
    })?;
    let tx = client
        .transaction()
        .await
        .map_err(|e| Error::persistence(DbErrorCode::QueryFailed, format!("begin DDL: {}", e)))?;

    for ddl in statements {
        tx.batch_execute(ddl)
            .await
            .map_err(|e| Error::persistence(DbErrorCode::QueryFailed, format!("Failed to execute DDL: {}", e)))?;
    }

    tx.commit()
        .await
        .map_err(|e| Error::persistence(DbErrorCode::QueryFailed, format!("commit DDL: {}", e)))
}

/// Creates the tenant registry table in the master database.
pub async fn ensure_registry(master: &Pool) -> Result<()> {
    execute_all(master, &[CREATE_TENANT_REGISTRY.to_string()]).await?;
    info!("Tenant registry ready");
    Ok(())
}

/// Creates the tenant's schema and tables.
pub async fn bootstrap_tenant(pool: &Pool, schema: &SchemaName) -> Result<()> {
    execute_all(pool, &tenant_ddl(schema)?).await?;
    info!(schema = %schema, "Tenant schema ready");
    Ok(())
}

/// Upserts a tenant into the registry and marks it active.
pub async fn register_tenant(master: &Pool, tenant: &TenantRecord) -> Result<()> {
    tenant.schema()?;
    let client = master.get().await.map_err(|e| {
        Error::persistence(DbErrorCode::PoolUnavailable, format!("master checkout failed: {}", e))
    })?;
    let c = &tenant.coordinates;
    client
        .execute(
            "INSERT INTO tenant_registry (tenant_id, host, port, db_name, db_user, db_password, active) \
             VALUES ($1, $2, $3, $4, $5, $6, TRUE) \
             ON CONFLICT (tenant_id) DO UPDATE SET \
                 host = EXCLUDED.host, port = EXCLUDED.port, db_name = EXCLUDED.db_name, \
                 db_user = EXCLUDED.db_user, db_password = EXCLUDED.db_password, active = TRUE",
            &[&tenant.tenant_id, &c.host, &i32::from(c.port), &c.db_name, &c.user, &c.password],
        )
        .await
        .map_err(|e| Error::persistence(DbErrorCode::StoreFailed, format!("register tenant: {}", e)))?;
    info!(tenant_id = %tenant.tenant_id, host = %c.host, db = %c.db_name, "Registered tenant");
    Ok(())
}
