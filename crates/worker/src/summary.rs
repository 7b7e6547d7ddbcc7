//! Incremental summary worker.
//!
//! One cycle visits every tenant in turn. For each, rows changed since the
//! last checkpoint are summarized per table, the partial summaries are
//! concatenated and embedded, and the artifact plus a new checkpoint are
//! committed together.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use insight_core::limits::{summary_epoch, SUMMARY_ROW_CAP, SUMMARY_TYPE};
use insight_core::{
    concatenate_partials, is_summarizable_table, pick_timestamp_column, render_changes, Error, Identifier, Result,
    SummaryArtifact, TableSummary, TenantRecord,
};
use llm_client::LanguageModel;
use telemetry::metrics;
use tenant_store::{list_tenants, TenantConnector, TenantDirectory, TenantSession};
use tracing::{debug, error, info, warn};

use crate::capability::bounded;
use crate::scheduler::WorkerConfig;

/// What a tenant's summary cycle did.
#[derive(Debug, Clone, PartialEq)]
pub enum SummaryOutcome {
    /// Nothing changed since the checkpoint; nothing was written.
    NoChanges,
    Written { artifact_id: String, tables: usize },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SummaryCycleReport {
    pub tenants: usize,
    pub failed_tenants: usize,
    pub written: usize,
}

pub struct SummaryWorker {
    directory: Arc<dyn TenantDirectory>,
    connector: Arc<dyn TenantConnector>,
    model: Arc<dyn LanguageModel>,
    config: WorkerConfig,
}

impl SummaryWorker {
    pub fn new(
        directory: Arc<dyn TenantDirectory>,
        connector: Arc<dyn TenantConnector>,
        model: Arc<dyn LanguageModel>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            directory,
            connector,
            model,
            config,
        }
    }

    /// One full pass over all tenants, sequentially.
    pub async fn run_cycle(&self) -> SummaryCycleReport {
        let started = Instant::now();
        let tenants = list_tenants(self.directory.as_ref()).await;
        info!(count = tenants.len(), "Found active tenants for summarization");

        let mut report = SummaryCycleReport {
            tenants: tenants.len(),
            ..Default::default()
        };

        for tenant in &tenants {
            match self.process_tenant(tenant).await {
                Ok(SummaryOutcome::Written { .. }) => report.written += 1,
                Ok(SummaryOutcome::NoChanges) => {}
                Err(e) => {
                    report.failed_tenants += 1;
                    error!(tenant_id = %tenant.tenant_id, error = %e, "Failed summary for tenant");
                }
            }
        }

        metrics().summary_cycles.inc();
        metrics()
            .summary_cycle_latency_ms
            .observe(started.elapsed().as_millis() as u64);
        info!(
            tenants = report.tenants,
            failed = report.failed_tenants,
            written = report.written,
            "Summary cycle complete"
        );
        report
    }

    pub async fn process_tenant(&self, tenant: &TenantRecord) -> Result<SummaryOutcome> {
        let started = Instant::now();
        let result = self.process_tenant_inner(tenant).await;
        metrics()
            .summary_tenant_latency_ms
            .observe(started.elapsed().as_millis() as u64);

        match &result {
            Ok(_) => metrics().summary_tenants_processed.inc(),
            Err(_) => metrics().summary_tenant_failures.inc(),
        }
        result
    }

    async fn process_tenant_inner(&self, tenant: &TenantRecord) -> Result<SummaryOutcome> {
        let session = self.connector.open(tenant).await?;

        match self.summarize(session.as_ref()).await {
            Ok(None) => {
                info!(tenant_id = %tenant.tenant_id, "No new changes");
                session.rollback().await?;
                Ok(SummaryOutcome::NoChanges)
            }
            Ok(Some(artifact)) => {
                session.commit().await?;
                metrics().summaries_written.inc();
                info!(
                    tenant_id = %tenant.tenant_id,
                    artifact_id = %artifact.id,
                    tables = artifact.payload.source_tables_count,
                    "Saved summary and advanced checkpoint"
                );
                Ok(SummaryOutcome::Written {
                    tables: artifact.payload.source_tables_count,
                    artifact_id: artifact.id,
                })
            }
            Err(e) => {
                if let Err(rollback_error) = session.rollback().await {
                    warn!(tenant_id = %tenant.tenant_id, error = %rollback_error, "Rollback failed");
                }
                Err(e)
            }
        }
    }

    /// Builds and stores the artifact. Returns `None` when no table produced
    /// a partial summary, in which case nothing was written.
    async fn summarize(&self, session: &dyn TenantSession) -> Result<Option<SummaryArtifact>> {
        let since = session.last_checkpoint().await?.unwrap_or_else(summary_epoch);
        debug!(schema = %session.schema(), since = %since, "Last summary checkpoint");

        let tables = session.discover_tables().await?;
        let mut partials = Vec::new();

        for table in tables.iter().filter(|t| is_summarizable_table(t)) {
            if let Some(partial) = self.summarize_table(session, table, since).await? {
                partials.push(partial);
            }
        }

        if partials.is_empty() {
            return Ok(None);
        }

        let summary = concatenate_partials(&partials);
        let embedding = match bounded(self.config.capability_timeout, self.model.embed(&summary)).await {
            Ok(vector) => vector,
            Err(e) => {
                metrics().summary_capability_failures.inc();
                warn!(schema = %session.schema(), error = %e, "Embedding failed, storing summary without it");
                Vec::new()
            }
        };

        let artifact = SummaryArtifact::from_partials(&partials, embedding, Utc::now());
        session.insert_artifact(&artifact).await?;
        session.append_checkpoint(SUMMARY_TYPE).await?;
        Ok(Some(artifact))
    }

    /// Partial summary for one table, or `None` when the table is skipped.
    ///
    /// A failed summary call fails the whole tenant so the window is
    /// re-read next cycle.
    async fn summarize_table(
        &self,
        session: &dyn TenantSession,
        table: &str,
        since: chrono::DateTime<Utc>,
    ) -> Result<Option<TableSummary>> {
        let identifier = match Identifier::parse(table) {
            Ok(identifier) => identifier,
            Err(e) => {
                metrics().summary_tables_skipped.inc();
                warn!(schema = %session.schema(), table = %table, error = %e, "Skipping table with unsafe name");
                return Ok(None);
            }
        };

        let columns = session.table_columns(&identifier).await?;
        let Some(timestamp_column) = pick_timestamp_column(&columns) else {
            metrics().summary_tables_skipped.inc();
            debug!(table = %table, "No change-tracking column, skipping");
            return Ok(None);
        };
        let timestamp_column = Identifier::parse(timestamp_column)?;

        let rows = session
            .changed_rows(&identifier, &columns, &timestamp_column, since, SUMMARY_ROW_CAP)
            .await?;
        if rows.is_empty() {
            return Ok(None);
        }
        info!(schema = %session.schema(), table = %table, rows = rows.len(), "Summarizing changes");

        let changes = render_changes(&rows);
        let summary = bounded(self.config.capability_timeout, self.model.summarize(table, &changes))
            .await
            .map_err(|e| {
                metrics().summary_capability_failures.inc();
                warn!(schema = %session.schema(), table = %table, error = %e, "Table summary failed");
                Error::capability(format!("summarize {}: {}", table, e))
            })?;

        Ok(Some(TableSummary {
            table: table.to_string(),
            summary,
        }))
    }
}
