//! Sentiment worker: classifies new social interactions for every tenant.

use std::sync::Arc;
use std::time::Instant;

use futures_util::future::join_all;
use insight_core::{Classification, Interaction, Result, SentimentResult, TenantRecord};
use llm_client::LanguageModel;
use telemetry::metrics;
use tenant_store::{list_tenants, TenantConnector, TenantDirectory, TenantSession};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::capability::bounded;
use crate::scheduler::WorkerConfig;

/// Outcome of one tenant's batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub fetched: usize,
    pub inserted: usize,
    pub fallbacks: usize,
}

/// Totals for one pass over all tenants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SentimentCycleReport {
    pub tenants: usize,
    pub failed_tenants: usize,
    pub fetched: usize,
    pub inserted: usize,
    pub fallbacks: usize,
}

pub struct SentimentWorker {
    directory: Arc<dyn TenantDirectory>,
    connector: Arc<dyn TenantConnector>,
    model: Arc<dyn LanguageModel>,
    config: WorkerConfig,
    /// Shared by every tenant in a chunk, not per tenant.
    requests: Arc<Semaphore>,
}

impl SentimentWorker {
    pub fn new(
        directory: Arc<dyn TenantDirectory>,
        connector: Arc<dyn TenantConnector>,
        model: Arc<dyn LanguageModel>,
        config: WorkerConfig,
    ) -> Self {
        let requests = Arc::new(Semaphore::new(config.max_concurrent_requests.max(1)));
        Self {
            directory,
            connector,
            model,
            config,
            requests,
        }
    }

    /// Poll loop: run a cycle, sleep, repeat until cancelled.
    ///
    /// Each cycle runs on its own task so a panic inside it is contained and
    /// logged like any other cycle failure. Cancelling aborts an in-progress
    /// cycle; its open transactions are rolled back when their connections
    /// return to the pool.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        info!(
            poll_interval_secs = self.config.poll_interval.as_secs(),
            max_concurrent_tenants = self.config.max_concurrent_tenants,
            max_concurrent_requests = self.config.max_concurrent_requests,
            batch_size = self.config.batch_size,
            "Sentiment worker starting"
        );

        loop {
            let worker = Arc::clone(&self);
            let mut cycle = tokio::spawn(async move { worker.run_cycle().await });

            tokio::select! {
                _ = cancel.cancelled() => {
                    cycle.abort();
                    break;
                }
                joined = &mut cycle => {
                    if let Err(e) = joined {
                        metrics().sentiment_cycle_failures.inc();
                        error!(error = %e, "Sentiment cycle failed");
                    }
                }
            }

            debug!(secs = self.config.poll_interval.as_secs(), "Sleeping");
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }

        info!("Sentiment worker stopped");
    }

    /// One pass: tenants are processed in chunks of `max_concurrent_tenants`,
    /// concurrently within a chunk and sequentially across chunks.
    pub async fn run_cycle(&self) -> SentimentCycleReport {
        let started = Instant::now();
        let tenants = list_tenants(self.directory.as_ref()).await;
        info!(count = tenants.len(), "Found active tenants");

        let mut report = SentimentCycleReport {
            tenants: tenants.len(),
            ..Default::default()
        };

        for chunk in tenants.chunks(self.config.max_concurrent_tenants.max(1)) {
            let outcomes = join_all(chunk.iter().map(|tenant| self.process_tenant(tenant))).await;

            for (tenant, outcome) in chunk.iter().zip(outcomes) {
                match outcome {
                    Ok(batch) => {
                        report.fetched += batch.fetched;
                        report.inserted += batch.inserted;
                        report.fallbacks += batch.fallbacks;
                    }
                    Err(e) => {
                        report.failed_tenants += 1;
                        error!(tenant_id = %tenant.tenant_id, error = %e, "Failed processing tenant");
                    }
                }
            }
        }

        metrics().sentiment_cycles.inc();
        metrics()
            .sentiment_cycle_latency_ms
            .observe(started.elapsed().as_millis() as u64);
        info!(
            tenants = report.tenants,
            failed = report.failed_tenants,
            inserted = report.inserted,
            fallbacks = report.fallbacks,
            "Sentiment cycle complete"
        );
        report
    }

    /// Classifies one tenant's batch inside a single transaction.
    ///
    /// Commits once after every row is written; any error rolls the whole
    /// batch back. An empty batch ends without writing anything.
    pub async fn process_tenant(&self, tenant: &TenantRecord) -> Result<BatchOutcome> {
        let started = Instant::now();
        metrics().active_tenants.inc();
        let result = self.process_tenant_inner(tenant).await;
        metrics().active_tenants.dec();
        metrics()
            .sentiment_tenant_latency_ms
            .observe(started.elapsed().as_millis() as u64);

        match &result {
            Ok(_) => metrics().sentiment_tenants_processed.inc(),
            Err(_) => metrics().sentiment_tenant_failures.inc(),
        }
        result
    }

    async fn process_tenant_inner(&self, tenant: &TenantRecord) -> Result<BatchOutcome> {
        debug!(tenant_id = %tenant.tenant_id, "Processing tenant");
        let session = self.connector.open(tenant).await?;

        match self.classify_batch(session.as_ref()).await {
            Ok(outcome) if outcome.fetched == 0 => {
                info!(tenant_id = %tenant.tenant_id, "No new interactions");
                session.rollback().await?;
                Ok(outcome)
            }
            Ok(outcome) => {
                session.commit().await?;
                info!(
                    tenant_id = %tenant.tenant_id,
                    fetched = outcome.fetched,
                    inserted = outcome.inserted,
                    "Committed sentiment batch"
                );
                Ok(outcome)
            }
            Err(e) => {
                if let Err(rollback_error) = session.rollback().await {
                    warn!(tenant_id = %tenant.tenant_id, error = %rollback_error, "Rollback failed");
                }
                Err(e)
            }
        }
    }

    async fn classify_batch(&self, session: &dyn TenantSession) -> Result<BatchOutcome> {
        let interactions = session.fetch_unclassified(self.config.batch_size).await?;
        if interactions.is_empty() {
            return Ok(BatchOutcome::default());
        }
        debug!(schema = %session.schema(), count = interactions.len(), "Analyzing interactions");

        let classified = join_all(interactions.iter().map(|i| self.classify(i))).await;

        let mut outcome = BatchOutcome {
            fetched: interactions.len(),
            ..Default::default()
        };
        for (interaction, (classification, fell_back)) in interactions.iter().zip(classified) {
            if fell_back {
                outcome.fallbacks += 1;
            }
            let result = SentimentResult::from_classification(
                interaction.interaction_id.clone(),
                classification,
                self.model.model_version(),
            );
            if session.insert_sentiment(&result).await? {
                outcome.inserted += 1;
            }
        }

        metrics().sentiment_rows_inserted.inc_by(outcome.inserted as u64);
        Ok(outcome)
    }

    /// Returns the classification and whether it is the fallback.
    async fn classify(&self, interaction: &Interaction) -> (Classification, bool) {
        // Acquire only fails on a closed semaphore, and this one is never closed.
        let _permit = self.requests.acquire().await.ok();

        match bounded(self.config.capability_timeout, self.model.classify(&interaction.text)).await {
            Ok(classification) => {
                metrics().interactions_classified.inc();
                (classification, false)
            }
            Err(e) => {
                metrics().classification_fallbacks.inc();
                warn!(
                    interaction_id = %interaction.interaction_id,
                    error = %e,
                    "Classification failed, storing neutral fallback"
                );
                (Classification::fallback(), true)
            }
        }
    }
}
