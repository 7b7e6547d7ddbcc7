//! Worker scheduler for background tasks.

use std::sync::Arc;
use std::time::Duration;

use insight_core::limits::{
    DEFAULT_BATCH_SIZE, DEFAULT_CAPABILITY_TIMEOUT_SECS, DEFAULT_MAX_CONCURRENT_REQUESTS,
    DEFAULT_MAX_CONCURRENT_TENANTS, DEFAULT_POLL_INTERVAL_SECS, DEFAULT_SUMMARY_INTERVAL_SECS,
};
use llm_client::LanguageModel;
use telemetry::metrics;
use tenant_store::{TenantConnector, TenantDirectory};
use tokio::task::JoinHandle;
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::sentiment::SentimentWorker;
use crate::summary::SummaryWorker;

/// Worker scheduler configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Tenants processed concurrently per chunk
    pub max_concurrent_tenants: usize,
    /// Capability calls in flight across a chunk
    pub max_concurrent_requests: usize,
    /// Pause between sentiment cycles
    pub poll_interval: Duration,
    /// Interactions fetched per tenant per cycle
    pub batch_size: usize,
    /// Upper bound on each capability call
    pub capability_timeout: Duration,
    /// Summary cycle period; `None` disables the periodic trigger
    pub summary_interval: Option<Duration>,
    /// Metrics snapshot log interval
    pub metrics_log_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_tenants: DEFAULT_MAX_CONCURRENT_TENANTS,
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            batch_size: DEFAULT_BATCH_SIZE,
            capability_timeout: Duration::from_secs(DEFAULT_CAPABILITY_TIMEOUT_SECS),
            summary_interval: Some(Duration::from_secs(DEFAULT_SUMMARY_INTERVAL_SECS)),
            metrics_log_interval: Duration::from_secs(60),
        }
    }
}

/// Background worker scheduler.
pub struct WorkerScheduler {
    config: WorkerConfig,
    sentiment: Arc<SentimentWorker>,
    summary: Arc<SummaryWorker>,
}

impl WorkerScheduler {
    pub fn new(
        config: WorkerConfig,
        directory: Arc<dyn TenantDirectory>,
        connector: Arc<dyn TenantConnector>,
        model: Arc<dyn LanguageModel>,
    ) -> Self {
        let sentiment = Arc::new(SentimentWorker::new(
            Arc::clone(&directory),
            Arc::clone(&connector),
            Arc::clone(&model),
            config.clone(),
        ));
        let summary = Arc::new(SummaryWorker::new(directory, connector, model, config.clone()));
        Self {
            config,
            sentiment,
            summary,
        }
    }

    pub fn summary_worker(&self) -> &Arc<SummaryWorker> {
        &self.summary
    }

    /// Starts all background workers. Each stops when `cancel` fires.
    pub fn start(&self, cancel: CancellationToken) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();

        // Sentiment poll loop
        let sentiment = Arc::clone(&self.sentiment);
        let token = cancel.clone();
        handles.push(tokio::spawn(async move {
            sentiment.run(token).await;
        }));
        info!("Sentiment worker started");

        // Periodic summary trigger
        match self.config.summary_interval {
            Some(period) if !period.is_zero() => {
                let summary = Arc::clone(&self.summary);
                let token = cancel.clone();
                handles.push(tokio::spawn(async move {
                    run_summary_trigger(summary, period, token).await;
                }));
                info!(interval_secs = period.as_secs(), "Summary trigger started");
            }
            _ => warn!("Summary trigger disabled"),
        }

        // Metrics snapshot log
        let period = self.config.metrics_log_interval;
        handles.push(tokio::spawn(async move {
            run_metrics_log(period, cancel).await;
        }));

        info!("Background workers started");
        handles
    }
}

/// First cycle runs one full period after start.
///
/// Each cycle runs on its own task; a panicking cycle is logged and the
/// trigger keeps ticking.
async fn run_summary_trigger(summary: Arc<SummaryWorker>, period: Duration, cancel: CancellationToken) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let worker = Arc::clone(&summary);
                let mut cycle = tokio::spawn(async move { worker.run_cycle().await });

                tokio::select! {
                    _ = cancel.cancelled() => {
                        cycle.abort();
                        break;
                    }
                    joined = &mut cycle => {
                        if let Err(e) = joined {
                            metrics().summary_cycle_failures.inc();
                            error!(error = %e, "Summary cycle failed");
                        }
                    }
                }
            }
        }
    }
    info!("Summary trigger stopped");
}

async fn run_metrics_log(period: Duration, cancel: CancellationToken) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let s = metrics().snapshot();
                info!(
                    sentiment_cycles = s.sentiment_cycles,
                    summary_cycles = s.summary_cycles,
                    sentiment_tenants = s.sentiment_tenants_processed,
                    sentiment_tenant_failures = s.sentiment_tenant_failures,
                    summary_tenants = s.summary_tenants_processed,
                    summary_tenant_failures = s.summary_tenant_failures,
                    summary_cycle_failures = s.summary_cycle_failures,
                    interactions_classified = s.interactions_classified,
                    classification_fallbacks = s.classification_fallbacks,
                    summaries_written = s.summaries_written,
                    inflight_capability_calls = s.inflight_capability_calls,
                    capability_latency_mean_ms = s.capability_latency_mean_ms,
                    open_pools = s.open_pools,
                    raw_events_ingested = s.raw_events_ingested,
                    "Metrics snapshot"
                );
            }
        }
    }
}
