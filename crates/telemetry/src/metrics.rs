//! Internal metrics collection.
//!
//! Collects metrics in-memory; the worker scheduler logs periodic snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A counter metric.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// A gauge metric (can go up or down).
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn set(&self, val: u64) {
        self.0.store(val, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// Saturates at zero.
    pub fn dec(&self) {
        let _ = self
            .0
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| Some(v.saturating_sub(1)));
    }
}

/// Histogram for latency tracking.
#[derive(Debug)]
pub struct Histogram {
    /// Buckets: 10ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s, 30s, 60s
    buckets: [AtomicU64; 11],
    sum: AtomicU64,
    count: AtomicU64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    const BUCKET_BOUNDS: [u64; 11] = [10, 50, 100, 250, 500, 1000, 2500, 5000, 10000, 30000, 60000];

    pub fn new() -> Self {
        Self {
            buckets: Default::default(),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Records a value in milliseconds.
    pub fn observe(&self, ms: u64) {
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        let idx = Self::BUCKET_BOUNDS
            .iter()
            .position(|&bound| ms <= bound)
            .unwrap_or(Self::BUCKET_BOUNDS.len() - 1);
        self.buckets[idx].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn sum(&self) -> u64 {
        self.sum.load(Ordering::Relaxed)
    }

    pub fn mean(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            0.0
        } else {
            self.sum() as f64 / count as f64
        }
    }

    /// Returns bucket counts.
    pub fn buckets(&self) -> Vec<(u64, u64)> {
        Self::BUCKET_BOUNDS
            .iter()
            .zip(self.buckets.iter())
            .map(|(&bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

/// Collected metrics for the workers and ingest path.
#[derive(Debug, Default)]
pub struct Metrics {
    pub tenant_enumeration_failures: Counter,

    // Sentiment pipeline
    pub sentiment_cycles: Counter,
    pub sentiment_cycle_failures: Counter,
    pub sentiment_tenants_processed: Counter,
    pub sentiment_tenant_failures: Counter,
    pub interactions_classified: Counter,
    pub classification_fallbacks: Counter,
    pub sentiment_rows_inserted: Counter,

    // Summary pipeline
    pub summary_cycles: Counter,
    pub summary_cycle_failures: Counter,
    pub summary_tenants_processed: Counter,
    pub summary_tenant_failures: Counter,
    pub summaries_written: Counter,
    pub summary_tables_skipped: Counter,
    pub summary_capability_failures: Counter,

    // Ingest and analysis
    pub raw_events_ingested: Counter,
    pub ingest_failures: Counter,
    pub analyses_stored: Counter,
    pub analysis_failures: Counter,

    // Latency histograms
    pub capability_latency_ms: Histogram,
    pub sentiment_tenant_latency_ms: Histogram,
    pub sentiment_cycle_latency_ms: Histogram,
    pub summary_tenant_latency_ms: Histogram,
    pub summary_cycle_latency_ms: Histogram,

    // Gauges
    pub inflight_capability_calls: Gauge,
    pub active_tenants: Gauge,
    pub open_pools: Gauge,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub tenant_enumeration_failures: u64,
    pub sentiment_cycles: u64,
    pub sentiment_cycle_failures: u64,
    pub sentiment_tenants_processed: u64,
    pub sentiment_tenant_failures: u64,
    pub interactions_classified: u64,
    pub classification_fallbacks: u64,
    pub sentiment_rows_inserted: u64,
    pub summary_cycles: u64,
    pub summary_cycle_failures: u64,
    pub summary_tenants_processed: u64,
    pub summary_tenant_failures: u64,
    pub summaries_written: u64,
    pub summary_tables_skipped: u64,
    pub summary_capability_failures: u64,
    pub raw_events_ingested: u64,
    pub ingest_failures: u64,
    pub analyses_stored: u64,
    pub analysis_failures: u64,
    pub capability_latency_mean_ms: f64,
    pub sentiment_tenant_latency_mean_ms: f64,
    pub sentiment_cycle_latency_mean_ms: f64,
    pub summary_tenant_latency_mean_ms: f64,
    pub summary_cycle_latency_mean_ms: f64,
    pub inflight_capability_calls: u64,
    pub active_tenants: u64,
    pub open_pools: u64,
}

impl Metrics {
    /// Takes a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            tenant_enumeration_failures: self.tenant_enumeration_failures.get(),
            sentiment_cycles: self.sentiment_cycles.get(),
            sentiment_cycle_failures: self.sentiment_cycle_failures.get(),
            sentiment_tenants_processed: self.sentiment_tenants_processed.get(),
            sentiment_tenant_failures: self.sentiment_tenant_failures.get(),
            interactions_classified: self.interactions_classified.get(),
            classification_fallbacks: self.classification_fallbacks.get(),
            sentiment_rows_inserted: self.sentiment_rows_inserted.get(),
            summary_cycles: self.summary_cycles.get(),
            summary_cycle_failures: self.summary_cycle_failures.get(),
            summary_tenants_processed: self.summary_tenants_processed.get(),
            summary_tenant_failures: self.summary_tenant_failures.get(),
            summaries_written: self.summaries_written.get(),
            summary_tables_skipped: self.summary_tables_skipped.get(),
            summary_capability_failures: self.summary_capability_failures.get(),
            raw_events_ingested: self.raw_events_ingested.get(),
            ingest_failures: self.ingest_failures.get(),
            analyses_stored: self.analyses_stored.get(),
            analysis_failures: self.analysis_failures.get(),
            capability_latency_mean_ms: self.capability_latency_ms.mean(),
            sentiment_tenant_latency_mean_ms: self.sentiment_tenant_latency_ms.mean(),
            sentiment_cycle_latency_mean_ms: self.sentiment_cycle_latency_ms.mean(),
            summary_tenant_latency_mean_ms: self.summary_tenant_latency_ms.mean(),
            summary_cycle_latency_mean_ms: self.summary_cycle_latency_ms.mean(),
            inflight_capability_calls: self.inflight_capability_calls.get(),
            active_tenants: self.active_tenants.get(),
            open_pools: self.open_pools.get(),
        }
    }
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}
