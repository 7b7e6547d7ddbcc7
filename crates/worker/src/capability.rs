//! Timeout and bookkeeping around external capability calls.

use std::future::Future;
use std::time::{Duration, Instant};

use llm_client::CapabilityError;
use telemetry::{health, metrics};

/// Decrements the in-flight gauge even if the call is cancelled.
struct InflightGuard;

impl InflightGuard {
    fn enter() -> Self {
        metrics().inflight_capability_calls.inc();
        Self
    }
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        metrics().inflight_capability_calls.dec();
    }
}

/// Runs one capability call with an upper time bound. No retries.
pub(crate) async fn bounded<T, F>(timeout: Duration, call: F) -> Result<T, CapabilityError>
where
    F: Future<Output = Result<T, CapabilityError>>,
{
    let _inflight = InflightGuard::enter();
    let started = Instant::now();

    let result = match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(CapabilityError::Timeout(timeout.as_secs())),
    };

    metrics()
        .capability_latency_ms
        .observe(started.elapsed().as_millis() as u64);
    health().llm.observe(&result);

    result
}
