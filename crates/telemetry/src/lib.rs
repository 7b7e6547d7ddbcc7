//! Structured logging, in-process metrics, and dependency health for InsightIQ.

pub mod health;
pub mod metrics;
pub mod tracing_setup;

pub use health::*;
pub use metrics::*;
pub use tracing_setup::*;
