//! Background workers for InsightIQ.
//!
//! - Sentiment: polls every tenant for unclassified interactions
//! - Summary: incremental per-tenant summaries with checkpoints
//! - Scheduler: runs both plus a metrics log until cancelled

mod capability;
pub mod scheduler;
pub mod sentiment;
pub mod summary;

pub use scheduler::*;
pub use sentiment::{BatchOutcome, SentimentCycleReport, SentimentWorker};
pub use summary::{SummaryCycleReport, SummaryOutcome, SummaryWorker};
