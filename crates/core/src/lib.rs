//! Core types, tenant schema naming, and validation for InsightIQ.

pub mod analysis;
pub mod error;
pub mod interaction;
pub mod limits;
pub mod raw_event;
pub mod schema;
pub mod summary;
pub mod tenant;

pub use analysis::{AnalysisDigest, AnalysisRequest, EmbeddingRecord};
pub use error::{Error, Result};
pub use interaction::*;
pub use raw_event::*;
pub use schema::{qualify, schema_for, Identifier, QualifiedName, SchemaName};
pub use summary::*;
pub use tenant::*;
