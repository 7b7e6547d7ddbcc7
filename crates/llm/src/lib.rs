//! Language-model capabilities for InsightIQ.

pub mod azure;
pub mod capability;
pub mod config;
pub mod error;
pub mod prompts;

pub use azure::AzureOpenAiClient;
pub use capability::LanguageModel;
pub use config::LlmConfig;
pub use error::CapabilityError;
