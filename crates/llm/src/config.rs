//! Azure OpenAI connection settings.

use std::fmt;

use serde::{Deserialize, Serialize};

fn default_api_version() -> String {
    "2024-02-15-preview".to_string()
}

fn default_model_name() -> String {
    "gpt-4o".to_string()
}

fn default_embedding_deployment() -> String {
    "text-embedding-3-large".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Resource endpoint, e.g. `https://my-resource.openai.azure.com`
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Model name, recorded as the sentiment `model_version`
    #[serde(default = "default_model_name")]
    pub model_name: String,
    /// Chat deployment; falls back to `model_name` when unset
    #[serde(default)]
    pub chat_deployment: Option<String>,
    #[serde(default = "default_embedding_deployment")]
    pub embedding_deployment: String,
    /// HTTP timeout for one provider request, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            api_version: default_api_version(),
            model_name: default_model_name(),
            chat_deployment: None,
            embedding_deployment: default_embedding_deployment(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl LlmConfig {
    pub fn chat_deployment(&self) -> &str {
        self.chat_deployment
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or(&self.model_name)
    }

    pub fn is_configured(&self) -> bool {
        !self.endpoint.trim().is_empty() && !self.api_key.trim().is_empty()
    }

    fn deployment_url(&self, deployment: &str, operation: &str) -> String {
        format!(
            "{}/openai/deployments/{}/{}?api-version={}",
            self.endpoint.trim_end_matches('/'),
            deployment,
            operation,
            self.api_version
        )
    }

    pub fn chat_url(&self) -> String {
        self.deployment_url(self.chat_deployment(), "chat/completions")
    }

    pub fn embeddings_url(&self) -> String {
        self.deployment_url(&self.embedding_deployment, "embeddings")
    }
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .field("api_version", &self.api_version)
            .field("model_name", &self.model_name)
            .field("chat_deployment", &self.chat_deployment)
            .field("embedding_deployment", &self.embedding_deployment)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}
