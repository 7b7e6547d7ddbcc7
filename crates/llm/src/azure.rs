//! Azure OpenAI implementation over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use insight_core::Classification;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::capability::LanguageModel;
use crate::config::LlmConfig;
use crate::error::CapabilityError;
use crate::prompts::{
    parse_classification, payload_summary_prompt, sentiment_user_prompt, table_summary_prompt,
    SENTIMENT_SYSTEM_PROMPT, SUMMARY_SYSTEM_PROMPT,
};

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    input: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

pub struct AzureOpenAiClient {
    client: reqwest::Client,
    config: LlmConfig,
}

impl AzureOpenAiClient {
    pub fn new(config: LlmConfig) -> Result<Self, CapabilityError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| CapabilityError::Transport(e.to_string()))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    async fn post<T: Serialize + ?Sized>(&self, url: String, body: &T) -> Result<reqwest::Response, CapabilityError> {
        let response = self
            .client
            .post(url)
            .header("api-key", &self.config.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CapabilityError::Timeout(self.config.timeout_secs)
                } else {
                    CapabilityError::from(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CapabilityError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn chat(
        &self,
        system: &str,
        user: &str,
        json_mode: bool,
    ) -> Result<String, CapabilityError> {
        let request = ChatRequest {
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            response_format: json_mode.then_some(ResponseFormat { kind: "json_object" }),
        };

        let body: ChatResponse = self.post(self.config.chat_url(), &request).await?.json().await?;
        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(CapabilityError::Empty)
    }
}

#[async_trait]
impl LanguageModel for AzureOpenAiClient {
    async fn classify(&self, text: &str) -> Result<Classification, CapabilityError> {
        let content = self
            .chat(SENTIMENT_SYSTEM_PROMPT, &sentiment_user_prompt(text), true)
            .await?;
        parse_classification(&content)
    }

    async fn summarize(&self, table: &str, changes: &str) -> Result<String, CapabilityError> {
        let summary = self
            .chat(SUMMARY_SYSTEM_PROMPT, &table_summary_prompt(table, changes), false)
            .await?;
        debug!(table = %table, chars = summary.len(), "Generated table summary");
        Ok(summary)
    }

    async fn summarize_payload(&self, instruction: &str, payload: &str) -> Result<String, CapabilityError> {
        self.chat(SUMMARY_SYSTEM_PROMPT, &payload_summary_prompt(instruction, payload), false)
            .await
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, CapabilityError> {
        let body: EmbeddingResponse = self
            .post(self.config.embeddings_url(), &EmbeddingRequest { input: [text] })
            .await?
            .json()
            .await?;
        body.data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .filter(|e| !e.is_empty())
            .ok_or(CapabilityError::Empty)
    }

    fn model_version(&self) -> &str {
        &self.config.model_name
    }
}
