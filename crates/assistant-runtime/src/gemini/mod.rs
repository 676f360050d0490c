//! Gemini Provider
//!
//! Google Generative Language REST API (`generateContent`, and
//! `streamGenerateContent` with `alt=sse`). Gemini takes the system prompt
//! as `systemInstruction`, structured function arguments, and issues no
//! call ids.

pub mod messages;
pub mod schema;

use std::time::Duration;

use assistant_core::{
    error::{AgentError, Result},
    message::Message,
    provider::{CompletionStream, LlmProvider, ProviderCapabilities, SystemPromptMode},
    schema::ToolSchema,
};
use async_trait::async_trait;
use futures::StreamExt;

use crate::error::{ProviderError, check_status};
use crate::stream::sse_events;
use messages::{GenerateContentResponse, from_response, to_delta, to_request};

const PROVIDER: &str = "Gemini";

/// Gemini provider configuration
#[derive(Clone, Debug)]
pub struct GeminiConfig {
    pub api_key: String,

    /// API root including the version segment
    pub base_url: String,

    pub model: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".into(),
            model: "gemini-1.5-flash".into(),
            timeout_secs: 120,
        }
    }
}

impl GeminiConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let api_key = std::env::var("GEMINI_API_KEY")
            .or_else(|_| std::env::var("GOOGLE_API_KEY"))
            .unwrap_or_default();
        Self {
            api_key,
            model: std::env::var("GEMINI_MODEL").unwrap_or(defaults.model),
            ..defaults
        }
    }
}

/// Gemini chat provider
pub struct GeminiProvider {
    client: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiProvider {
    /// Create from configuration
    pub fn from_config(config: GeminiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(ProviderError::from)?;
        Ok(Self { client, config })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_config(GeminiConfig::from_env())
    }

    fn endpoint(&self, method: &str) -> String {
        format!(
            "{}/models/{}:{method}",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    async fn send(
        &self,
        method: &str,
        messages: &[Message],
        tools: &[ToolSchema],
        query: &[(&str, &str)],
    ) -> Result<reqwest::Response> {
        let request = to_request(messages, tools);
        tracing::debug!(
            provider = PROVIDER,
            model = %self.config.model,
            contents = request.contents.len(),
            tools = tools.len(),
            method,
            "Sending generateContent request"
        );

        let response = self
            .client
            .post(self.endpoint(method))
            .header("x-goog-api-key", &self.config.api_key)
            .query(query)
            .json(&request)
            .send()
            .await
            .map_err(ProviderError::from)?;
        Ok(check_status(PROVIDER, response).await?)
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            name: PROVIDER.into(),
            schema_types: ["OBJECT", "STRING", "INTEGER", "NUMBER", "BOOLEAN", "ARRAY"]
                .into_iter()
                .map(String::from)
                .collect(),
            supports_streaming: true,
            system_prompt: SystemPromptMode::Instruction,
            issues_call_ids: false,
        }
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, messages: &[Message], tools: &[ToolSchema]) -> Result<Message> {
        let response = self.send("generateContent", messages, tools, &[]).await?;
        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;
        from_response(body)
    }

    async fn complete_stream(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
    ) -> Result<CompletionStream> {
        let response = self
            .send("streamGenerateContent", messages, tools, &[("alt", "sse")])
            .await?;
        let deltas = sse_events(response).filter_map(|data| async move {
            match data {
                Ok(data) => match serde_json::from_str::<GenerateContentResponse>(&data) {
                    Ok(chunk) => to_delta(chunk).map(Ok),
                    Err(e) => Some(Err(AgentError::from(ProviderError::Decode(e.to_string())))),
                },
                Err(e) => Some(Err(e)),
            }
        });
        Ok(Box::pin(deltas))
    }
}
