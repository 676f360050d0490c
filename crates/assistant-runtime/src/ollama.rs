//! Ollama LLM Provider
//!
//! Native `/api/chat` integration for local inference. Streams NDJSON, takes
//! structured tool arguments and issues no call ids, so tool-result names
//! are recovered from the conversation.

use std::time::Duration;

use assistant_core::{
    error::{AgentError, Result},
    message::{Message, Role, ToolCall, find_tool_name},
    provider::{
        CompletionStream, LlmProvider, ProviderCapabilities, StreamDelta, SystemPromptMode,
        ToolCallDelta,
    },
    schema::ToolSchema,
};
use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ProviderError, check_status};
use crate::translate::{structured_args, synthesize_call_id};
use crate::stream::ndjson_lines;

const PROVIDER: &str = "Ollama";

/// Ollama provider configuration
#[derive(Clone, Debug)]
pub struct OllamaConfig {
    /// Ollama host URL
    pub host: String,

    /// Ollama port
    pub port: u16,

    pub model: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost".into(),
            port: 11434,
            model: "llama3.2".into(),
            timeout_secs: 120,
        }
    }
}

impl OllamaConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let host = std::env::var("OLLAMA_HOST").unwrap_or(defaults.host);
        let port = std::env::var("OLLAMA_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.port);
        let model = std::env::var("OLLAMA_MODEL").unwrap_or(defaults.model);

        Self {
            host,
            port,
            model,
            ..defaults
        }
    }

    /// Split a base URL such as `http://gpu-box:11434` into host and port
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        let base_url = base_url.trim_end_matches('/');
        let scheme_end = base_url.find("://").map_or(0, |i| i + 3);
        match base_url[scheme_end..].rsplit_once(':') {
            Some((_, port)) if port.parse::<u16>().is_ok() => {
                self.port = port.parse().unwrap_or(self.port);
                self.host = base_url[..base_url.len() - port.len() - 1].to_string();
            }
            _ => self.host = base_url.to_string(),
        }
        self
    }

    pub fn base_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// Wire format

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,

    #[serde(default)]
    content: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OllamaToolCall>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct OllamaToolCall {
    function: OllamaFunction,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct OllamaFunction {
    name: String,

    #[serde(default)]
    arguments: Value,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    message: Option<OllamaMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Ollama LLM provider
pub struct OllamaProvider {
    client: reqwest::Client,
    config: OllamaConfig,
}

impl OllamaProvider {
    /// Create from configuration
    pub fn from_config(config: OllamaConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(ProviderError::from)?;
        Ok(Self { client, config })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_config(OllamaConfig::from_env())
    }

    /// Create with default localhost settings
    pub fn localhost() -> Result<Self> {
        Self::from_config(OllamaConfig::default())
    }

    /// Convert canonical messages to Ollama format
    fn convert_messages(messages: &[Message]) -> Vec<OllamaMessage> {
        messages
            .iter()
            .enumerate()
            .map(|(i, m)| {
                let tool_calls = m.has_tool_calls().then(|| {
                    m.tool_calls
                        .iter()
                        .map(|c| OllamaToolCall {
                            function: OllamaFunction {
                                name: c.name.clone(),
                                arguments: structured_args(&c.arguments),
                            },
                        })
                        .collect()
                });
                let tool_name = (m.role == Role::Tool).then(|| {
                    let id = m.tool_call_id.as_deref().unwrap_or_default();
                    find_tool_name(&messages[..i], id).to_string()
                });
                OllamaMessage {
                    role: m.role.to_string(),
                    content: m.content.clone(),
                    tool_calls,
                    tool_name,
                }
            })
            .collect()
    }

    /// Convert an Ollama reply to canonical tool calls, synthesizing ids
    fn convert_tool_calls(message: &OllamaMessage) -> Vec<ToolCall> {
        message
            .tool_calls
            .iter()
            .flatten()
            .map(|c| {
                let arguments = match &c.function.arguments {
                    Value::String(raw) => raw.clone(),
                    Value::Null => "{}".to_string(),
                    other => other.to_string(),
                };
                ToolCall::new(synthesize_call_id(&c.function.name), c.function.name.clone(), arguments)
            })
            .collect()
    }

    fn decode(line: &str) -> Result<ChatResponse> {
        let mut response: ChatResponse =
            serde_json::from_str(line).map_err(|e| ProviderError::Decode(e.to_string()))?;
        if let Some(error) = response.error.take() {
            return Err(AgentError::Provider(error));
        }
        Ok(response)
    }

    async fn send(&self, messages: &[Message], tools: &[ToolSchema], stream: bool) -> Result<reqwest::Response> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: Self::convert_messages(messages),
            tools: tools.iter().map(ToolSchema::to_wire).collect(),
            stream,
        };
        tracing::debug!(
            provider = PROVIDER,
            model = %self.config.model,
            messages = request.messages.len(),
            stream,
            "Sending chat request"
        );

        let response = self
            .client
            .post(format!("{}/api/chat", self.config.base_url()))
            .json(&request)
            .send()
            .await
            .map_err(ProviderError::from)?;
        Ok(check_status(PROVIDER, response).await?)
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            name: PROVIDER.into(),
            schema_types: ["object", "string", "integer", "number", "boolean", "array"]
                .into_iter()
                .map(String::from)
                .collect(),
            supports_streaming: true,
            system_prompt: SystemPromptMode::Inline,
            issues_call_ids: false,
        }
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, messages: &[Message], tools: &[ToolSchema]) -> Result<Message> {
        let response = self.send(messages, tools, false).await?;
        let text = response.text().await.map_err(ProviderError::from)?;
        let message = Self::decode(&text)?
            .message
            .ok_or(AgentError::EmptyResponse)?;

        let tool_calls = Self::convert_tool_calls(&message);
        Ok(Message::assistant_with_tools(message.content, tool_calls))
    }

    async fn complete_stream(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
    ) -> Result<CompletionStream> {
        let response = self.send(messages, tools, true).await?;
        let deltas = ndjson_lines(response).map(|line| {
            let chunk = Self::decode(&line?)?;
            let (content, tool_calls) = chunk.message.map_or_else(Default::default, |m| {
                let calls: Vec<ToolCallDelta> = Self::convert_tool_calls(&m)
                    .into_iter()
                    .map(ToolCallDelta::complete)
                    .collect();
                (m.content, calls)
            });
            Ok(StreamDelta {
                content,
                tool_calls,
                done: chunk.done,
            })
        });
        Ok(Box::pin(deltas))
    }
}
