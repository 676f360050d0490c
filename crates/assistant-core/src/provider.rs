//! LLM Provider Strategy Pattern
//!
//! Defines a common interface for all chat-completion backends (OpenAI
//! compatible, Gemini, Ollama) so the conversation loop never branches on
//! provider identity.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use assistant_core::provider::LlmProvider;
//!
//! let provider = create_provider(&config)?;
//! let reply = provider.complete(&messages, &tools.definitions()).await?;
//! ```

use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{AgentError, Result};
use crate::message::{Message, ToolCall};
use crate::schema::ToolSchema;

/// How a provider receives the system prompt
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemPromptMode {
    /// As a regular message at the head of the sequence
    Inline,
    /// Through a dedicated side channel; only the first system message is used
    Instruction,
}

/// Static description of what an adapter supports
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProviderCapabilities {
    /// Provider name (e.g., "OpenAI", "Gemini")
    pub name: String,

    /// Schema types the native format understands
    pub schema_types: Vec<String>,

    /// Whether `complete_stream` produces incremental output
    pub supports_streaming: bool,

    pub system_prompt: SystemPromptMode,

    /// Whether the provider issues tool-call identifiers itself
    pub issues_call_ids: bool,
}

/// Incremental fragment of a streamed tool call
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallDelta {
    /// Slot the fragment belongs to; `None` means "a new call"
    #[serde(default)]
    pub index: Option<usize>,

    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub arguments: Option<String>,
}

impl ToolCallDelta {
    /// A fully formed call delivered in one piece
    pub fn complete(call: ToolCall) -> Self {
        Self {
            index: None,
            id: Some(call.id),
            name: Some(call.name),
            arguments: Some(call.arguments),
        }
    }
}

/// A chunk from streaming completion
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamDelta {
    /// The text delta
    #[serde(default)]
    pub content: String,

    #[serde(default)]
    pub tool_calls: Vec<ToolCallDelta>,

    /// Whether this is the final chunk
    #[serde(default)]
    pub done: bool,
}

impl StreamDelta {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn tool_calls(tool_calls: Vec<ToolCallDelta>) -> Self {
        Self {
            tool_calls,
            ..Self::default()
        }
    }

    /// Whole assistant message as a single delta
    pub fn from_message(message: Message) -> Self {
        Self {
            content: message.content,
            tool_calls: message
                .tool_calls
                .into_iter()
                .map(ToolCallDelta::complete)
                .collect(),
            done: true,
        }
    }
}

/// Stream type for completion streaming
pub type CompletionStream = Pin<Box<dyn Stream<Item = Result<StreamDelta>> + Send>>;

/// Folds stream deltas into one assistant message.
///
/// Tool-call fragments with an explicit index update that slot (placeholder
/// slots are created as needed); fragments without an index are new calls.
/// Name and argument fragments concatenate.
#[derive(Clone, Debug, Default)]
pub struct StreamAccumulator {
    content: String,
    tool_calls: Vec<ToolCall>,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, delta: &StreamDelta) {
        self.content.push_str(&delta.content);
        for tc in &delta.tool_calls {
            self.push_tool_call(tc);
        }
    }

    fn push_tool_call(&mut self, delta: &ToolCallDelta) {
        let Some(idx) = delta.index else {
            self.tool_calls.push(ToolCall {
                id: delta.id.clone().unwrap_or_default(),
                name: delta.name.clone().unwrap_or_default(),
                arguments: delta.arguments.clone().unwrap_or_default(),
            });
            return;
        };

        if self.tool_calls.len() <= idx {
            self.tool_calls.resize_with(idx + 1, ToolCall::default);
        }
        let slot = &mut self.tool_calls[idx];
        if let Some(id) = delta.id.as_deref().filter(|id| !id.is_empty()) {
            slot.id = id.to_string();
        }
        if let Some(name) = &delta.name {
            slot.name.push_str(name);
        }
        if let Some(args) = &delta.arguments {
            slot.arguments.push_str(args);
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn tool_calls(&self) -> &[ToolCall] {
        &self.tool_calls
    }

    pub fn into_message(self) -> Message {
        Message::assistant_with_tools(self.content, self.tool_calls)
    }
}

/// Strategy trait for LLM providers
///
/// Implement this trait to add support for new LLM backends.
/// The conversation loop works exclusively through this interface.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Static capabilities of this adapter
    fn capabilities(&self) -> ProviderCapabilities;

    /// Model this adapter sends requests for
    fn model(&self) -> &str;

    /// Single-shot completion returning one assistant message
    async fn complete(&self, messages: &[Message], tools: &[ToolSchema]) -> Result<Message>;

    /// Streaming completion; the stream ends when the provider signals
    /// completion or the transport closes
    async fn complete_stream(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
    ) -> Result<CompletionStream>;
}

/// Supported backend families
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    Gemini,
    Ollama,
}

impl std::str::FromStr for ProviderKind {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" | "azure" | "openai-compatible" => Ok(Self::OpenAi),
            "gemini" | "google" => Ok(Self::Gemini),
            "ollama" => Ok(Self::Ollama),
            other => Err(AgentError::Config(format!("Unsupported AI provider: {other}"))),
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OpenAi => write!(f, "openai"),
            Self::Gemini => write!(f, "gemini"),
            Self::Ollama => write!(f, "ollama"),
        }
    }
}

/// Resolved provider configuration for one turn
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub kind: ProviderKind,

    #[serde(default)]
    pub api_key: String,

    #[serde(default)]
    pub base_url: Option<String>,

    pub default_model: String,

    /// Models a turn may override to; empty means any
    #[serde(default)]
    pub allowed_models: Vec<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Revision stamp, bumped whenever the configuration changes
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

const fn default_timeout_secs() -> u64 {
    120
}

impl ProviderConfig {
    pub fn new(kind: ProviderKind, api_key: impl Into<String>, default_model: impl Into<String>) -> Self {
        Self {
            kind,
            api_key: api_key.into(),
            base_url: None,
            default_model: default_model.into(),
            allowed_models: Vec::new(),
            timeout_secs: default_timeout_secs(),
            updated_at: Utc::now(),
        }
    }

    /// Pick the model for a turn. Overrides outside `allowed_models` fall
    /// back to the default model.
    pub fn resolve_model(&self, requested: Option<&str>) -> String {
        match requested.map(str::trim).filter(|m| !m.is_empty()) {
            Some(model) if self.allowed_models.is_empty() || self.allowed_models.iter().any(|m| m == model) => {
                model.to_string()
            }
            Some(model) => {
                tracing::warn!(model, provider = %self.kind, "Requested model not in allowed list, using default");
                self.default_model.clone()
            }
            None => self.default_model.clone(),
        }
    }

    /// Check the configuration is usable before any model call
    pub fn validate(&self) -> Result<()> {
        if self.default_model.trim().is_empty() {
            return Err(AgentError::Config("AI model is not configured".into()));
        }
        if self.kind != ProviderKind::Ollama && self.api_key.trim().is_empty() {
            return Err(AgentError::Config("API key is required".into()));
        }
        Ok(())
    }

    /// Identity used to cache clients built from this configuration.
    ///
    /// Includes a fingerprint of the API key so adapters built with
    /// different credentials are never shared.
    pub fn cache_key(&self, model: &str) -> String {
        let digest = Sha256::digest(self.api_key.as_bytes());
        format!(
            "{}|{}|{}|{}",
            self.kind,
            self.base_url.as_deref().unwrap_or_default(),
            model,
            hex::encode(&digest[..8])
        )
    }
}
