//! OpenAI-compatible Provider
//!
//! Chat Completions API (`/chat/completions`). Also serves gateways and
//! Azure-style deployments that speak the same protocol via `base_url`.

use std::time::Duration;

use assistant_core::{
    error::{AgentError, Result},
    message::{Message, Role, ToolCall},
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
use crate::stream::sse_events;

const PROVIDER: &str = "OpenAI";

/// OpenAI provider configuration
#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    pub api_key: String,

    /// API root, up to and including the version segment
    pub base_url: String,

    pub model: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".into(),
            model: "gpt-4o-mini".into(),
            timeout_secs: 120,
        }
    }
}

impl OpenAiConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
            base_url: std::env::var("OPENAI_BASE_URL").unwrap_or(defaults.base_url),
            model: std::env::var("OPENAI_MODEL").unwrap_or(defaults.model),
            ..defaults
        }
    }
}

// Wire format

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<WireToolCall>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireToolCall {
    pub id: String,

    #[serde(rename = "type", default = "function_type")]
    pub kind: String,

    pub function: WireFunction,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireFunction {
    pub name: String,

    #[serde(default)]
    pub arguments: String,
}

fn function_type() -> String {
    "function".into()
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: WireMessage,
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: ChunkDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ChunkToolCall>>,
}

#[derive(Deserialize)]
struct ChunkToolCall {
    #[serde(default)]
    index: Option<usize>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<ChunkFunction>,
}

#[derive(Deserialize)]
struct ChunkFunction {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

/// Canonical messages to Chat Completions messages
pub fn to_wire_messages(messages: &[Message]) -> Vec<WireMessage> {
    messages
        .iter()
        .map(|m| {
            let tool_calls = m.has_tool_calls().then(|| {
                m.tool_calls
                    .iter()
                    .map(|c| WireToolCall {
                        id: c.id.clone(),
                        kind: function_type(),
                        function: WireFunction {
                            name: c.name.clone(),
                            arguments: c.arguments.clone(),
                        },
                    })
                    .collect()
            });
            // Tool-call-only assistant turns carry null content
            let content = if m.content.is_empty() && tool_calls.is_some() {
                None
            } else {
                Some(m.content.clone())
            };
            WireMessage {
                role: m.role.to_string(),
                content,
                tool_calls,
                tool_call_id: m.tool_call_id.clone(),
            }
        })
        .collect()
}

/// Chat Completions message back to canonical form
pub fn from_wire_message(wire: WireMessage) -> Message {
    let role = match wire.role.as_str() {
        "system" | "developer" => Role::System,
        "user" => Role::User,
        "tool" => Role::Tool,
        _ => Role::Assistant,
    };
    let mut message = Message::new(role, wire.content.unwrap_or_default());
    message.tool_calls = wire
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|c| ToolCall::new(c.id, c.function.name, c.function.arguments))
        .collect();
    message.tool_call_id = wire.tool_call_id;
    message
}

fn chunk_to_delta(chunk: StreamChunk) -> Option<StreamDelta> {
    let choice = chunk.choices.into_iter().next()?;
    let tool_calls = choice
        .delta
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|tc| {
            let (name, arguments) = tc
                .function
                .map(|f| (f.name, f.arguments))
                .unwrap_or_default();
            ToolCallDelta {
                index: tc.index,
                id: tc.id,
                name,
                arguments,
            }
        })
        .collect();
    Some(StreamDelta {
        content: choice.delta.content.unwrap_or_default(),
        tool_calls,
        done: choice.finish_reason.is_some(),
    })
}

/// OpenAI-compatible chat provider
pub struct OpenAiProvider {
    client: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiProvider {
    /// Create from configuration
    pub fn from_config(config: OpenAiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(ProviderError::from)?;
        Ok(Self { client, config })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_config(OpenAiConfig::from_env())
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    async fn send(&self, messages: &[Message], tools: &[ToolSchema], stream: bool) -> Result<reqwest::Response> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: to_wire_messages(messages),
            tools: tools.iter().map(ToolSchema::to_wire).collect(),
            stream,
        };
        tracing::debug!(
            provider = PROVIDER,
            model = %self.config.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            stream,
            "Sending chat request"
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(ProviderError::from)?;
        Ok(check_status(PROVIDER, response).await?)
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            name: PROVIDER.into(),
            schema_types: ["object", "string", "integer", "number", "boolean", "array"]
                .map(String::from)
                .to_vec(),
            supports_streaming: true,
            system_prompt: SystemPromptMode::Inline,
            issues_call_ids: true,
        }
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, messages: &[Message], tools: &[ToolSchema]) -> Result<Message> {
        let response = self.send(messages, tools, false).await?;
        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        let choice = body.choices.into_iter().next().ok_or(AgentError::EmptyResponse)?;
        let mut message = from_wire_message(choice.message);
        message.role = Role::Assistant;
        Ok(message)
    }

    async fn complete_stream(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
    ) -> Result<CompletionStream> {
        let response = self.send(messages, tools, true).await?;
        let deltas = sse_events(response).filter_map(|data| async move {
            match data {
                Ok(data) => match serde_json::from_str::<StreamChunk>(&data) {
                    Ok(chunk) => chunk_to_delta(chunk).map(Ok),
                    Err(e) => Some(Err(AgentError::from(ProviderError::Decode(e.to_string())))),
                },
                Err(e) => Some(Err(e)),
            }
        });
        Ok(Box::pin(deltas))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assistant_core::provider::StreamAccumulator;
    use assistant_core::schema::JsonSchema;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn setup(response: ResponseTemplate) -> (MockServer, OpenAiProvider) {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(response)
            .mount(&server)
            .await;

        let provider = OpenAiProvider::from_config(OpenAiConfig {
            api_key: "sk-test".into(),
            base_url: format!("{}/v1", server.uri()),
            model: "gpt-4o-mini".into(),
            timeout_secs: 5,
        })
        .unwrap();
        (server, provider)
    }

    #[test]
    fn test_text_round_trip() {
        let messages = vec![
            Message::system("You are helpful."),
            Message::user("Hi"),
            Message::assistant("Hello!"),
        ];
        let back: Vec<Message> = to_wire_messages(&messages)
            .into_iter()
            .map(from_wire_message)
            .collect();
        for (a, b) in messages.iter().zip(&back) {
            assert_eq!(a.role, b.role);
            assert_eq!(a.content, b.content);
        }
    }

    #[test]
    fn test_tool_messages_to_wire() {
        let messages = vec![
            Message::assistant_with_tools("", vec![ToolCall::new("call_1", "list_pods", "{\"namespace\":\"x\"}")]),
            Message::tool("call_1", "pod-a Running"),
        ];
        let wire = serde_json::to_value(to_wire_messages(&messages)).unwrap();
        assert_eq!(
            wire,
            json!([
                {
                    "role": "assistant",
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "list_pods", "arguments": "{\"namespace\":\"x\"}"}
                    }]
                },
                {"role": "tool", "content": "pod-a Running", "tool_call_id": "call_1"}
            ])
        );
    }

    #[tokio::test]
    async fn test_complete_tool_request() {
        let (_server, provider) = setup(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-tool",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_123",
                        "type": "function",
                        "function": {"name": "list_pods", "arguments": "{\"namespace\":\"default\"}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        })))
        .await;

        let tools = [ToolSchema::new(
            "list_pods",
            "List pods",
            JsonSchema::object().property("namespace", JsonSchema::string()),
        )];
        let reply = provider.complete(&[Message::user("pods?")], &tools).await.unwrap();

        assert_eq!(reply.role, Role::Assistant);
        assert_eq!(reply.content, "");
        assert_eq!(
            reply.tool_calls,
            vec![ToolCall::new("call_123", "list_pods", "{\"namespace\":\"default\"}")]
        );
    }

    #[tokio::test]
    async fn test_request_carries_tools() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({
                "model": "gpt-4o-mini",
                "stream": false,
                "tools": [{"type": "function", "function": {"name": "get_cluster_info"}}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "ok"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = OpenAiProvider::from_config(OpenAiConfig {
            api_key: "sk".into(),
            base_url: server.uri(),
            ..OpenAiConfig::default()
        })
        .unwrap();
        let tools = [ToolSchema::new("get_cluster_info", "Cluster info", JsonSchema::object())];
        let reply = provider.complete(&[Message::user("info")], &tools).await.unwrap();
        assert_eq!(reply.content, "ok");
    }

    #[tokio::test]
    async fn test_empty_choices() {
        let (_server, provider) = setup(ResponseTemplate::new(200).set_body_json(json!({"choices": []}))).await;
        let err = provider.complete(&[Message::user("hi")], &[]).await.unwrap_err();
        assert!(matches!(err, AgentError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_error_status_is_provider_error() {
        let (_server, provider) =
            setup(ResponseTemplate::new(401).set_body_string("invalid api key")).await;
        let err = provider.complete(&[Message::user("hi")], &[]).await.unwrap_err();
        let AgentError::Provider(msg) = err else {
            panic!("expected provider error");
        };
        assert!(msg.contains("401"));
        assert!(msg.contains("invalid api key"));
    }

    #[tokio::test]
    async fn test_stream_accumulates_fragmented_tool_call() {
        let body = [
            r#"data: {"choices":[{"delta":{"content":"Checking"}}]}"#,
            r#"data: {"choices":[{"delta":{"tool_calls":[{"index":0,"id":"call_1","function":{"name":"list","arguments":""}}]}}]}"#,
            r#"data: {"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"name":"_pods"}}]}}]}"#,
            r#"data: {"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"arguments":"{\"ns\""}}]}}]}"#,
            r#"data: {"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"arguments":":\"x\"}"}}]}}]}"#,
            r#"data: {"choices":[{"delta":{},"finish_reason":"tool_calls"}]}"#,
            "data: [DONE]",
        ]
        .join("\n\n");
        let (_server, provider) =
            setup(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream")).await;

        let mut stream = provider.complete_stream(&[Message::user("pods?")], &[]).await.unwrap();
        let mut acc = StreamAccumulator::new();
        let mut saw_done = false;
        while let Some(delta) = stream.next().await {
            let delta = delta.unwrap();
            saw_done |= delta.done;
            acc.push(&delta);
        }

        assert!(saw_done);
        let message = acc.into_message();
        assert_eq!(message.content, "Checking");
        assert_eq!(
            message.tool_calls,
            vec![ToolCall::new("call_1", "list_pods", "{\"ns\":\"x\"}")]
        );
    }
}
