//! Scripted provider for tests and local development.
//!
//! Each call to `complete` / `complete_stream` consumes the next scripted
//! step. When the script runs out the optional repeat step is replayed,
//! otherwise the call fails.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use futures::{StreamExt, stream};
use tokio::sync::Mutex;

use crate::error::{AgentError, Result};
use crate::message::{Message, ToolCall};
use crate::provider::{
    CompletionStream, LlmProvider, ProviderCapabilities, StreamDelta, SystemPromptMode,
};
use crate::schema::ToolSchema;

/// One scripted model response
#[derive(Clone, Debug)]
pub enum MockStep {
    /// Stream these deltas in order
    Deltas(Vec<StreamDelta>),
    /// Fail before any output
    Fail(String),
    /// Emit these deltas, then fail mid-stream
    FailAfter(Vec<StreamDelta>, String),
    /// Emit these deltas, then never finish
    Stall(Vec<StreamDelta>),
}

/// Provider that replays a fixed script
pub struct MockProvider {
    steps: Mutex<VecDeque<MockStep>>,
    repeat: Option<MockStep>,
    streaming: bool,
    latency: Option<Duration>,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            steps: Mutex::new(VecDeque::new()),
            repeat: None,
            streaming: true,
            latency: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn then(mut self, step: MockStep) -> Self {
        self.steps.get_mut().push_back(step);
        self
    }

    /// Reply with text, streamed word by word
    #[must_use]
    pub fn then_text(self, text: &str) -> Self {
        let deltas = text
            .split_inclusive(' ')
            .map(StreamDelta::text)
            .collect();
        self.then(MockStep::Deltas(deltas))
    }

    /// Reply with optional text plus complete tool calls
    #[must_use]
    pub fn then_tool_calls(self, text: &str, calls: Vec<ToolCall>) -> Self {
        let message = Message::assistant_with_tools(text, calls);
        self.then(MockStep::Deltas(vec![StreamDelta::from_message(message)]))
    }

    #[must_use]
    pub fn then_fail(self, error: &str) -> Self {
        self.then(MockStep::Fail(error.to_string()))
    }

    /// Replay `step` forever once the script is exhausted
    #[must_use]
    pub fn repeating(mut self, step: MockStep) -> Self {
        self.repeat = Some(step);
        self
    }

    /// Report no streaming support
    #[must_use]
    pub const fn without_streaming(mut self) -> Self {
        self.streaming = false;
        self
    }

    /// Wait this long before answering each call
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of model invocations so far
    pub async fn call_count(&self) -> usize {
        self.requests.lock().await.len()
    }

    /// Message lists received, one per invocation
    pub async fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().await.clone()
    }

    async fn next_step(&self, messages: &[Message]) -> Result<MockStep> {
        self.requests.lock().await.push(messages.to_vec());
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let next = self.steps.lock().await.pop_front();
        next.or_else(|| self.repeat.clone())
            .ok_or_else(|| AgentError::Provider("mock script exhausted".into()))
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            name: "Mock".into(),
            schema_types: vec!["object".into(), "string".into()],
            supports_streaming: self.streaming,
            system_prompt: SystemPromptMode::Inline,
            issues_call_ids: true,
        }
    }

    fn model(&self) -> &str {
        "mock"
    }

    async fn complete(&self, messages: &[Message], _tools: &[ToolSchema]) -> Result<Message> {
        match self.next_step(messages).await? {
            MockStep::Deltas(deltas) => {
                let mut acc = crate::provider::StreamAccumulator::new();
                for delta in &deltas {
                    acc.push(delta);
                }
                Ok(acc.into_message())
            }
            MockStep::Fail(e) | MockStep::FailAfter(_, e) => Err(AgentError::Provider(e)),
            MockStep::Stall(_) => futures::future::pending().await,
        }
    }

    async fn complete_stream(
        &self,
        messages: &[Message],
        _tools: &[ToolSchema],
    ) -> Result<CompletionStream> {
        let items: Vec<Result<StreamDelta>> = match self.next_step(messages).await? {
            MockStep::Deltas(deltas) => deltas.into_iter().map(Ok).collect(),
            MockStep::Stall(deltas) => {
                let stalled = stream::iter(deltas.into_iter().map(Ok)).chain(stream::pending());
                return Ok(Box::pin(stalled));
            }
            MockStep::Fail(e) => return Err(AgentError::Provider(e)),
            MockStep::FailAfter(deltas, e) => deltas
                .into_iter()
                .map(Ok)
                .chain(std::iter::once(Err(AgentError::Provider(e))))
                .collect(),
        };
        Ok(Box::pin(stream::iter(items)))
    }
}
