//! Conversation Loop
//!
//! Drives one user turn: reason, call tools, observe, respond.
//!
//! ```text
//! AWAITING_MODEL ──▶ STREAMING_RESPONSE ──┬──▶ DONE            (no tool calls)
//!        ▲                                └──▶ EXECUTING_TOOLS
//!        └────────────────────────────────────────────┘
//! ```
//!
//! The session log is the source of truth: it is re-read before every model
//! call and every produced message is appended as soon as it is complete.
//! Events are pushed into a bounded channel; a closed channel cancels the
//! turn, also while a model call or tool is still in flight. Once an
//! assistant message with tool calls is stored, every call gets a stored
//! result before cancellation takes effect.

use std::sync::Arc;

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::error::{AgentError, Result};
use crate::message::{Conversation, Message, ToolCall};
use crate::provider::{CompletionStream, LlmProvider, StreamAccumulator, StreamDelta};
use crate::schema::ToolSchema;
use crate::session::{Session, SessionId, SessionStore};
use crate::title::spawn_title_generation;
use crate::tool::{ToolContext, ToolRegistry};

/// Model invocations allowed per turn
pub const DEFAULT_MAX_ITERATIONS: usize = 5;

/// Tool result used for every call when no execution target is selected
pub const NO_ACTIVE_CONTEXT: &str =
    "Error: No active cluster context. Please select a cluster in the dashboard.";

/// Status text sent before a batch of tool calls runs
pub const EXECUTING_TOOLS_STATUS: &str = "Executing tools...";

/// Tool result stored for calls that could not run because the caller left
pub const TOOL_CANCELLED: &str = "Error: tool execution cancelled because the client disconnected.";

const EVENT_BUFFER: usize = 64;

/// Agent configuration
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// System prompt placed at the head of every request
    pub system_prompt: String,

    /// Maximum model invocations per turn
    pub max_iterations: usize,

    /// Refuse to dispatch tools when the context has no target
    pub require_target: bool,

    /// Generate a title for sessions still using the default one
    pub generate_titles: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: "You are a helpful assistant.".into(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            require_target: true,
            generate_titles: true,
        }
    }
}

/// Inbound user turn
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TurnRequest {
    /// Existing session to continue; a new one is created when absent
    #[serde(default, alias = "sessionID")]
    pub session_id: Option<String>,

    pub message: String,

    /// Requested model. Resolved against the provider configuration before
    /// the adapter is built.
    #[serde(default, alias = "model")]
    pub model_override: Option<String>,
}

impl TurnRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn in_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// Event streamed to the caller during a turn.
///
/// Serializes to the event payload; the event name comes from
/// [`ChatEvent::name`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ChatEvent {
    /// Always first
    Session {
        #[serde(rename = "sessionID")]
        session_id: String,
    },
    /// Text delta from the model
    Message { content: String },
    Status { status: String },
    /// Terminal: the turn failed
    Error { error: String },
    /// Terminal: the turn completed
    Done {},
}

impl ChatEvent {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Session { .. } => "session",
            Self::Message { .. } => "message",
            Self::Status { .. } => "status",
            Self::Error { .. } => "error",
            Self::Done {} => "done",
        }
    }

    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Error { .. } | Self::Done {})
    }
}

/// Result of a completed turn
#[derive(Clone, Debug, Serialize)]
pub struct TurnOutcome {
    pub session_id: SessionId,

    /// Text produced across all iterations
    pub reply: String,

    /// Model invocations made
    pub iterations: usize,

    /// The iteration bound stopped the loop while tools were still requested
    pub limit_reached: bool,
}

/// The main Agent struct
pub struct Agent {
    provider: Arc<dyn LlmProvider>,
    title_provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    store: Arc<dyn SessionStore>,
    config: AgentConfig,
}

impl Agent {
    pub fn builder() -> AgentBuilder {
        AgentBuilder::new()
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Run one turn, emitting events into `events`.
    ///
    /// Exactly one terminal event (`done` or `error`) is sent last, unless
    /// the receiver has gone away, in which case the turn stops with
    /// [`AgentError::Cancelled`].
    pub async fn run_turn(
        &self,
        user_id: &str,
        request: TurnRequest,
        ctx: ToolContext,
        events: &mpsc::Sender<ChatEvent>,
    ) -> Result<TurnOutcome> {
        match self.drive_turn(user_id, request, ctx, events).await {
            Ok(outcome) => {
                emit(events, ChatEvent::Done {}).await?;
                Ok(outcome)
            }
            Err(AgentError::Cancelled) => {
                tracing::debug!(user_id, "Turn cancelled, caller disconnected");
                Err(AgentError::Cancelled)
            }
            Err(e) => {
                tracing::error!(user_id, error = %e, "Turn failed");
                let event = ChatEvent::Error {
                    error: e.user_message(),
                };
                if events.send(event).await.is_err() {
                    tracing::debug!(user_id, "Error event not delivered, caller disconnected");
                }
                Err(e)
            }
        }
    }

    /// Run one turn on a background task and return its event stream
    pub fn stream_turn(
        self: Arc<Self>,
        user_id: String,
        request: TurnRequest,
        ctx: ToolContext,
    ) -> ReceiverStream<ChatEvent> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        tokio::spawn(async move {
            if let Ok(outcome) = self.run_turn(&user_id, request, ctx, &tx).await {
                tracing::info!(
                    session_id = %outcome.session_id,
                    iterations = outcome.iterations,
                    limit_reached = outcome.limit_reached,
                    "Turn completed"
                );
            }
        });
        ReceiverStream::new(rx)
    }

    async fn drive_turn(
        &self,
        user_id: &str,
        request: TurnRequest,
        ctx: ToolContext,
        events: &mpsc::Sender<ChatEvent>,
    ) -> Result<TurnOutcome> {
        let session = self.open_session(user_id, request.session_id.as_deref()).await?;
        let session_id = session.id.clone();
        emit(
            events,
            ChatEvent::Session {
                session_id: session_id.to_string(),
            },
        )
        .await?;

        self.store
            .append_message(&session_id, &Message::user(&request.message))
            .await?;

        if self.config.generate_titles && session.has_default_title() {
            spawn_title_generation(
                self.title_provider.clone(),
                self.store.clone(),
                session_id.clone(),
                request.message.clone(),
            );
        }

        let ctx = ctx
            .with_session(session_id.as_str())
            .with_user(user_id);
        let definitions = self.tools.definitions();
        let mut reply = String::new();
        let mut iterations = 0;
        let mut limit_reached = false;

        loop {
            if iterations >= self.config.max_iterations {
                tracing::warn!(
                    session_id = %session_id,
                    max_iterations = self.config.max_iterations,
                    "Iteration limit reached with tool calls pending"
                );
                limit_reached = true;
                break;
            }
            iterations += 1;

            let history = self.store.load_session(&session_id, user_id).await?;
            let conversation = Conversation::from_history(&self.config.system_prompt, history.messages);
            tracing::debug!(
                session_id = %session_id,
                iteration = iterations,
                messages = conversation.len(),
                "Calling model"
            );

            let assistant = self
                .stream_completion(conversation.messages(), &definitions, events, &mut reply)
                .await?;
            self.store.append_message(&session_id, &assistant).await?;

            if !assistant.has_tool_calls() {
                break;
            }

            let status = emit(
                events,
                ChatEvent::Status {
                    status: EXECUTING_TOOLS_STATUS.into(),
                },
            )
            .await;
            let completed = self
                .run_tool_batch(&ctx, &session_id, &assistant.tool_calls, events)
                .await?;
            status?;
            if !completed {
                return Err(AgentError::Cancelled);
            }
        }

        self.store.touch_session(&session_id).await?;

        Ok(TurnOutcome {
            session_id,
            reply,
            iterations,
            limit_reached,
        })
    }

    async fn open_session(&self, user_id: &str, session_id: Option<&str>) -> Result<Session> {
        match session_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => self.store.load_session(&SessionId::from_string(id), user_id).await,
            None => self.store.create_session(user_id).await,
        }
    }

    /// Store one result per call, in order. Once the caller disconnects the
    /// running tool is dropped and every remaining call gets
    /// [`TOOL_CANCELLED`]. Returns `false` if that happened.
    async fn run_tool_batch(
        &self,
        ctx: &ToolContext,
        session_id: &SessionId,
        calls: &[ToolCall],
        events: &mpsc::Sender<ChatEvent>,
    ) -> Result<bool> {
        let mut cancelled = events.is_closed();
        for call in calls {
            let output = if cancelled {
                TOOL_CANCELLED.to_string()
            } else {
                tokio::select! {
                    biased;
                    output = self.execute_tool(ctx, call) => output,
                    () = events.closed() => {
                        tracing::debug!(tool = %call.name, "Caller disconnected, dropping tool call");
                        cancelled = true;
                        TOOL_CANCELLED.to_string()
                    }
                }
            };
            self.store
                .append_message(session_id, &Message::tool(&call.id, output))
                .await?;
        }
        Ok(!cancelled)
    }

    /// Invoke the model once, forwarding text deltas and folding the stream
    /// into one assistant message. Nothing is returned on failure or when
    /// the caller disconnects mid-call.
    async fn stream_completion(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
        events: &mpsc::Sender<ChatEvent>,
        reply: &mut String,
    ) -> Result<Message> {
        let mut stream = tokio::select! {
            biased;
            () = events.closed() => return Err(AgentError::Cancelled),
            stream = self.open_stream(messages, tools) => stream?,
        };
        let mut acc = StreamAccumulator::new();

        loop {
            let next = tokio::select! {
                biased;
                () = events.closed() => return Err(AgentError::Cancelled),
                next = stream.next() => next,
            };
            let Some(delta) = next else {
                break;
            };
            let delta = delta?;
            if !delta.content.is_empty() {
                reply.push_str(&delta.content);
                emit(
                    events,
                    ChatEvent::Message {
                        content: delta.content.clone(),
                    },
                )
                .await?;
            }
            acc.push(&delta);
            if delta.done {
                break;
            }
        }

        Ok(acc.into_message())
    }

    async fn open_stream(&self, messages: &[Message], tools: &[ToolSchema]) -> Result<CompletionStream> {
        if self.provider.capabilities().supports_streaming {
            return self.provider.complete_stream(messages, tools).await;
        }
        let message = self.provider.complete(messages, tools).await?;
        let single: Result<StreamDelta> = Ok(StreamDelta::from_message(message));
        Ok(Box::pin(futures::stream::iter([single])))
    }

    /// Execute one call. Failures become the tool-result text.
    async fn execute_tool(&self, ctx: &ToolContext, call: &ToolCall) -> String {
        if self.config.require_target && !ctx.has_target() {
            tracing::warn!(tool = %call.name, "No execution target selected");
            return NO_ACTIVE_CONTEXT.into();
        }

        tracing::info!(
            tool = %call.name,
            args = %call.arguments,
            target = ctx.target_name().unwrap_or_default(),
            "Executing tool"
        );
        match self.tools.execute(ctx, &call.name, &call.arguments).await {
            Ok(output) => output,
            Err(e) => {
                tracing::error!(tool = %call.name, error = %e, "Tool failed");
                format!("Error executing tool: {e}")
            }
        }
    }
}

async fn emit(events: &mpsc::Sender<ChatEvent>, event: ChatEvent) -> Result<()> {
    events.send(event).await.map_err(|_| AgentError::Cancelled)
}

/// Builder for Agent configuration
#[derive(Default)]
pub struct AgentBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    title_provider: Option<Arc<dyn LlmProvider>>,
    tools: Option<Arc<ToolRegistry>>,
    store: Option<Arc<dyn SessionStore>>,
    config: AgentConfig,
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Provider used for title generation; defaults to the chat provider
    #[must_use]
    pub fn title_provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.title_provider = Some(provider);
        self
    }

    #[must_use]
    pub fn tools(mut self, tools: Arc<ToolRegistry>) -> Self {
        self.tools = Some(tools);
        self
    }

    #[must_use]
    pub fn store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = prompt.into();
        self
    }

    #[must_use]
    pub const fn max_iterations(mut self, max: usize) -> Self {
        self.config.max_iterations = max;
        self
    }

    #[must_use]
    pub const fn generate_titles(mut self, enabled: bool) -> Self {
        self.config.generate_titles = enabled;
        self
    }

    pub fn build(self) -> Result<Agent> {
        let provider = self
            .provider
            .ok_or_else(|| AgentError::Config("Provider is required".into()))?;
        let store = self
            .store
            .ok_or_else(|| AgentError::Config("Session store is required".into()))?;
        if self.config.max_iterations == 0 {
            return Err(AgentError::Config("max_iterations must be at least 1".into()));
        }

        Ok(Agent {
            title_provider: self.title_provider.unwrap_or_else(|| provider.clone()),
            provider,
            tools: self.tools.unwrap_or_default(),
            store,
            config: self.config,
        })
    }
}
