//! # assistant-core
//!
//! Provider-agnostic conversation loop, tool registry and canonical message
//! model for the Kubernetes assistant.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Agent                                │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//! │  │ Conversation│  │    Tools    │  │   LlmProvider       │  │
//! │  │    Loop     │──│   Registry  │──│   (Strategy)        │  │
//! │  └──────┬──────┘  └─────────────┘  └─────────────────────┘  │
//! │         │                                                   │
//! │  ┌──────▼──────┐                                            │
//! │  │SessionStore │  append-only message log per session       │
//! │  └─────────────┘                                            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `LlmProvider` trait lets OpenAI-compatible, Gemini and Ollama
//! backends be swapped without changing the loop.

pub mod cache;
pub mod error;
pub mod message;
pub mod mock;
pub mod provider;
pub mod reasoning;
pub mod schema;
pub mod session;
pub mod title;
pub mod tool;

pub use cache::ClientCache;
pub use error::{AgentError, Result};
pub use message::{Conversation, Message, Role, ToolCall};
pub use provider::{LlmProvider, ProviderConfig, ProviderKind, StreamDelta};
pub use reasoning::{Agent, AgentConfig, ChatEvent, TurnOutcome, TurnRequest};
pub use schema::{JsonSchema, ToolSchema};
pub use session::{MemorySessionStore, Session, SessionId, SessionStore};
pub use tool::{Tool, ToolContext, ToolRegistry};
