//! # assistant-runtime
//!
//! Provider adapters for the Kubernetes assistant.
//!
//! ## Providers
//!
//! - **OpenAI**: Chat Completions API and compatible gateways
//! - **Gemini**: Google Generative Language API
//! - **Ollama**: Local LLM inference via `/api/chat`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use assistant_runtime::create_provider;
//!
//! let provider = create_provider(&config, &config.resolve_model(None))?;
//! let agent = Agent::builder()
//!     .provider(provider)
//!     .store(store)
//!     .build()?;
//! ```

pub mod error;
pub mod factory;
pub mod gemini;
pub mod ollama;
pub mod openai;
pub mod stream;
pub mod translate;

pub use error::ProviderError;
pub use factory::{ProviderCache, create_provider, provider_for_turn};
pub use gemini::GeminiProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

// Re-export core types for convenience
pub use assistant_core::{
    Agent, AgentError, LlmProvider, Message, ProviderConfig, ProviderKind, Result, Role,
};
