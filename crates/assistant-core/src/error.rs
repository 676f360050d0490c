//! Error Types

use thiserror::Error;

/// Result type alias for assistant operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Assistant error types
#[derive(Error, Debug)]
pub enum AgentError {
    /// No usable provider configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport, authentication or malformed-response failure from a provider
    #[error("Provider error: {0}")]
    Provider(String),

    /// Provider answered with zero choices/candidates
    #[error("Provider returned an empty response")]
    EmptyResponse,

    /// Tool name registered twice
    #[error("Duplicate tool: {0}")]
    DuplicateTool(String),

    /// Tool not found in registry
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Tool arguments could not be decoded or were rejected
    #[error("Tool validation error: {0}")]
    ToolValidation(String),

    /// Tool execution failed
    #[error("Tool '{tool}' failed: {message}")]
    ToolExecution { tool: String, message: String },

    /// Session does not exist (or belongs to another user)
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Persistence bridge failure
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// The caller stopped listening for events
    #[error("Turn cancelled by caller")]
    Cancelled,

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

impl AgentError {
    /// Wrap an error raised by a tool with the tool's name
    pub fn tool_failure(tool: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::ToolExecution {
            tool: tool.into(),
            message: message.to_string(),
        }
    }

    /// Short diagnostic suitable for an `error` event
    pub fn user_message(&self) -> String {
        match self {
            Self::Config(msg) => msg.clone(),
            Self::Provider(msg) => format!("AI Provider error: {msg}"),
            Self::EmptyResponse => "AI Provider error: the model returned no answer".into(),
            Self::SessionNotFound(_) => "Session not found".into(),
            Self::Cancelled => "Request cancelled".into(),
            Self::UnknownTool(name) => format!("The tool '{name}' is not available."),
            Self::ToolValidation(msg) => format!("Invalid tool input: {msg}"),
            Self::ToolExecution { tool, message } => format!("Tool '{tool}' failed: {message}"),
            _ => "An unexpected error occurred.".into(),
        }
    }
}

impl From<anyhow::Error> for AgentError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
