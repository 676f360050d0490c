//! Error Types for Cluster Tools

use assistant_core::AgentError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClusterError>;

#[derive(Error, Debug)]
pub enum ClusterError {
    #[error("kubernetes client not found in context")]
    NoCluster,

    #[error("{kind} {name} not found")]
    NotFound { kind: String, name: String },

    #[error("unsupported resource kind: {0}")]
    UnsupportedKind(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("cluster API error: {0}")]
    Api(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClusterError {
    pub fn not_found(kind: impl std::fmt::Display, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.to_string(),
            name: name.into(),
        }
    }

    /// Convert into the error a tool reports to the conversation loop
    pub fn into_tool_error(self, tool: &str) -> AgentError {
        match self {
            Self::InvalidArgument(msg) => AgentError::ToolValidation(msg),
            other => AgentError::tool_failure(tool, other),
        }
    }
}
