//! Tool System
//!
//! Tools are registered once at start-up and invoked by the conversation
//! loop. The registry is read-only afterwards and shared across turns.

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::error::{AgentError, Result};
use crate::schema::ToolSchema;

/// Execution context handed to every tool call
#[derive(Clone, Default)]
pub struct ToolContext {
    /// System the tools act on (e.g. the selected cluster)
    target: Option<Arc<dyn Any + Send + Sync>>,

    /// Display name of the target, for logging
    target_name: Option<String>,

    pub session_id: Option<String>,

    pub user_id: Option<String>,
}

impl std::fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolContext")
            .field("target", &self.target_name)
            .field("session_id", &self.session_id)
            .field("user_id", &self.user_id)
            .finish()
    }
}

impl ToolContext {
    /// Context without an execution target
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind an execution target
    #[must_use]
    pub fn with_target<T: Any + Send + Sync>(mut self, name: impl Into<String>, target: Arc<T>) -> Self {
        self.target = Some(target);
        self.target_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    #[must_use]
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub const fn has_target(&self) -> bool {
        self.target.is_some()
    }

    pub fn target_name(&self) -> Option<&str> {
        self.target_name.as_deref()
    }

    /// Typed access to the target; `None` if absent or of another type
    pub fn target<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.target.clone()?.downcast::<T>().ok()
    }
}

/// Tool trait - implement to add new capabilities.
///
/// Arguments come straight from the model and may be hallucinated;
/// implementations must validate them before acting.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool's schema for LLM function calling
    fn schema(&self) -> ToolSchema;

    /// Execute the tool with raw JSON arguments
    async fn execute(&self, ctx: &ToolContext, arguments: &str) -> Result<String>;
}

/// Decode JSON tool arguments into a typed struct. Empty input means `{}`.
pub fn parse_arguments<T: DeserializeOwned>(arguments: &str) -> Result<T> {
    let raw = if arguments.trim().is_empty() { "{}" } else { arguments };
    serde_json::from_str(raw).map_err(|e| AgentError::ToolValidation(e.to_string()))
}

/// Registry for available tools
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new tool; names must be unique
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> Result<()> {
        self.register_arc(Arc::new(tool))
    }

    /// Register a shared tool
    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.schema().name;
        if self.tools.contains_key(&name) {
            return Err(AgentError::DuplicateTool(name));
        }
        self.tools.insert(name, tool);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Execute a tool call by name
    pub async fn execute(&self, ctx: &ToolContext, name: &str, arguments: &str) -> Result<String> {
        let tool = self
            .get(name)
            .ok_or_else(|| AgentError::UnknownTool(name.to_string()))?;

        tool.execute(ctx, arguments).await.map_err(|e| match e {
            AgentError::ToolExecution { .. } => e,
            other => AgentError::tool_failure(name, other),
        })
    }

    /// All tool schemas, ordered by name
    pub fn definitions(&self) -> Vec<ToolSchema> {
        self.tools.values().map(|t| t.schema()).collect()
    }

    /// Tool names, ordered
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use crate::schema::JsonSchema;

    struct EchoTool(&'static str);

    #[async_trait]
    impl Tool for EchoTool {
        fn schema(&self) -> ToolSchema {
            ToolSchema::new(
                self.0,
                "Echo the text argument",
                JsonSchema::object().required_property("text", JsonSchema::string()),
            )
        }

        async fn execute(&self, _ctx: &ToolContext, arguments: &str) -> Result<String> {
            #[derive(Deserialize)]
            struct Args {
                text: String,
            }
            let args: Args = parse_arguments(arguments)?;
            Ok(args.text)
        }
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool("echo")).unwrap();
        let err = registry.register(EchoTool("echo")).unwrap_err();
        assert!(matches!(err, AgentError::DuplicateTool(name) if name == "echo"));
    }

    #[test]
    fn test_definitions_are_sorted() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool("zeta")).unwrap();
        registry.register(EchoTool("alpha")).unwrap();
        registry.register(EchoTool("mid")).unwrap();

        let names: Vec<_> = registry.definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
        assert_eq!(registry.names(), vec!["alpha", "mid", "zeta"]);
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let registry = ToolRegistry::new();
        let err = registry
            .execute(&ToolContext::new(), "nonexistent", "{}")
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::UnknownTool(name) if name == "nonexistent"));
    }

    #[tokio::test]
    async fn test_execution_error_is_wrapped_with_tool_name() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool("echo")).unwrap();

        let err = registry
            .execute(&ToolContext::new(), "echo", "{\"wrong\": 1}")
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::ToolExecution { ref tool, .. } if tool == "echo"));

        let out = registry
            .execute(&ToolContext::new(), "echo", "{\"text\": \"hi\"}")
            .await
            .unwrap();
        assert_eq!(out, "hi");
    }

    #[test]
    fn test_context_target_downcast() {
        struct Cluster(&'static str);

        let ctx = ToolContext::new().with_target("prod", Arc::new(Cluster("prod")));
        assert!(ctx.has_target());
        assert_eq!(ctx.target_name(), Some("prod"));
        assert_eq!(ctx.target::<Cluster>().unwrap().0, "prod");
        assert!(ctx.target::<String>().is_none());
        assert!(!ToolContext::new().has_target());
    }

    #[test]
    fn test_parse_arguments_empty_is_object() {
        #[derive(Deserialize)]
        struct Args {
            #[serde(default)]
            namespace: Option<String>,
        }
        let args: Args = parse_arguments("").unwrap();
        assert!(args.namespace.is_none());
    }
}
