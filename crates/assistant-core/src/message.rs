//! Conversation Messages
//!
//! Canonical, provider-agnostic message format. Every adapter translates
//! to and from this shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Name used when a tool result cannot be traced back to its call
pub const UNKNOWN_TOOL_NAME: &str = "unknown_tool";

/// Role of a message sender
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System prompt/instructions
    System,
    /// User input
    User,
    /// Assistant (LLM) response
    Assistant,
    /// Tool result
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::Tool => write!(f, "tool"),
        }
    }
}

/// A tool invocation requested by the assistant
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Call identifier, echoed back by the matching tool message
    pub id: String,

    /// Registered tool name
    pub name: String,

    /// Arguments as JSON text, exactly as the model produced them
    pub arguments: String,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

/// A single message in a conversation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message role
    pub role: Role,

    /// Text content (empty for tool-call-only assistant messages)
    #[serde(default)]
    pub content: String,

    /// Tool calls requested by an assistant message
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,

    /// Back-reference from a tool message to the call it answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Timestamp
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Create a new message
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Assistant message carrying tool calls
    pub fn assistant_with_tools(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        let mut msg = Self::assistant(content);
        msg.tool_calls = tool_calls;
        msg
    }

    /// Tool result answering `tool_call_id`
    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        let mut msg = Self::new(Role::Tool, content);
        msg.tool_call_id = Some(tool_call_id.into());
        msg
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Ordered conversation as sent to a provider
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_system_prompt(prompt: impl Into<String>) -> Self {
        let mut conv = Self::new();
        conv.push(Message::system(prompt));
        conv
    }

    /// Rebuild a conversation from a stored log, guaranteeing a leading
    /// system message.
    ///
    /// System messages inside the stored log are dropped: the prompt is
    /// owned by configuration, not by history.
    pub fn from_history(system_prompt: &str, history: impl IntoIterator<Item = Message>) -> Self {
        let mut conv = Self::with_system_prompt(system_prompt);
        conv.messages
            .extend(history.into_iter().filter(|m| m.role != Role::System));
        conv
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Tool call ids answered by a tool message with no earlier matching call
    pub fn dangling_tool_results(&self) -> Vec<String> {
        dangling_tool_results(&self.messages)
    }
}

/// Resolve the tool name for a tool-result message.
///
/// Tool messages only carry the call id, so this scans backward for the
/// assistant message that issued it. Falls back to [`UNKNOWN_TOOL_NAME`].
pub fn find_tool_name<'a>(messages: &'a [Message], tool_call_id: &str) -> &'a str {
    messages
        .iter()
        .rev()
        .filter(|m| m.role == Role::Assistant)
        .flat_map(|m| m.tool_calls.iter())
        .find(|c| c.id == tool_call_id)
        .map_or(UNKNOWN_TOOL_NAME, |c| c.name.as_str())
}

/// Tool call ids of tool messages that answer no earlier assistant call
pub fn dangling_tool_results(messages: &[Message]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut dangling = Vec::new();
    for m in messages {
        match m.role {
            Role::Assistant => seen.extend(m.tool_calls.iter().map(|c| c.id.as_str())),
            Role::Tool => {
                let id = m.tool_call_id.as_deref().unwrap_or_default();
                if !seen.contains(id) {
                    dangling.push(id.to_string());
                }
            }
            Role::System | Role::User => {}
        }
    }
    dangling
}

/// First system message, if any. Later system messages are ignored by
/// providers that take the prompt out of band.
pub fn system_prompt(messages: &[Message]) -> Option<&str> {
    messages
        .iter()
        .find(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_creation() {
        let msg = Message::user("Hello");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Hello");
        assert!(msg.tool_call_id.is_none());
        assert!(!msg.has_tool_calls());
    }

    #[test]
    fn test_from_history_synthesizes_single_system_message() {
        let history = vec![
            Message::system("stale prompt"),
            Message::user("Hi"),
            Message::assistant("Hello!"),
        ];
        let conv = Conversation::from_history("You are helpful.", history);

        assert_eq!(conv.len(), 3);
        assert_eq!(conv.messages()[0].role, Role::System);
        assert_eq!(conv.messages()[0].content, "You are helpful.");
        assert_eq!(
            conv.messages().iter().filter(|m| m.role == Role::System).count(),
            1
        );
    }

    #[test]
    fn test_find_tool_name_scans_backward() {
        let messages = vec![
            Message::assistant_with_tools("", vec![ToolCall::new("call_1", "list_pods", "{}")]),
            Message::tool("call_1", "no pods"),
            Message::assistant_with_tools("", vec![ToolCall::new("call_2", "get_pod_logs", "{}")]),
        ];
        assert_eq!(find_tool_name(&messages, "call_2"), "get_pod_logs");
        assert_eq!(find_tool_name(&messages, "call_1"), "list_pods");
        assert_eq!(find_tool_name(&messages, "missing"), UNKNOWN_TOOL_NAME);
    }

    #[test]
    fn test_dangling_tool_results() {
        let mut conv = Conversation::with_system_prompt("sys");
        conv.push(Message::tool("orphan", "result"));
        conv.push(Message::assistant_with_tools("", vec![ToolCall::new("a", "t", "{}")]));
        conv.push(Message::tool("a", "ok"));

        assert_eq!(conv.dangling_tool_results(), vec!["orphan".to_string()]);
    }

    #[test]
    fn test_system_prompt_takes_first() {
        let messages = vec![Message::system("first"), Message::system("second")];
        assert_eq!(system_prompt(&messages), Some("first"));
    }

    #[test]
    fn test_serde_skips_empty_tool_fields() {
        let json = serde_json::to_value(Message::user("hi")).unwrap();
        assert!(json.get("tool_calls").is_none());
        assert!(json.get("tool_call_id").is_none());
        assert_eq!(json["role"], "user");
    }
}
