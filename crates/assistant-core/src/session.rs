//! Session Management
//!
//! Conversation sessions are append-only message logs. The [`SessionStore`]
//! trait is the persistence bridge the conversation loop reads history from
//! and writes every new message to.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AgentError, Result};
use crate::message::Message;

/// Title given to sessions until one is generated
pub const DEFAULT_SESSION_TITLE: &str = "New Chat";

/// Unique session identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A conversation session with its message log
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,

    /// Owner
    pub user_id: String,

    pub title: String,

    pub created_at: DateTime<Utc>,

    /// Last activity timestamp
    pub updated_at: DateTime<Utc>,

    /// Ordered, append-only log
    pub messages: Vec<Message>,
}

impl Session {
    pub fn new(user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            user_id: user_id.into(),
            title: DEFAULT_SESSION_TITLE.into(),
            created_at: now,
            updated_at: now,
            messages: Vec::new(),
        }
    }

    /// Whether the title still needs generating
    pub fn has_default_title(&self) -> bool {
        self.title == DEFAULT_SESSION_TITLE
    }
}

/// Session listing entry (no messages)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: SessionId,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub message_count: usize,
}

impl From<&Session> for SessionSummary {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id.clone(),
            title: session.title.clone(),
            created_at: session.created_at,
            updated_at: session.updated_at,
            message_count: session.messages.len(),
        }
    }
}

/// Persistence bridge for conversation sessions.
///
/// Appends to one session must be serialized and visible to the next read
/// within the same turn.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load a session owned by `user_id`, with messages in order
    async fn load_session(&self, id: &SessionId, user_id: &str) -> Result<Session>;

    /// Create an empty session for `user_id`
    async fn create_session(&self, user_id: &str) -> Result<Session>;

    /// Append one message to the session log
    async fn append_message(&self, id: &SessionId, message: &Message) -> Result<()>;

    /// Bump the activity timestamp
    async fn touch_session(&self, id: &SessionId) -> Result<()>;

    async fn set_title(&self, id: &SessionId, title: &str) -> Result<()>;

    /// Sessions owned by `user_id`, most recently updated first
    async fn list_sessions(&self, user_id: &str, limit: usize) -> Result<Vec<SessionSummary>>;
}

/// In-memory session store (for development/testing)
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<SessionId, Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load_session(&self, id: &SessionId, user_id: &str) -> Result<Session> {
        let sessions = self.sessions.read().await;
        sessions
            .get(id)
            .filter(|s| s.user_id == user_id)
            .cloned()
            .ok_or_else(|| AgentError::SessionNotFound(id.to_string()))
    }

    async fn create_session(&self, user_id: &str) -> Result<Session> {
        let session = Session::new(user_id);
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        tracing::debug!(session_id = %session.id, user_id, "Created session");
        Ok(session)
    }

    async fn append_message(&self, id: &SessionId, message: &Message) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| AgentError::SessionNotFound(id.to_string()))?;
        session.messages.push(message.clone());
        Ok(())
    }

    async fn touch_session(&self, id: &SessionId) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| AgentError::SessionNotFound(id.to_string()))?;
        session.updated_at = Utc::now();
        Ok(())
    }

    async fn set_title(&self, id: &SessionId, title: &str) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| AgentError::SessionNotFound(id.to_string()))?;
        session.title = title.to_string();
        Ok(())
    }

    async fn list_sessions(&self, user_id: &str, limit: usize) -> Result<Vec<SessionSummary>> {
        let sessions = self.sessions.read().await;
        let mut result: Vec<_> = sessions
            .values()
            .filter(|s| s.user_id == user_id)
            .map(SessionSummary::from)
            .collect();

        // Sort by updated_at descending
        result.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        result.truncate(limit);

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_creation() {
        let session = Session::new("u1");
        assert!(session.has_default_title());
        assert!(session.messages.is_empty());
        assert_eq!(session.user_id, "u1");
    }

    #[tokio::test]
    async fn test_append_is_visible_to_next_load() {
        let store = MemorySessionStore::new();
        let session = store.create_session("u1").await.unwrap();

        store.append_message(&session.id, &Message::user("first")).await.unwrap();
        store.append_message(&session.id, &Message::assistant("second")).await.unwrap();

        let loaded = store.load_session(&session.id, "u1").await.unwrap();
        let contents: Vec<_> = loaded.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_load_is_scoped_to_owner() {
        let store = MemorySessionStore::new();
        let session = store.create_session("alice").await.unwrap();

        let err = store.load_session(&session.id, "bob").await.unwrap_err();
        assert!(matches!(err, AgentError::SessionNotFound(_)));

        let err = store
            .load_session(&SessionId::from_string("missing"), "alice")
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn test_list_sessions_most_recent_first() {
        let store = MemorySessionStore::new();
        let older = store.create_session("u1").await.unwrap();
        let newer = store.create_session("u1").await.unwrap();
        store.create_session("someone-else").await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        store.touch_session(&older.id).await.unwrap();
        store.set_title(&older.id, "Pod restarts").await.unwrap();

        let listed = store.list_sessions("u1", 10).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, older.id);
        assert_eq!(listed[0].title, "Pod restarts");
        assert_eq!(listed[1].id, newer.id);
        assert_eq!(store.len().await, 3);
    }
}
