//! Conversation titles
//!
//! Best-effort summary of the first user message into a short title. Runs
//! detached from the turn; failures are logged and otherwise ignored.

use std::sync::Arc;

use crate::message::Message;
use crate::provider::LlmProvider;
use crate::session::{SessionId, SessionStore};

const MAX_TITLE_CHARS: usize = 60;

fn title_prompt(user_message: &str) -> String {
    format!(
        "Summarize the following user message into a short, descriptive chat title (max 4 words). \
         Output ONLY the title text, no quotes or punctuation: {user_message}"
    )
}

/// Ask the provider for a title. `None` on failure or an empty answer.
pub async fn generate_title(provider: &dyn LlmProvider, user_message: &str) -> Option<String> {
    let messages = [Message::user(title_prompt(user_message))];
    match provider.complete(&messages, &[]).await {
        Ok(reply) => clean_title(&reply.content),
        Err(e) => {
            tracing::error!(error = %e, "Failed to generate chat title");
            None
        }
    }
}

fn clean_title(raw: &str) -> Option<String> {
    let title = raw
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '.')
        .trim();
    if title.is_empty() {
        return None;
    }
    Some(title.chars().take(MAX_TITLE_CHARS).collect())
}

/// Generate and store a title in the background
pub fn spawn_title_generation(
    provider: Arc<dyn LlmProvider>,
    store: Arc<dyn SessionStore>,
    session_id: SessionId,
    user_message: String,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let Some(title) = generate_title(provider.as_ref(), &user_message).await else {
            return;
        };
        if let Err(e) = store.set_title(&session_id, &title).await {
            tracing::warn!(session_id = %session_id, error = %e, "Failed to store chat title");
        } else {
            tracing::debug!(session_id = %session_id, title, "Generated chat title");
        }
    })
}
