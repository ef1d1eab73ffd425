//! Chat message types.
//!
//! A `ChatMessage` is a persisted row: its `id` is always assigned by the
//! backend at insert time. Clients submit a `NewMessage` (no id) and only
//! ever learn the id from the backend's reply, the snapshot, or the feed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

use crate::session::SessionId;

/// Opaque, backend-assigned message identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Mint a fresh id. Only backends call this; the engine never does.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for MessageId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            other => Err(format!("invalid message role: '{other}'")),
        }
    }
}

/// A persisted message belonging to one user's conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub user_id: SessionId,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// First `max_chars` characters of the content followed by `...`.
    ///
    /// Counts characters, not bytes, so multi-byte text is never split.
    pub fn preview(&self, max_chars: usize) -> String {
        let mut preview: String = self.content.chars().take(max_chars).collect();
        preview.push_str("...");
        preview
    }
}

/// Insert payload. The backend assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
    pub user_id: SessionId,
    pub role: MessageRole,
    pub content: String,
}

impl NewMessage {
    pub fn user(user_id: SessionId, content: impl Into<String>) -> Self {
        Self {
            user_id,
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(user_id: SessionId, content: impl Into<String>) -> Self {
        Self {
            user_id,
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }

    /// Materialize the row a backend stores for this payload.
    pub fn into_message(self, id: MessageId, created_at: DateTime<Utc>) -> ChatMessage {
        ChatMessage {
            id,
            user_id: self.user_id,
            role: self.role,
            content: self.content,
            created_at,
        }
    }
}
