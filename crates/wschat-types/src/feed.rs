//! Change-feed event types.

use serde::{Deserialize, Serialize};

use crate::chat::ChatMessage;

/// A notification delivered by a session-scoped change feed.
///
/// The feed is append-only: inserts are the only event kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "record", rename_all = "snake_case")]
pub enum FeedEvent {
    Insert(ChatMessage),
}

impl FeedEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            FeedEvent::Insert(_) => "insert",
        }
    }

    pub fn message(&self) -> &ChatMessage {
        match self {
            FeedEvent::Insert(message) => message,
        }
    }

    pub fn into_message(self) -> ChatMessage {
        match self {
            FeedEvent::Insert(message) => message,
        }
    }
}
