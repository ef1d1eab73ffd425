//! User-visible notifications emitted by the chat engine.
//!
//! These replace the toast calls a UI would make: the engine publishes them
//! on a broadcast channel and the rendering layer decides how to show them.

use serde::Serialize;

use crate::chat::MessageId;
use crate::error::ChatError;

/// Visual weight of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatNotification {
    /// An assistant message was newly admitted into the store.
    AssistantReplied { preview: String },
    /// The in-flight completion was cancelled by the user.
    Stopped,
    /// `cancel()` was called with nothing in flight.
    NothingToCancel,
    /// A delete was confirmed by the backend and applied locally.
    MessageDeleted { id: MessageId },
    Failed(ChatError),
}

impl ChatNotification {
    pub fn severity(&self) -> Severity {
        match self {
            ChatNotification::AssistantReplied { .. } | ChatNotification::MessageDeleted { .. } => {
                Severity::Success
            }
            ChatNotification::Stopped | ChatNotification::NothingToCancel => Severity::Info,
            ChatNotification::Failed(_) => Severity::Error,
        }
    }

    /// Short human-readable text for the notification.
    pub fn title(&self) -> String {
        match self {
            ChatNotification::AssistantReplied { .. } => "Assistant replied".to_string(),
            ChatNotification::Stopped => "Stopped".to_string(),
            ChatNotification::NothingToCancel => "Nothing to cancel".to_string(),
            ChatNotification::MessageDeleted { .. } => "Message deleted".to_string(),
            ChatNotification::Failed(err) => match err {
                ChatError::Persist(_) => "Failed to save changes".to_string(),
                ChatError::Completion(_) => {
                    "Failed to get AI response. Please try again.".to_string()
                }
                other => other.to_string(),
            },
        }
    }
}
