//! In-process backend.
//!
//! Rows live in a mutex-guarded vector; inserts are broadcast to change-feed
//! subscribers through an [`InsertFanout`]. Useful for `--memory` sessions
//! and for wiring tests that do not need SQLite.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use wschat_core::repository::{ChangeFeed, MessageRepository, Subscription};
use wschat_types::chat::{ChatMessage, MessageId, NewMessage};
use wschat_types::error::{ChatError, RepositoryError};
use wschat_types::session::SessionId;

use crate::fanout::InsertFanout;

#[derive(Debug, Clone)]
pub struct MemoryBackend {
    rows: Arc<Mutex<Vec<ChatMessage>>>,
    fanout: InsertFanout,
}

impl MemoryBackend {
    pub fn new(feed_capacity: usize) -> Self {
        Self {
            rows: Arc::new(Mutex::new(Vec::new())),
            fanout: InsertFanout::new(feed_capacity),
        }
    }

    fn rows(&self) -> Result<MutexGuard<'_, Vec<ChatMessage>>, RepositoryError> {
        self.rows
            .lock()
            .map_err(|_| RepositoryError::Query("message table lock poisoned".to_string()))
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new(wschat_types::config::ChatConfig::default().feed_capacity)
    }
}

impl MessageRepository for MemoryBackend {
    async fn insert(&self, message: &NewMessage) -> Result<ChatMessage, RepositoryError> {
        if message.content.trim().is_empty() {
            return Err(RepositoryError::Query("content must not be empty".to_string()));
        }
        let row = message
            .clone()
            .into_message(MessageId::generate(), Utc::now());
        // Publish under the lock so feed order matches commit order.
        let mut rows = self.rows()?;
        rows.push(row.clone());
        self.fanout.publish(&row);
        Ok(row)
    }

    async fn delete(&self, user_id: &SessionId, id: &MessageId) -> Result<(), RepositoryError> {
        let mut rows = self.rows()?;
        let before = rows.len();
        rows.retain(|m| !(&m.id == id && &m.user_id == user_id));
        if rows.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn list(&self, user_id: &SessionId) -> Result<Vec<ChatMessage>, RepositoryError> {
        let rows = self.rows()?;
        let mut messages: Vec<ChatMessage> = rows
            .iter()
            .filter(|m| &m.user_id == user_id)
            .cloned()
            .collect();
        messages.sort_by_key(|m| m.created_at);
        Ok(messages)
    }
}

impl ChangeFeed for MemoryBackend {
    async fn subscribe(&self, user_id: &SessionId) -> Result<Subscription, ChatError> {
        Ok(self.fanout.subscribe(user_id))
    }
}
