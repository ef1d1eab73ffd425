//! The rendered conversation: an ordered, id-deduplicated message list.
//!
//! Contents come from exactly one snapshot load followed by feed inserts.
//! Order is arrival order (snapshot order, then feed order); nothing is
//! re-sorted by timestamp. Ids are unique within a store, and an id removed
//! after a confirmed delete is never admitted again.

use std::collections::HashSet;

use tracing::debug;
use wschat_types::chat::{ChatMessage, MessageId};
use wschat_types::error::ChatError;
use wschat_types::session::SessionId;

use crate::repository::MessageRepository;

#[derive(Debug, Default)]
pub struct MessageStore {
    messages: Vec<ChatMessage>,
    ids: HashSet<MessageId>,
    deleted: HashSet<MessageId>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the user's history (created_at ascending) and replace the
    /// store's contents with it. Returns the number of stored messages.
    pub async fn load_snapshot<R: MessageRepository>(
        &mut self,
        repo: &R,
        user_id: &SessionId,
    ) -> Result<usize, ChatError> {
        let messages = repo.list(user_id).await?;
        self.replace(messages);
        debug!(user_id = %user_id, count = self.len(), "Snapshot loaded");
        Ok(self.len())
    }

    /// Replace the contents, keeping the first occurrence of any repeated id.
    pub fn replace(&mut self, messages: Vec<ChatMessage>) {
        self.messages.clear();
        self.ids.clear();
        for message in messages {
            self.apply_insert(message);
        }
    }

    /// Append `message` unless its id is already present or was deleted.
    ///
    /// Returns `true` when the message was added.
    pub fn apply_insert(&mut self, message: ChatMessage) -> bool {
        if self.deleted.contains(&message.id) || !self.ids.insert(message.id.clone()) {
            return false;
        }
        self.messages.push(message);
        true
    }

    /// Drop the message with `id` once the backend confirmed its delete.
    ///
    /// The id stays refused afterwards, including when its insert event has
    /// not arrived yet. Returns `false` when it was not present.
    pub fn remove(&mut self, id: &MessageId) -> bool {
        self.deleted.insert(id.clone());
        if !self.ids.remove(id) {
            return false;
        }
        self.messages.retain(|m| &m.id != id);
        true
    }

    pub fn all(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn contains(&self, id: &MessageId) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
