//! Deletion coordinator.
//!
//! Remote first, local second: a message leaves the [`MessageStore`] only
//! after the backend confirmed the delete. A failed delete leaves the store
//! untouched, so there is nothing to roll back.

use std::collections::HashSet;

use tracing::{info, warn};
use wschat_types::chat::MessageId;
use wschat_types::error::{ChatError, RepositoryError};
use wschat_types::notification::ChatNotification;
use wschat_types::session::SessionId;

use crate::repository::MessageRepository;
use crate::store::MessageStore;

#[derive(Debug, Default)]
pub struct DeletionCoordinator {
    pending: HashSet<MessageId>,
}

impl DeletionCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a delete about to be issued for `id`.
    ///
    /// Returns `false` if one is already outstanding for the same id, in
    /// which case no second backend call should be made.
    pub fn begin(&mut self, id: &MessageId) -> bool {
        self.pending.insert(id.clone())
    }

    pub fn is_pending(&self, id: &MessageId) -> bool {
        self.pending.contains(id)
    }

    /// Apply the backend's answer for a delete started with [`begin`](Self::begin).
    pub fn settle(
        &mut self,
        store: &mut MessageStore,
        id: MessageId,
        result: Result<(), RepositoryError>,
    ) -> ChatNotification {
        self.pending.remove(&id);
        match result {
            Ok(()) => {
                store.remove(&id);
                info!(message_id = %id, "Message deleted");
                ChatNotification::MessageDeleted { id }
            }
            Err(err) => {
                warn!(message_id = %id, error = %err, "Failed to delete message");
                ChatNotification::Failed(ChatError::from(err))
            }
        }
    }

    /// Issue the backend delete for one of `user_id`'s messages and settle
    /// it in one step.
    pub async fn delete<R: MessageRepository>(
        &mut self,
        repo: &R,
        store: &mut MessageStore,
        user_id: &SessionId,
        id: MessageId,
    ) -> ChatNotification {
        self.begin(&id);
        let result = repo.delete(user_id, &id).await;
        self.settle(store, id, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{message, MockBackend};
    use wschat_types::chat::MessageRole;

    #[tokio::test]
    async fn test_failed_delete_keeps_message() {
        let backend = MockBackend::new();
        backend.fail_delete(true);
        let mut store = MessageStore::new();
        store.apply_insert(message("m1", MessageRole::User, "hi"));

        let mut coordinator = DeletionCoordinator::new();
        let note = coordinator
            .delete(&backend, &mut store, &SessionId::new("u1"), MessageId::from("m1"))
            .await;

        assert!(matches!(note, ChatNotification::Failed(ChatError::Persist(_))));
        assert!(store.contains(&MessageId::from("m1")));
        assert!(!coordinator.is_pending(&MessageId::from("m1")));
    }

    #[tokio::test]
    async fn test_confirmed_delete_removes_message() {
        let backend = MockBackend::new();
        let seeded = backend.seed(message("m1", MessageRole::User, "hi"));
        let mut store = MessageStore::new();
        store.apply_insert(seeded);

        let mut coordinator = DeletionCoordinator::new();
        let note = coordinator
            .delete(&backend, &mut store, &SessionId::new("u1"), MessageId::from("m1"))
            .await;

        assert_eq!(note, ChatNotification::MessageDeleted { id: MessageId::from("m1") });
        assert!(!store.contains(&MessageId::from("m1")));
        assert_eq!(backend.row_count(), 0);
    }

    #[test]
    fn test_duplicate_begin_is_refused() {
        let mut coordinator = DeletionCoordinator::new();
        let id = MessageId::from("m1");
        assert!(coordinator.begin(&id));
        assert!(!coordinator.begin(&id));

        let mut store = MessageStore::new();
        coordinator.settle(&mut store, id.clone(), Ok(()));
        assert!(coordinator.begin(&id));
    }
}
