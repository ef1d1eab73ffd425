//! Persistence backend ports.
//!
//! `MessageRepository` is the append-only message table; `ChangeFeed` is its
//! subscribe-to-inserts primitive. Implementations live in wschat-infra
//! (e.g., `MemoryBackend`, `SqliteBackend`). Uses native async fn in traits
//! (RPITIT, Rust 2024 edition).

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use wschat_types::chat::{ChatMessage, MessageId, NewMessage};
use wschat_types::error::{ChatError, RepositoryError};
use wschat_types::feed::FeedEvent;
use wschat_types::session::SessionId;

/// Message persistence.
pub trait MessageRepository: Send + Sync {
    /// Persist a message. The backend assigns and returns its id.
    fn insert(
        &self,
        message: &NewMessage,
    ) -> impl std::future::Future<Output = Result<ChatMessage, RepositoryError>> + Send;

    /// Delete one of `user_id`'s messages by id.
    ///
    /// A row owned by another user is reported as `NotFound`.
    fn delete(
        &self,
        user_id: &SessionId,
        id: &MessageId,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// All messages of one user, ordered by created_at ASC.
    fn list(
        &self,
        user_id: &SessionId,
    ) -> impl std::future::Future<Output = Result<Vec<ChatMessage>, RepositoryError>> + Send;
}

/// Subscribe-to-inserts primitive of the backend.
pub trait ChangeFeed: Send + Sync {
    /// Open a subscription filtered server-side to `user_id`'s rows.
    ///
    /// Fails with `ChatError::Subscription` when it cannot be established.
    fn subscribe(
        &self,
        user_id: &SessionId,
    ) -> impl std::future::Future<Output = Result<Subscription, ChatError>> + Send;
}

/// A live backend subscription.
///
/// `events` yields inserts in commit order. An `Err` item means the
/// subscription dropped; nothing follows it. Cancelling `teardown` is the
/// backend's unsubscribe.
#[derive(Debug)]
pub struct Subscription {
    pub events: mpsc::Receiver<Result<FeedEvent, ChatError>>,
    pub teardown: CancellationToken,
}

impl Subscription {
    pub fn new(
        events: mpsc::Receiver<Result<FeedEvent, ChatError>>,
        teardown: CancellationToken,
    ) -> Self {
        Self { events, teardown }
    }
}

impl<T: MessageRepository> MessageRepository for Arc<T> {
    fn insert(
        &self,
        message: &NewMessage,
    ) -> impl std::future::Future<Output = Result<ChatMessage, RepositoryError>> + Send {
        (**self).insert(message)
    }

    fn delete(
        &self,
        user_id: &SessionId,
        id: &MessageId,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send {
        (**self).delete(user_id, id)
    }

    fn list(
        &self,
        user_id: &SessionId,
    ) -> impl std::future::Future<Output = Result<Vec<ChatMessage>, RepositoryError>> + Send {
        (**self).list(user_id)
    }
}

impl<T: ChangeFeed> ChangeFeed for Arc<T> {
    fn subscribe(
        &self,
        user_id: &SessionId,
    ) -> impl std::future::Future<Output = Result<Subscription, ChatError>> + Send {
        (**self).subscribe(user_id)
    }
}
