//! Shared mocks for unit tests.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::sync::{mpsc, oneshot, Notify};
use tokio_util::sync::CancellationToken;
use wschat_types::chat::{ChatMessage, MessageId, MessageRole, NewMessage};
use wschat_types::completion::CompletionRequest;
use wschat_types::error::{ChatError, CompletionError, RepositoryError};
use wschat_types::feed::FeedEvent;
use wschat_types::session::SessionId;

use crate::completion::CompletionClient;
use crate::repository::{ChangeFeed, MessageRepository, Subscription};

pub(crate) fn message(id: &str, role: MessageRole, content: &str) -> ChatMessage {
    message_for("u1", id, role, content)
}

pub(crate) fn message_for(user: &str, id: &str, role: MessageRole, content: &str) -> ChatMessage {
    ChatMessage {
        id: MessageId::from(id),
        user_id: SessionId::new(user),
        role,
        content: content.to_string(),
        created_at: Utc::now(),
    }
}

type FeedSender = mpsc::Sender<Result<FeedEvent, ChatError>>;

#[derive(Default)]
struct BackendState {
    rows: Vec<ChatMessage>,
    feeds: Vec<(FeedSender, CancellationToken)>,
    next_id: u64,
    inserts: usize,
    fail_insert: bool,
    fail_delete: bool,
    fail_list: bool,
    fail_subscribe: bool,
    delete_gate: Option<Arc<Notify>>,
}

/// Backend mock: ids are minted as `m1`, `m2`, ... and every insert is
/// fanned out to all live subscriptions without filtering, so the
/// subscriber's own session guard is exercised.
#[derive(Clone, Default)]
pub(crate) struct MockBackend {
    state: Arc<Mutex<BackendState>>,
}

impl MockBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut BackendState) -> T) -> T {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    /// Store a row without notifying subscribers.
    pub(crate) fn seed(&self, message: ChatMessage) -> ChatMessage {
        self.with_state(|s| s.rows.push(message.clone()));
        message
    }

    /// Deliver a feed event without storing a row (redelivery).
    pub(crate) fn publish(&self, message: ChatMessage) {
        self.with_state(|s| fan_out(s, &message));
    }

    /// Drop every live subscription with an error.
    pub(crate) fn break_feeds(&self) {
        self.with_state(|s| {
            for (tx, _) in s.feeds.drain(..) {
                let _ = tx.try_send(Err(ChatError::Subscription("connection reset".to_string())));
            }
        });
    }

    pub(crate) fn live_subscriptions(&self) -> usize {
        self.with_state(|s| {
            s.feeds
                .iter()
                .filter(|(tx, token)| !tx.is_closed() && !token.is_cancelled())
                .count()
        })
    }

    pub(crate) fn rows(&self) -> Vec<ChatMessage> {
        self.with_state(|s| s.rows.clone())
    }

    pub(crate) fn row_count(&self) -> usize {
        self.with_state(|s| s.rows.len())
    }

    pub(crate) fn insert_calls(&self) -> usize {
        self.with_state(|s| s.inserts)
    }

    pub(crate) fn fail_insert(&self, fail: bool) {
        self.with_state(|s| s.fail_insert = fail);
    }

    pub(crate) fn fail_delete(&self, fail: bool) {
        self.with_state(|s| s.fail_delete = fail);
    }

    pub(crate) fn fail_list(&self, fail: bool) {
        self.with_state(|s| s.fail_list = fail);
    }

    /// Make every delete wait until the returned gate is notified.
    pub(crate) fn hold_deletes(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.with_state(|s| s.delete_gate = Some(Arc::clone(&gate)));
        gate
    }

    pub(crate) fn fail_subscribe(&self, fail: bool) {
        self.with_state(|s| s.fail_subscribe = fail);
    }
}

fn fan_out(state: &mut BackendState, message: &ChatMessage) {
    state
        .feeds
        .retain(|(tx, token)| !token.is_cancelled() && !tx.is_closed());
    for (tx, _) in &state.feeds {
        let _ = tx.try_send(Ok(FeedEvent::Insert(message.clone())));
    }
}

impl MessageRepository for MockBackend {
    async fn insert(&self, message: &NewMessage) -> Result<ChatMessage, RepositoryError> {
        self.with_state(|s| {
            s.inserts += 1;
            if s.fail_insert {
                return Err(RepositoryError::Query("insert rejected".to_string()));
            }
            s.next_id += 1;
            let row = message
                .clone()
                .into_message(MessageId::from(format!("m{}", s.next_id)), Utc::now());
            s.rows.push(row.clone());
            fan_out(s, &row);
            Ok(row)
        })
    }

    async fn delete(&self, user_id: &SessionId, id: &MessageId) -> Result<(), RepositoryError> {
        let gate = self.with_state(|s| s.delete_gate.clone());
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.with_state(|s| {
            if s.fail_delete {
                return Err(RepositoryError::Query("delete rejected".to_string()));
            }
            let before = s.rows.len();
            s.rows.retain(|m| !(&m.id == id && &m.user_id == user_id));
            if s.rows.len() == before {
                return Err(RepositoryError::NotFound);
            }
            Ok(())
        })
    }

    async fn list(&self, user_id: &SessionId) -> Result<Vec<ChatMessage>, RepositoryError> {
        self.with_state(|s| {
            if s.fail_list {
                return Err(RepositoryError::Connection);
            }
            let mut rows: Vec<ChatMessage> = s
                .rows
                .iter()
                .filter(|m| &m.user_id == user_id)
                .cloned()
                .collect();
            rows.sort_by_key(|m| m.created_at);
            Ok(rows)
        })
    }
}

impl ChangeFeed for MockBackend {
    async fn subscribe(&self, _user_id: &SessionId) -> Result<Subscription, ChatError> {
        self.with_state(|s| {
            if s.fail_subscribe {
                return Err(ChatError::Subscription("channel refused".to_string()));
            }
            let (tx, rx) = mpsc::channel(64);
            let token = CancellationToken::new();
            s.feeds.push((tx, token.clone()));
            Ok(Subscription::new(rx, token))
        })
    }
}

/// A completion call held open until the test resolves it.
pub(crate) struct PendingCall {
    pub(crate) request: CompletionRequest,
    pub(crate) cancel: CancellationToken,
    respond: oneshot::Sender<Result<(), CompletionError>>,
}

impl PendingCall {
    pub(crate) fn succeed(self) {
        let _ = self.respond.send(Ok(()));
    }

    pub(crate) fn fail(self, reason: &str) {
        let _ = self
            .respond
            .send(Err(CompletionError::Transport(reason.to_string())));
    }
}

pub(crate) struct MockCompletion {
    calls: mpsc::UnboundedSender<PendingCall>,
}

pub(crate) fn mock_completion() -> (MockCompletion, mpsc::UnboundedReceiver<PendingCall>) {
    let (calls, rx) = mpsc::unbounded_channel();
    (MockCompletion { calls }, rx)
}

impl CompletionClient for MockCompletion {
    async fn complete(
        &self,
        request: &CompletionRequest,
        cancel: CancellationToken,
    ) -> Result<(), CompletionError> {
        let (respond, response) = oneshot::channel();
        self.calls
            .send(PendingCall {
                request: request.clone(),
                cancel: cancel.clone(),
                respond,
            })
            .map_err(|_| CompletionError::Transport("test harness gone".to_string()))?;

        tokio::select! {
            _ = cancel.cancelled() => Err(CompletionError::Cancelled),
            response = response => response
                .unwrap_or_else(|_| Err(CompletionError::Transport("call dropped".to_string()))),
        }
    }
}
