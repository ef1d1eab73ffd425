//! Chat engine: one session's event loop.
//!
//! `ChatEngine::open` authenticates, subscribes to the change feed, loads the
//! snapshot, and then hands everything to a single actor task. That task is
//! the only place where the [`MessageStore`], the [`RequestLifecycle`], and
//! the [`DeletionCoordinator`] are mutated, so none of them need locking.
//! Backend calls (persist, completion, delete) run in spawned tasks that
//! post their outcome back to the actor; feed inserts keep flowing while
//! they are pending.
//!
//! The subscription is opened *before* the snapshot query so no insert can
//! fall between the two. Inserts already covered by the snapshot are then
//! absorbed by the store's dedup-by-id rule.
//!
//! The actor closes the subscription and abandons any in-flight completion
//! on every exit path: `ChatHandle::close`, dropping the handle, sign-out
//! (or another user signing in), and loss of the feed.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use wschat_types::chat::{ChatMessage, MessageId, MessageRole, NewMessage};
use wschat_types::completion::CompletionRequest;
use wschat_types::config::ChatConfig;
use wschat_types::error::{ChatError, CompletionError, RepositoryError};
use wschat_types::notification::ChatNotification;
use wschat_types::session::SessionId;

use crate::auth::SessionProvider;
use crate::completion::CompletionClient;
use crate::deletion::DeletionCoordinator;
use crate::feed::ChangeFeedSubscriber;
use crate::lifecycle::{RequestLifecycle, RequestPhase, Settlement};
use crate::notify::NotificationBus;
use crate::repository::{ChangeFeed, MessageRepository};
use crate::store::MessageStore;

const NOTIFICATION_CAPACITY: usize = 64;

/// Read-only state for rendering.
#[derive(Debug, Clone, Default)]
pub struct ChatView {
    pub messages: Arc<Vec<ChatMessage>>,
    pub typing: bool,
    pub phase: RequestPhase,
}

/// Builder for one session's engine.
pub struct ChatEngine<R, F, C, S> {
    repo: Arc<R>,
    feed: F,
    completion: Arc<C>,
    sessions: S,
    config: ChatConfig,
}

impl<R, F, C, S> ChatEngine<R, F, C, S>
where
    R: MessageRepository + 'static,
    F: ChangeFeed,
    C: CompletionClient + 'static,
    S: SessionProvider,
{
    pub fn new(repo: R, feed: F, completion: C, sessions: S) -> Self {
        Self {
            repo: Arc::new(repo),
            feed,
            completion: Arc::new(completion),
            sessions,
            config: ChatConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ChatConfig) -> Self {
        self.config = config;
        self
    }

    /// Activate the engine for the currently signed-in user.
    ///
    /// Fails with `AuthRequired` when no one is signed in, `Subscription`
    /// when the feed cannot be opened, and `Persist` when the snapshot
    /// query fails (the subscription is closed again in that case).
    pub async fn open(self) -> Result<ChatHandle, ChatError> {
        let user_id = self
            .sessions
            .current_session()
            .filter(|s| !s.is_blank())
            .ok_or(ChatError::AuthRequired)?;
        let mut session_changes = self.sessions.session_changes();
        session_changes.mark_unchanged();

        let mut subscriber = ChangeFeedSubscriber::open(&self.feed, &user_id).await?;
        let mut store = MessageStore::new();
        if let Err(err) = store.load_snapshot(self.repo.as_ref(), &user_id).await {
            subscriber.close();
            return Err(err);
        }
        info!(user_id = %user_id, messages = store.len(), "Chat session opened");

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (outcomes_tx, outcomes_rx) = mpsc::unbounded_channel();
        let messages = Arc::new(store.all().to_vec());
        let (view_tx, view_rx) = watch::channel(ChatView {
            messages: Arc::clone(&messages),
            typing: false,
            phase: RequestPhase::Idle,
        });
        let notifications = NotificationBus::new(NOTIFICATION_CAPACITY);
        let shutdown = CancellationToken::new();

        let actor = SessionActor {
            user_id: user_id.clone(),
            repo: self.repo,
            completion: self.completion,
            store,
            lifecycle: RequestLifecycle::new(),
            deletions: DeletionCoordinator::new(),
            subscriber,
            outcomes: outcomes_tx,
            view: view_tx,
            messages,
            notifications: notifications.clone(),
            preview_chars: self.config.preview_chars,
        };
        let task = tokio::spawn(actor.run(
            commands_rx,
            outcomes_rx,
            session_changes.clone(),
            shutdown.clone(),
        ));

        Ok(ChatHandle {
            user_id,
            commands: commands_tx,
            view: view_rx,
            sessions: session_changes,
            notifications,
            shutdown,
            task: Some(task),
        })
    }
}

enum Command {
    Send(String),
    Cancel,
    Delete(MessageId),
}

enum TaskOutcome {
    Persisted {
        text: String,
        result: Result<ChatMessage, RepositoryError>,
    },
    Completed {
        generation: u64,
        outcome: Result<(), CompletionError>,
    },
    Deleted {
        id: MessageId,
        result: Result<(), RepositoryError>,
    },
}

struct SessionActor<R, C> {
    user_id: SessionId,
    repo: Arc<R>,
    completion: Arc<C>,
    store: MessageStore,
    lifecycle: RequestLifecycle,
    deletions: DeletionCoordinator,
    subscriber: ChangeFeedSubscriber,
    outcomes: mpsc::UnboundedSender<TaskOutcome>,
    view: watch::Sender<ChatView>,
    messages: Arc<Vec<ChatMessage>>,
    notifications: NotificationBus,
    preview_chars: usize,
}

impl<R, C> SessionActor<R, C>
where
    R: MessageRepository + 'static,
    C: CompletionClient + 'static,
{
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut outcomes: mpsc::UnboundedReceiver<TaskOutcome>,
        mut session_changes: watch::Receiver<Option<SessionId>>,
        shutdown: CancellationToken,
    ) -> Result<(), ChatError> {
        // A dropped provider can no longer sign anyone out.
        let mut watching_sessions = true;
        let result = loop {
            tokio::select! {
                _ = shutdown.cancelled() => break Ok(()),
                changed = session_changes.changed(), if watching_sessions => {
                    if changed.is_err() {
                        debug!(user_id = %self.user_id, "Session provider dropped");
                        watching_sessions = false;
                        continue;
                    }
                    let still_signed_in =
                        session_changes.borrow_and_update().as_ref() == Some(&self.user_id);
                    if !still_signed_in {
                        info!(user_id = %self.user_id, "Session ended");
                        break Ok(());
                    }
                }
                Some(command) = commands.recv() => self.handle_command(command),
                Some(outcome) = outcomes.recv() => self.handle_outcome(outcome),
                event = self.subscriber.next() => match event {
                    Some(Ok(message)) => self.handle_insert(message),
                    Some(Err(err)) => {
                        self.notifications.publish(ChatNotification::Failed(err.clone()));
                        break Err(err);
                    }
                    None => break Err(ChatError::Subscription("change feed closed".to_string())),
                },
            }
        };
        self.teardown();
        result
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Send(text) => self.start_send(text),
            Command::Cancel => {
                if self.lifecycle.cancel() {
                    info!(user_id = %self.user_id, "Reply stopped");
                    self.notifications.publish(ChatNotification::Stopped);
                    self.publish_view(false);
                } else {
                    self.notifications.publish(ChatNotification::NothingToCancel);
                }
            }
            Command::Delete(id) => self.start_delete(id),
        }
    }

    fn start_send(&mut self, text: String) {
        let new = NewMessage::user(self.user_id.clone(), text);
        self.lifecycle.begin_send();
        self.publish_view(false);

        let repo = Arc::clone(&self.repo);
        let outcomes = self.outcomes.clone();
        tokio::spawn(async move {
            let result = repo.insert(&new).await;
            let _ = outcomes.send(TaskOutcome::Persisted {
                text: new.content,
                result,
            });
        });
    }

    fn start_delete(&mut self, id: MessageId) {
        if !self.deletions.begin(&id) {
            debug!(message_id = %id, "Delete already in flight");
            self.notifications
                .publish(ChatNotification::Failed(ChatError::Validation(
                    "delete already in progress".to_string(),
                )));
            return;
        }
        let user_id = self.user_id.clone();
        let repo = Arc::clone(&self.repo);
        let outcomes = self.outcomes.clone();
        tokio::spawn(async move {
            let result = repo.delete(&user_id, &id).await;
            let _ = outcomes.send(TaskOutcome::Deleted { id, result });
        });
    }

    fn handle_outcome(&mut self, outcome: TaskOutcome) {
        match outcome {
            TaskOutcome::Persisted { text, result } => match result {
                Ok(saved) => {
                    debug!(message_id = %saved.id, "User message persisted");
                    self.request_reply(text);
                }
                Err(err) => {
                    warn!(user_id = %self.user_id, error = %err, "Failed to send message");
                    self.lifecycle.persist_failed();
                    self.notifications
                        .publish(ChatNotification::Failed(ChatError::from(err)));
                    self.publish_view(false);
                }
            },
            TaskOutcome::Completed {
                generation,
                outcome,
            } => match self.lifecycle.settle(generation, outcome) {
                Settlement::Current(Ok(())) => {
                    debug!(generation, "Completion finished");
                    self.publish_view(false);
                }
                Settlement::Current(Err(err)) => {
                    warn!(generation, error = %err, "Completion failed");
                    self.notifications
                        .publish(ChatNotification::Failed(ChatError::from(err)));
                    self.publish_view(false);
                }
                Settlement::Stale => {}
            },
            TaskOutcome::Deleted { id, result } => {
                let note = self.deletions.settle(&mut self.store, id, result);
                self.notifications.publish(note);
                self.publish_view(true);
            }
        }
    }

    fn request_reply(&mut self, text: String) {
        let ticket = self.lifecycle.persist_succeeded();
        self.publish_view(false);
        debug!(generation = ticket.generation, "Requesting reply");

        let request = CompletionRequest::new(text, self.user_id.clone());
        let completion = Arc::clone(&self.completion);
        let outcomes = self.outcomes.clone();
        tokio::spawn(async move {
            let outcome = completion.complete(&request, ticket.cancellation).await;
            let _ = outcomes.send(TaskOutcome::Completed {
                generation: ticket.generation,
                outcome,
            });
        });
    }

    fn handle_insert(&mut self, message: ChatMessage) {
        let reply_preview =
            (message.role == MessageRole::Assistant).then(|| message.preview(self.preview_chars));
        let id = message.id.clone();
        if !self.store.apply_insert(message) {
            debug!(message_id = %id, "Duplicate feed insert ignored");
            return;
        }
        if let Some(preview) = reply_preview {
            self.notifications
                .publish(ChatNotification::AssistantReplied { preview });
        }
        self.publish_view(true);
    }

    fn publish_view(&mut self, messages_changed: bool) {
        if messages_changed {
            self.messages = Arc::new(self.store.all().to_vec());
        }
        self.view.send_replace(ChatView {
            messages: Arc::clone(&self.messages),
            typing: self.lifecycle.is_typing(),
            phase: self.lifecycle.phase(),
        });
    }

    fn teardown(&mut self) {
        self.lifecycle.cancel();
        self.subscriber.close();
        self.publish_view(false);
        info!(user_id = %self.user_id, "Chat session closed");
    }
}

/// Caller-side handle of a running chat session.
///
/// Dropping the handle ends the session.
pub struct ChatHandle {
    user_id: SessionId,
    commands: mpsc::UnboundedSender<Command>,
    view: watch::Receiver<ChatView>,
    sessions: watch::Receiver<Option<SessionId>>,
    notifications: NotificationBus,
    shutdown: CancellationToken,
    task: Option<JoinHandle<Result<(), ChatError>>>,
}

impl ChatHandle {
    pub fn session(&self) -> &SessionId {
        &self.user_id
    }

    /// Send a user message and request the assistant's reply.
    ///
    /// Blank text is rejected with `Validation` and a signed-out session
    /// with `AuthRequired`; neither touches any state.
    pub fn send(&self, text: &str) -> Result<(), ChatError> {
        let text = RequestLifecycle::validate(text, self.active_session().as_ref())?;
        self.dispatch(Command::Send(text))
    }

    /// Stop waiting for the in-flight reply, if there is one.
    pub fn cancel(&self) -> Result<(), ChatError> {
        self.dispatch(Command::Cancel)
    }

    /// Delete a message from the backend, then from the view.
    pub fn delete(&self, id: MessageId) -> Result<(), ChatError> {
        if self.active_session().is_none() {
            return Err(ChatError::AuthRequired);
        }
        self.dispatch(Command::Delete(id))
    }

    pub fn view(&self) -> ChatView {
        self.view.borrow().clone()
    }

    pub fn watch_view(&self) -> watch::Receiver<ChatView> {
        self.view.clone()
    }

    pub fn messages(&self) -> Arc<Vec<ChatMessage>> {
        Arc::clone(&self.view.borrow().messages)
    }

    pub fn is_typing(&self) -> bool {
        self.view.borrow().typing
    }

    pub fn notifications(&self) -> broadcast::Receiver<ChatNotification> {
        self.notifications.subscribe()
    }

    pub fn is_closed(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// End the session and wait for teardown.
    ///
    /// Returns the reason the session stopped on its own, if it did
    /// (e.g., `Subscription` after the feed was lost).
    pub async fn close(mut self) -> Result<(), ChatError> {
        self.shutdown.cancel();
        match self.task.take() {
            Some(task) => task.await.unwrap_or_else(|err| {
                Err(ChatError::Subscription(format!("chat session task failed: {err}")))
            }),
            None => Ok(()),
        }
    }

    fn active_session(&self) -> Option<SessionId> {
        self.sessions
            .borrow()
            .as_ref()
            .filter(|s| **s == self.user_id)
            .cloned()
    }

    fn dispatch(&self, command: Command) -> Result<(), ChatError> {
        self.commands
            .send(command)
            .map_err(|_| ChatError::Subscription("chat session is closed".to_string()))
    }
}

impl Drop for ChatHandle {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
