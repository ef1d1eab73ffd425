//! Insert fan-out shared by the backends' change feeds.
//!
//! Every committed insert is broadcast once. Each subscription gets a
//! forwarder task that applies the `user_id` filter on the backend side and
//! feeds a bounded mpsc, which is what a [`Subscription`] carries. A lagged
//! broadcast receiver ends the subscription with an error instead of
//! silently skipping rows.

use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use wschat_core::repository::Subscription;
use wschat_types::chat::ChatMessage;
use wschat_types::error::ChatError;
use wschat_types::feed::FeedEvent;
use wschat_types::session::SessionId;

#[derive(Debug, Clone)]
pub struct InsertFanout {
    tx: broadcast::Sender<ChatMessage>,
    capacity: usize,
}

impl InsertFanout {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Announce a committed insert. No-op without subscribers.
    pub fn publish(&self, message: &ChatMessage) {
        let _ = self.tx.send(message.clone());
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Open a subscription scoped to `user_id`'s inserts.
    ///
    /// Must be called inside a tokio runtime.
    pub fn subscribe(&self, user_id: &SessionId) -> Subscription {
        let rx = self.tx.subscribe();
        let (events_tx, events_rx) = mpsc::channel(self.capacity);
        let teardown = CancellationToken::new();
        tokio::spawn(forward(
            rx,
            events_tx,
            user_id.clone(),
            teardown.clone(),
        ));
        Subscription::new(events_rx, teardown)
    }
}

async fn forward(
    mut rx: broadcast::Receiver<ChatMessage>,
    events: mpsc::Sender<Result<FeedEvent, ChatError>>,
    user_id: SessionId,
    teardown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = teardown.cancelled() => break,
            _ = events.closed() => break,
            received = rx.recv() => match received {
                Ok(message) if message.user_id == user_id => {
                    if events.send(Ok(FeedEvent::Insert(message))).await.is_err() {
                        break;
                    }
                }
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(user_id = %user_id, skipped, "Change feed subscriber lagged");
                    let _ = events
                        .send(Err(ChatError::Subscription(format!(
                            "change feed lagged by {skipped} events"
                        ))))
                        .await;
                    break;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    let _ = events
                        .send(Err(ChatError::Subscription("backend closed".to_string())))
                        .await;
                    break;
                }
            },
        }
    }
    tracing::debug!(user_id = %user_id, "Change feed forwarder stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::time::Duration;
    use tokio::time::timeout;
    use wschat_types::chat::{MessageId, MessageRole};

    fn message(user: &str, id: &str) -> ChatMessage {
        ChatMessage {
            id: MessageId::from(id),
            user_id: SessionId::new(user),
            role: MessageRole::User,
            content: format!("content of {id}"),
            created_at: Utc::now(),
        }
    }

    async fn next_event(sub: &mut Subscription) -> Result<FeedEvent, ChatError> {
        timeout(Duration::from_secs(1), sub.events.recv())
            .await
            .expect("no event")
            .expect("channel closed")
    }

    #[tokio::test]
    async fn forwards_only_matching_user() {
        let fanout = InsertFanout::new(16);
        let mut sub = fanout.subscribe(&SessionId::new("u1"));

        fanout.publish(&message("u2", "x1"));
        fanout.publish(&message("u1", "a1"));
        fanout.publish(&message("u1", "a2"));

        let first = next_event(&mut sub).await.unwrap().into_message();
        let second = next_event(&mut sub).await.unwrap().into_message();
        assert_eq!(first.id.as_str(), "a1");
        assert_eq!(second.id.as_str(), "a2");
    }

    #[tokio::test]
    async fn lag_ends_subscription_with_error() {
        let fanout = InsertFanout::new(2);
        let mut sub = fanout.subscribe(&SessionId::new("u1"));

        // Fill the forwarder's mpsc so it stops draining the broadcast.
        for i in 0..16 {
            fanout.publish(&message("u1", &format!("a{i}")));
        }

        let mut saw_error = false;
        while let Ok(Some(event)) = timeout(Duration::from_secs(1), sub.events.recv()).await {
            if let Err(err) = event {
                assert!(matches!(err, ChatError::Subscription(_)));
                saw_error = true;
            }
        }
        assert!(saw_error);
    }

    #[tokio::test]
    async fn teardown_stops_forwarder() {
        let fanout = InsertFanout::new(16);
        let mut sub = fanout.subscribe(&SessionId::new("u1"));
        tokio::task::yield_now().await;
        assert_eq!(fanout.subscriber_count(), 1);

        sub.teardown.cancel();
        let closed = timeout(Duration::from_secs(1), sub.events.recv()).await.unwrap();
        assert!(closed.is_none());
        assert_eq!(fanout.subscriber_count(), 0);
    }
}
