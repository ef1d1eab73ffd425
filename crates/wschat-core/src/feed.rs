//! Change-feed subscriber.
//!
//! Owns one backend [`Subscription`] for one user and forwards only that
//! user's inserts. It never synthesizes events and never resumes after a
//! drop: once the underlying subscription fails, one error is returned and
//! the subscriber is closed. Closing is idempotent and also runs on drop.

use tracing::{debug, info, warn};
use wschat_types::chat::ChatMessage;
use wschat_types::error::ChatError;
use wschat_types::session::SessionId;

use crate::repository::{ChangeFeed, Subscription};

#[derive(Debug)]
pub struct ChangeFeedSubscriber {
    user_id: SessionId,
    subscription: Option<Subscription>,
}

impl ChangeFeedSubscriber {
    /// Establish the session-scoped subscription.
    pub async fn open<F: ChangeFeed>(feed: &F, user_id: &SessionId) -> Result<Self, ChatError> {
        let subscription = feed.subscribe(user_id).await?;
        info!(user_id = %user_id, "Change feed subscribed");
        Ok(Self {
            user_id: user_id.clone(),
            subscription: Some(subscription),
        })
    }

    pub fn user_id(&self) -> &SessionId {
        &self.user_id
    }

    pub fn is_open(&self) -> bool {
        self.subscription.is_some()
    }

    /// Wait for the next insert belonging to this session.
    ///
    /// Returns `None` once closed. A dropped subscription yields a single
    /// `Err(ChatError::Subscription)` and closes the subscriber. Cancel safe.
    pub async fn next(&mut self) -> Option<Result<ChatMessage, ChatError>> {
        loop {
            let subscription = self.subscription.as_mut()?;
            let err = match subscription.events.recv().await {
                Some(Ok(event)) => {
                    let message = event.into_message();
                    if message.user_id != self.user_id {
                        warn!(
                            user_id = %self.user_id,
                            foreign_user_id = %message.user_id,
                            message_id = %message.id,
                            "Dropping feed insert for another session"
                        );
                        continue;
                    }
                    debug!(message_id = %message.id, role = %message.role, "Feed insert");
                    return Some(Ok(message));
                }
                Some(Err(err)) => err,
                None => ChatError::Subscription("feed closed by backend".to_string()),
            };
            warn!(user_id = %self.user_id, error = %err, "Change feed lost");
            self.close();
            return Some(Err(err));
        }
    }

    /// Unsubscribe. No event is delivered after this returns.
    pub fn close(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.teardown.cancel();
            subscription.events.close();
            info!(user_id = %self.user_id, "Change feed closed");
        }
    }
}

impl Drop for ChangeFeedSubscriber {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{message, message_for, MockBackend};
    use wschat_types::chat::MessageRole;

    #[tokio::test]
    async fn test_forwards_inserts_in_order() {
        let backend = MockBackend::new();
        let mut sub = ChangeFeedSubscriber::open(&backend, &SessionId::new("u1"))
            .await
            .unwrap();

        backend.publish(message("m1", MessageRole::User, "hi"));
        backend.publish(message("m2", MessageRole::Assistant, "hello"));

        assert_eq!(sub.next().await.unwrap().unwrap().id.as_str(), "m1");
        assert_eq!(sub.next().await.unwrap().unwrap().id.as_str(), "m2");
    }

    #[tokio::test]
    async fn test_foreign_session_inserts_are_dropped() {
        let backend = MockBackend::new();
        let mut sub = ChangeFeedSubscriber::open(&backend, &SessionId::new("u1"))
            .await
            .unwrap();

        backend.publish(message_for("u2", "x1", MessageRole::User, "not yours"));
        backend.publish(message("m1", MessageRole::User, "mine"));

        let next = sub.next().await.unwrap().unwrap();
        assert_eq!(next.id.as_str(), "m1");
    }

    #[tokio::test]
    async fn test_subscribe_failure_is_reported() {
        let backend = MockBackend::new();
        backend.fail_subscribe(true);

        let err = ChangeFeedSubscriber::open(&backend, &SessionId::new("u1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Subscription(_)));
    }

    #[tokio::test]
    async fn test_drop_yields_one_error_then_nothing() {
        let backend = MockBackend::new();
        let mut sub = ChangeFeedSubscriber::open(&backend, &SessionId::new("u1"))
            .await
            .unwrap();

        backend.break_feeds();

        assert!(matches!(sub.next().await, Some(Err(ChatError::Subscription(_)))));
        assert!(!sub.is_open());
        assert!(sub.next().await.is_none());
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_stops_delivery() {
        let backend = MockBackend::new();
        let mut sub = ChangeFeedSubscriber::open(&backend, &SessionId::new("u1"))
            .await
            .unwrap();
        assert_eq!(backend.live_subscriptions(), 1);

        sub.close();
        sub.close();
        backend.publish(message("m1", MessageRole::User, "late"));

        assert!(sub.next().await.is_none());
        assert_eq!(backend.live_subscriptions(), 0);
    }

    #[tokio::test]
    async fn test_drop_unsubscribes() {
        let backend = MockBackend::new();
        let sub = ChangeFeedSubscriber::open(&backend, &SessionId::new("u1"))
            .await
            .unwrap();
        drop(sub);
        assert_eq!(backend.live_subscriptions(), 0);
    }
}
