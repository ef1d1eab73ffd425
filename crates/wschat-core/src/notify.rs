//! Broadcast bus for user-visible notifications.
//!
//! Built on `tokio::sync::broadcast`: any number of renderers may listen.
//! Publishing with no active subscribers is a no-op.

use tokio::sync::broadcast;
use wschat_types::notification::ChatNotification;

/// Multi-consumer notification bus. Cloning shares the channel.
#[derive(Clone)]
pub struct NotificationBus {
    sender: broadcast::Sender<ChatNotification>,
}

impl NotificationBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Create a subscriber that receives all future notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<ChatNotification> {
        self.sender.subscribe()
    }

    pub fn publish(&self, notification: ChatNotification) {
        let _ = self.sender.send(notification);
    }
}

impl std::fmt::Debug for NotificationBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationBus")
            .field("receiver_count", &self.sender.receiver_count())
            .finish()
    }
}
