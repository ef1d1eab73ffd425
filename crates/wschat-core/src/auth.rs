//! Session provider port.
//!
//! The engine only needs "the current session id, or none" and a way to
//! notice when that changes (sign-out, a different user signing in).

use tokio::sync::watch;
use wschat_types::session::SessionId;

/// Source of the authenticated session.
pub trait SessionProvider: Send + Sync {
    /// The signed-in user's id, or `None` when no one is signed in.
    fn current_session(&self) -> Option<SessionId>;

    /// Receiver that observes every sign-in and sign-out.
    fn session_changes(&self) -> watch::Receiver<Option<SessionId>>;
}

/// In-process session holder backed by a `watch` channel.
///
/// Cloning shares the same slot.
#[derive(Debug, Clone)]
pub struct SessionSlot {
    sender: watch::Sender<Option<SessionId>>,
}

impl SessionSlot {
    pub fn signed_out() -> Self {
        let (sender, _) = watch::channel(None);
        Self { sender }
    }

    pub fn signed_in(user_id: SessionId) -> Self {
        let (sender, _) = watch::channel(Some(user_id));
        Self { sender }
    }

    pub fn sign_in(&self, user_id: SessionId) {
        self.sender.send_replace(Some(user_id));
    }

    pub fn sign_out(&self) {
        self.sender.send_replace(None);
    }
}

impl SessionProvider for SessionSlot {
    fn current_session(&self) -> Option<SessionId> {
        self.sender.borrow().clone()
    }

    fn session_changes(&self) -> watch::Receiver<Option<SessionId>> {
        self.sender.subscribe()
    }
}
