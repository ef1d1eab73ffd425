//! Request lifecycle: "send message, then await the AI reply".
//!
//! Owns the typing flag and the single authoritative in-flight request.
//! Every reply request gets a [`RequestTicket`] carrying a monotonically
//! increasing generation and its own cancellation token. Only the ticket
//! whose generation matches the stored current one may clear the typing
//! flag; outcomes of superseded or cancelled tickets are ignored.
//!
//! Phases: `Idle -> Sending -> AwaitingReply -> Idle`. Success, failure,
//! and cancel all return to `Idle`.

use tokio_util::sync::CancellationToken;
use tracing::debug;
use wschat_types::error::{ChatError, CompletionError};
use wschat_types::session::SessionId;

/// Externally visible phase of the request cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestPhase {
    #[default]
    Idle,
    /// The user's message is being persisted.
    Sending,
    /// A completion request is outstanding and the typing flag is set.
    AwaitingReply,
}

/// Handle of one outstanding completion call.
#[derive(Debug, Clone)]
pub struct RequestTicket {
    pub generation: u64,
    pub cancellation: CancellationToken,
}

/// What a completion outcome did to the lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    /// The ticket was current: typing cleared, back to `Idle`.
    Current(Result<(), CompletionError>),
    /// The ticket was superseded or cancelled; nothing changed.
    Stale,
}

#[derive(Debug, Default)]
pub struct RequestLifecycle {
    /// User messages whose persist call has not returned yet.
    sending: usize,
    current: Option<RequestTicket>,
    last_generation: u64,
}

impl RequestLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check a send is allowed and return the trimmed text to persist.
    pub fn validate(text: &str, session: Option<&SessionId>) -> Result<String, ChatError> {
        if session.is_none_or(SessionId::is_blank) {
            return Err(ChatError::AuthRequired);
        }
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ChatError::Validation("message is empty".to_string()));
        }
        Ok(trimmed.to_string())
    }

    pub fn phase(&self) -> RequestPhase {
        if self.current.is_some() {
            RequestPhase::AwaitingReply
        } else if self.sending > 0 {
            RequestPhase::Sending
        } else {
            RequestPhase::Idle
        }
    }

    /// True while a current completion request is outstanding.
    pub fn is_typing(&self) -> bool {
        self.current.is_some()
    }

    pub fn current_generation(&self) -> Option<u64> {
        self.current.as_ref().map(|t| t.generation)
    }

    /// A persist call for a validated message has been issued.
    pub fn begin_send(&mut self) {
        self.sending += 1;
    }

    /// The persist call failed; no reply will be requested for it.
    pub fn persist_failed(&mut self) {
        self.sending = self.sending.saturating_sub(1);
    }

    /// The persist call succeeded: allocate a new current ticket and set the
    /// typing flag. Any previous ticket loses its authority.
    pub fn persist_succeeded(&mut self) -> RequestTicket {
        self.sending = self.sending.saturating_sub(1);
        self.last_generation += 1;
        let ticket = RequestTicket {
            generation: self.last_generation,
            cancellation: CancellationToken::new(),
        };
        if let Some(previous) = self.current.replace(ticket.clone()) {
            debug!(
                superseded = previous.generation,
                current = ticket.generation,
                "Reply request superseded"
            );
        }
        ticket
    }

    /// Apply the outcome of the completion call issued under `generation`.
    pub fn settle(
        &mut self,
        generation: u64,
        outcome: Result<(), CompletionError>,
    ) -> Settlement {
        if self.current_generation() != Some(generation) {
            debug!(generation, ?outcome, "Ignoring stale completion outcome");
            return Settlement::Stale;
        }
        self.current = None;
        Settlement::Current(outcome)
    }

    /// Cancel the current request, if any.
    ///
    /// Signals the ticket's cancellation token, clears the typing flag, and
    /// invalidates the ticket. Returns `false` when nothing was in flight.
    pub fn cancel(&mut self) -> bool {
        match self.current.take() {
            Some(ticket) => {
                ticket.cancellation.cancel();
                debug!(generation = ticket.generation, "Reply request cancelled");
                true
            }
            None => false,
        }
    }
}
