//! Reply service: the backend half of the completion endpoint.
//!
//! Builds the prompt, asks a [`ReplyGenerator`] for the assistant's answer,
//! and persists it as an `assistant` message for the requesting user. The
//! client never receives the reply text from this call; the persisted row
//! reaches it through the change feed like every other message.

use std::future::Future;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use wschat_types::chat::NewMessage;
use wschat_types::completion::CompletionRequest;
use wschat_types::error::CompletionError;

use crate::completion::CompletionClient;
use crate::repository::MessageRepository;

/// Text generator behind the completion endpoint (e.g., a hosted LLM).
pub trait ReplyGenerator: Send + Sync {
    /// Human-readable generator name for logs.
    fn name(&self) -> &str;

    fn generate(
        &self,
        prompt: &str,
    ) -> impl Future<Output = Result<String, CompletionError>> + Send;
}

/// Prompt sent to the generator: instructions, then the user's turn.
pub fn build_prompt(preamble: &str, message: &str) -> String {
    format!("{preamble}\nUser: {message}")
}

/// [`CompletionClient`] that generates a reply in-process and stores it.
pub struct ReplyingCompletion<R, G> {
    repo: R,
    generator: G,
    preamble: String,
}

impl<R: MessageRepository, G: ReplyGenerator> ReplyingCompletion<R, G> {
    pub fn new(repo: R, generator: G, preamble: impl Into<String>) -> Self {
        Self {
            repo,
            generator,
            preamble: preamble.into(),
        }
    }
}

impl<R: MessageRepository, G: ReplyGenerator> CompletionClient for ReplyingCompletion<R, G> {
    async fn complete(
        &self,
        request: &CompletionRequest,
        cancel: CancellationToken,
    ) -> Result<(), CompletionError> {
        if request.message.trim().is_empty() || request.user_id.is_blank() {
            return Err(CompletionError::Rejected(
                "message and user id are required".to_string(),
            ));
        }

        let prompt = build_prompt(&self.preamble, &request.message);
        debug!(generator = self.generator.name(), user_id = %request.user_id, "Generating reply");

        let reply = tokio::select! {
            _ = cancel.cancelled() => return Err(CompletionError::Cancelled),
            reply = self.generator.generate(&prompt) => reply?,
        };

        let saved = self
            .repo
            .insert(&NewMessage::assistant(request.user_id.clone(), reply))
            .await?;
        info!(user_id = %request.user_id, message_id = %saved.id, "Assistant reply saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockBackend;
    use wschat_types::chat::MessageRole;
    use wschat_types::session::SessionId;

    struct FixedGenerator(Result<String, CompletionError>);

    impl ReplyGenerator for FixedGenerator {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn generate(&self, prompt: &str) -> Result<String, CompletionError> {
            assert!(prompt.ends_with("User: hi"));
            self.0.clone()
        }
    }

    struct StalledGenerator;

    impl ReplyGenerator for StalledGenerator {
        fn name(&self) -> &str {
            "stalled"
        }

        async fn generate(&self, _prompt: &str) -> Result<String, CompletionError> {
            std::future::pending().await
        }
    }

    fn request(message: &str) -> CompletionRequest {
        CompletionRequest::new(message, SessionId::new("u1"))
    }

    #[test]
    fn test_build_prompt() {
        assert_eq!(build_prompt("Be nice.", "hi"), "Be nice.\nUser: hi");
    }

    #[tokio::test]
    async fn test_reply_is_persisted_as_assistant() {
        let backend = MockBackend::new();
        let service = ReplyingCompletion::new(
            backend.clone(),
            FixedGenerator(Ok("hello!".to_string())),
            "Be nice.",
        );

        service
            .complete(&request("hi"), CancellationToken::new())
            .await
            .unwrap();

        let rows = backend.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].role, MessageRole::Assistant);
        assert_eq!(rows[0].content, "hello!");
        assert_eq!(rows[0].user_id, SessionId::new("u1"));
    }

    #[tokio::test]
    async fn test_generator_failure_persists_nothing() {
        let backend = MockBackend::new();
        let service = ReplyingCompletion::new(
            backend.clone(),
            FixedGenerator(Err(CompletionError::Generation("quota".to_string()))),
            "Be nice.",
        );

        let err = service
            .complete(&request("hi"), CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err, CompletionError::Generation("quota".to_string()));
        assert_eq!(backend.row_count(), 0);
    }

    #[tokio::test]
    async fn test_blank_request_is_rejected() {
        let backend = MockBackend::new();
        let service = ReplyingCompletion::new(backend, StalledGenerator, "Be nice.");

        let err = service
            .complete(&request("  "), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_cancel_stops_generation() {
        let backend = MockBackend::new();
        let service = ReplyingCompletion::new(backend.clone(), StalledGenerator, "Be nice.");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = service.complete(&request("hi"), cancel).await.unwrap_err();
        assert_eq!(err, CompletionError::Cancelled);
        assert_eq!(backend.row_count(), 0);
    }
}
