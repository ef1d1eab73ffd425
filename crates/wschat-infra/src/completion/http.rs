//! HTTP completion endpoint client.
//!
//! POSTs `{"message": ..., "userId": ...}` to the configured URL. The
//! endpoint replies only with a status; the assistant's message itself
//! arrives through the change feed.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use wschat_core::completion::CompletionClient;
use wschat_types::completion::CompletionRequest;
use wschat_types::error::CompletionError;

pub struct HttpCompletionClient {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpCompletionClient {
    /// Build a client for `endpoint`. Without `timeout` a call may wait
    /// indefinitely; the caller's cancellation token still ends it.
    pub fn new(endpoint: impl Into<String>, timeout: Option<Duration>) -> Result<Self, CompletionError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| CompletionError::Transport(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post(&self, request: &CompletionRequest) -> Result<(), CompletionError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| CompletionError::Transport(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CompletionError::Status {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }
}

impl CompletionClient for HttpCompletionClient {
    async fn complete(
        &self,
        request: &CompletionRequest,
        cancel: CancellationToken,
    ) -> Result<(), CompletionError> {
        tracing::debug!(endpoint = %self.endpoint, user_id = %request.user_id, "Posting completion request");
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(CompletionError::Cancelled),
            result = self.post(request) => result,
        }
    }
}
