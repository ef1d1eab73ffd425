use thiserror::Error;

/// User-facing failure taxonomy of the chat engine.
///
/// Every variant is reported once as a notification; none is retried
/// automatically.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    #[error("sign in required")]
    AuthRequired,

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("persist failed: {0}")]
    Persist(String),

    #[error("subscription failed: {0}")]
    Subscription(String),

    #[error("completion failed: {0}")]
    Completion(String),

    #[error("request cancelled")]
    Cancelled,
}

/// Errors from backend persistence operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Errors from the remote completion endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompletionError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("endpoint returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("generation failed: {0}")]
    Generation(String),

    #[error("reply could not be saved: {0}")]
    Persist(String),

    #[error("cancelled")]
    Cancelled,
}

impl From<RepositoryError> for ChatError {
    fn from(err: RepositoryError) -> Self {
        ChatError::Persist(err.to_string())
    }
}

impl From<CompletionError> for ChatError {
    fn from(err: CompletionError) -> Self {
        match err {
            CompletionError::Cancelled => ChatError::Cancelled,
            other => ChatError::Completion(other.to_string()),
        }
    }
}

impl From<RepositoryError> for CompletionError {
    fn from(err: RepositoryError) -> Self {
        CompletionError::Persist(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_display() {
        let err = RepositoryError::Query("syntax error".to_string());
        assert_eq!(err.to_string(), "query error: syntax error");
    }

    #[test]
    fn test_repository_error_becomes_persist_failure() {
        let err: ChatError = RepositoryError::NotFound.into();
        assert_eq!(err, ChatError::Persist("entity not found".to_string()));
    }

    #[test]
    fn test_completion_cancel_maps_to_cancelled() {
        let err: ChatError = CompletionError::Cancelled.into();
        assert_eq!(err, ChatError::Cancelled);

        let err: ChatError = CompletionError::Status {
            status: 500,
            message: "boom".to_string(),
        }
        .into();
        assert_eq!(
            err,
            ChatError::Completion("endpoint returned 500: boom".to_string())
        );
    }
}
