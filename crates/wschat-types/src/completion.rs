//! Completion endpoint request body.

use serde::{Deserialize, Serialize};

use crate::session::SessionId;

/// Body sent to the completion endpoint.
///
/// A successful call means the backend will persist an assistant reply for
/// `user_id`; the reply itself is observed later through the change feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRequest {
    pub message: String,
    pub user_id: SessionId,
}

impl CompletionRequest {
    pub fn new(message: impl Into<String>, user_id: SessionId) -> Self {
        Self {
            message: message.into(),
            user_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_field_names() {
        let req = CompletionRequest::new("hi", SessionId::new("u1"));
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json, serde_json::json!({ "message": "hi", "userId": "u1" }));
    }
}
