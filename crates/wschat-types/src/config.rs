//! Configuration types for wschat.
//!
//! `ChatConfig` represents the `config.toml` in the data directory. All
//! fields have defaults, so an empty file (or no file) is valid.

use serde::{Deserialize, Serialize};

/// Top-level client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Buffered feed events per subscription before the subscriber counts as lagged.
    #[serde(default = "default_feed_capacity")]
    pub feed_capacity: usize,

    /// Characters of an assistant reply shown in its notification.
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,

    #[serde(default)]
    pub completion: CompletionConfig,
}

fn default_feed_capacity() -> usize {
    256
}

fn default_preview_chars() -> usize {
    60
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            feed_capacity: default_feed_capacity(),
            preview_chars: default_preview_chars(),
            completion: CompletionConfig::default(),
        }
    }
}

/// Settings for the completion endpoint and the reply generator behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Remote completion endpoint. `None` runs the reply service in-process.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Generator model name.
    #[serde(default = "default_model")]
    pub model: String,

    /// Optional request timeout. Unset means the call may wait indefinitely
    /// (the user can still cancel).
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Instruction text placed ahead of the user's message in the prompt.
    #[serde(default = "default_preamble")]
    pub preamble: String,
}

fn default_model() -> String {
    "gemini-3-flash-preview".to_string()
}

fn default_preamble() -> String {
    "You are a helpful and friendly AI assistant. Respond clearly and concisely.".to_string()
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            model: default_model(),
            timeout_secs: None,
            preamble: default_preamble(),
        }
    }
}
