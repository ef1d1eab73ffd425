//! Configuration loader for wschat.
//!
//! Reads `config.toml` from the data directory (`~/.wschat/` unless
//! `WSCHAT_DATA_DIR` is set) and deserializes it into [`ChatConfig`]. Falls
//! back to defaults when the file is missing or malformed.

use std::path::{Path, PathBuf};

use secrecy::SecretString;
use wschat_types::config::ChatConfig;

pub const DATA_DIR_ENV: &str = "WSCHAT_DATA_DIR";
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Load configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`ChatConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
pub async fn load_config(data_dir: &Path) -> ChatConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return ChatConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return ChatConfig::default();
        }
    };

    match toml::from_str::<ChatConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            ChatConfig::default()
        }
    }
}

/// `WSCHAT_DATA_DIR`, else `~/.wschat`, else `./.wschat`.
pub fn resolve_data_dir() -> PathBuf {
    data_dir_from(std::env::var_os(DATA_DIR_ENV).map(PathBuf::from))
}

fn data_dir_from(env_override: Option<PathBuf>) -> PathBuf {
    env_override
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".wschat")
        })
}

/// The Gemini API key from the environment, if set and non-empty.
pub fn gemini_api_key() -> Option<SecretString> {
    std::env::var(GEMINI_API_KEY_ENV)
        .ok()
        .filter(|key| !key.trim().is_empty())
        .map(SecretString::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).await;
        assert_eq!(config, ChatConfig::default());
    }

    #[tokio::test]
    async fn load_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("config.toml"),
            r#"
preview_chars = 20

[completion]
endpoint = "http://localhost:3000/api/gemini"
timeout_secs = 30
"#,
        )
        .await
        .unwrap();

        let config = load_config(tmp.path()).await;
        assert_eq!(config.preview_chars, 20);
        assert_eq!(config.feed_capacity, 256);
        assert_eq!(
            config.completion.endpoint.as_deref(),
            Some("http://localhost:3000/api/gemini")
        );
        assert_eq!(config.completion.timeout_secs, Some(30));
        assert_eq!(config.completion.model, "gemini-3-flash-preview");
    }

    #[tokio::test]
    async fn load_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("config.toml"), "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_config(tmp.path()).await;
        assert_eq!(config, ChatConfig::default());
    }

    #[test]
    fn data_dir_prefers_override() {
        let dir = data_dir_from(Some(PathBuf::from("/srv/wschat")));
        assert_eq!(dir, PathBuf::from("/srv/wschat"));
    }

    #[test]
    fn data_dir_falls_back_to_home() {
        let dir = data_dir_from(Some(PathBuf::new()));
        assert!(dir.ends_with(".wschat"));
        assert!(data_dir_from(None).ends_with(".wschat"));
    }
}
