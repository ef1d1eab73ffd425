//! Application state wiring the backend and completion client together.
//!
//! The engine is generic over its ports; `AppState` pins them to the infra
//! implementations chosen on the command line.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use wschat_core::completion::BoxCompletionClient;
use wschat_core::reply::ReplyingCompletion;
use wschat_core::repository::{ChangeFeed, MessageRepository, Subscription};
use wschat_infra::completion::http::HttpCompletionClient;
use wschat_infra::config::{gemini_api_key, load_config, resolve_data_dir};
use wschat_infra::generator::echo::EchoGenerator;
use wschat_infra::generator::gemini::GeminiGenerator;
use wschat_infra::memory::MemoryBackend;
use wschat_infra::sqlite::backend::SqliteBackend;
use wschat_infra::sqlite::pool::{database_url, DatabasePool};
use wschat_types::chat::{ChatMessage, MessageId, NewMessage};
use wschat_types::config::ChatConfig;
use wschat_types::error::{ChatError, RepositoryError};
use wschat_types::session::SessionId;

/// Message backend selected at startup.
#[derive(Clone)]
pub enum Backend {
    Memory(MemoryBackend),
    Sqlite(Arc<SqliteBackend>),
}

impl MessageRepository for Backend {
    async fn insert(&self, message: &NewMessage) -> Result<ChatMessage, RepositoryError> {
        match self {
            Self::Memory(b) => b.insert(message).await,
            Self::Sqlite(b) => b.insert(message).await,
        }
    }

    async fn delete(&self, user_id: &SessionId, id: &MessageId) -> Result<(), RepositoryError> {
        match self {
            Self::Memory(b) => b.delete(user_id, id).await,
            Self::Sqlite(b) => b.delete(user_id, id).await,
        }
    }

    async fn list(&self, user_id: &SessionId) -> Result<Vec<ChatMessage>, RepositoryError> {
        match self {
            Self::Memory(b) => b.list(user_id).await,
            Self::Sqlite(b) => b.list(user_id).await,
        }
    }
}

impl ChangeFeed for Backend {
    async fn subscribe(&self, user_id: &SessionId) -> Result<Subscription, ChatError> {
        match self {
            Self::Memory(b) => b.subscribe(user_id).await,
            Self::Sqlite(b) => b.subscribe(user_id).await,
        }
    }
}

pub struct AppState {
    pub data_dir: PathBuf,
    pub config: ChatConfig,
    pub backend: Backend,
}

impl AppState {
    /// Load configuration and open the backend (SQLite under the data dir
    /// unless `in_memory`).
    pub async fn init(in_memory: bool) -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir).await?;

        let config = load_config(&data_dir).await;

        let backend = if in_memory {
            tracing::info!("Using in-memory backend");
            Backend::Memory(MemoryBackend::new(config.feed_capacity))
        } else {
            let url = database_url(&data_dir);
            tracing::info!(url = %url, "Opening SQLite backend");
            let pool = DatabasePool::new(&url).await?;
            Backend::Sqlite(Arc::new(SqliteBackend::new(pool, config.feed_capacity)))
        };

        Ok(Self {
            data_dir,
            config,
            backend,
        })
    }

    /// Completion client: the HTTP endpoint when one is configured, else
    /// the in-process reply service (Gemini with `GEMINI_API_KEY`, echo without).
    pub fn completion_client(
        &self,
        endpoint_override: Option<String>,
    ) -> anyhow::Result<BoxCompletionClient> {
        let settings = &self.config.completion;
        let timeout = settings.timeout_secs.map(Duration::from_secs);

        if let Some(endpoint) = endpoint_override.or_else(|| settings.endpoint.clone()) {
            tracing::info!(endpoint = %endpoint, "Using HTTP completion endpoint");
            return Ok(BoxCompletionClient::new(HttpCompletionClient::new(
                endpoint, timeout,
            )?));
        }

        let client = match gemini_api_key() {
            Some(key) => {
                tracing::info!(model = %settings.model, "Using Gemini reply generator");
                let generator = GeminiGenerator::new(key, settings.model.clone(), timeout)?;
                BoxCompletionClient::new(ReplyingCompletion::new(
                    self.backend.clone(),
                    generator,
                    settings.preamble.clone(),
                ))
            }
            None => {
                tracing::warn!("GEMINI_API_KEY not set, replies will echo your messages");
                BoxCompletionClient::new(ReplyingCompletion::new(
                    self.backend.clone(),
                    EchoGenerator,
                    settings.preamble.clone(),
                ))
            }
        };
        Ok(client)
    }
}
