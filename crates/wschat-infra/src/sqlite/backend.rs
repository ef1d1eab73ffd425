//! SQLite message backend.
//!
//! Implements `MessageRepository` and `ChangeFeed` from `wschat-core` with
//! raw sqlx queries against the split reader/writer pool. Each committed
//! insert is announced on an [`InsertFanout`], so subscribers in this
//! process see rows written through this backend.

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::Row;
use tokio::sync::Mutex;
use wschat_core::repository::{ChangeFeed, MessageRepository, Subscription};
use wschat_types::chat::{ChatMessage, MessageId, MessageRole, NewMessage};
use wschat_types::error::{ChatError, RepositoryError};
use wschat_types::session::SessionId;

use super::pool::DatabasePool;
use crate::fanout::InsertFanout;

pub struct SqliteBackend {
    pool: DatabasePool,
    fanout: InsertFanout,
    /// Held from INSERT to publish so feed order follows commit order.
    insert_lock: Mutex<()>,
}

impl SqliteBackend {
    pub fn new(pool: DatabasePool, feed_capacity: usize) -> Self {
        Self {
            pool,
            fanout: InsertFanout::new(feed_capacity),
            insert_lock: Mutex::new(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

struct MessageRow {
    id: String,
    user_id: String,
    role: String,
    content: String,
    created_at: String,
}

impl MessageRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            role: row.try_get("role")?,
            content: row.try_get("content")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_message(self) -> Result<ChatMessage, RepositoryError> {
        let role: MessageRole = self
            .role
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;
        Ok(ChatMessage {
            id: MessageId::from(self.id),
            user_id: SessionId::from(self.user_id),
            role,
            content: self.content,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

/// Fixed-width RFC 3339 so text ordering matches time ordering.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

// ---------------------------------------------------------------------------
// Port implementations
// ---------------------------------------------------------------------------

impl MessageRepository for SqliteBackend {
    async fn insert(&self, message: &NewMessage) -> Result<ChatMessage, RepositoryError> {
        let row = message
            .clone()
            .into_message(MessageId::generate(), Utc::now());

        let _guard = self.insert_lock.lock().await;
        sqlx::query(
            r#"INSERT INTO messages (id, user_id, role, content, created_at)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(row.id.as_str())
        .bind(row.user_id.as_str())
        .bind(row.role.to_string())
        .bind(&row.content)
        .bind(format_datetime(&row.created_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        tracing::debug!(message_id = %row.id, user_id = %row.user_id, "Message inserted");
        self.fanout.publish(&row);
        Ok(row)
    }

    async fn delete(&self, user_id: &SessionId, id: &MessageId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM messages WHERE id = ? AND user_id = ?")
            .bind(id.as_str())
            .bind(user_id.as_str())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn list(&self, user_id: &SessionId) -> Result<Vec<ChatMessage>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM messages WHERE user_id = ? ORDER BY created_at ASC, rowid ASC",
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut messages = Vec::with_capacity(rows.len());
        for row in &rows {
            let message_row =
                MessageRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
            messages.push(message_row.into_message()?);
        }
        Ok(messages)
    }
}

impl ChangeFeed for SqliteBackend {
    async fn subscribe(&self, user_id: &SessionId) -> Result<Subscription, ChatError> {
        Ok(self.fanout.subscribe(user_id))
    }
}
