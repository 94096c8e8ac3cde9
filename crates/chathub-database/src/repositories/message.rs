//! Message repository implementation.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use chathub_core::error::{AppError, ErrorKind};
use chathub_core::result::AppResult;
use chathub_entity::message::Message;

/// Repository for chat message storage and history queries.
#[derive(Debug, Clone)]
pub struct MessageRepository {
    pool: PgPool,
}

impl MessageRepository {
    /// Create a new message repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Store a new message, letting the database assign the canonical id.
    pub async fn create(
        &self,
        sender: Uuid,
        recipient: Uuid,
        text: &str,
        timestamp: DateTime<Utc>,
    ) -> AppResult<Message> {
        sqlx::query_as::<_, Message>(
            "INSERT INTO messages (sender, recipient, text, timestamp) \
             VALUES ($1, $2, $3, $4) \
             RETURNING *",
        )
        .bind(sender)
        .bind(recipient)
        .bind(text)
        .bind(timestamp)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to store message", e))
    }

    /// Load the full conversation between two users, in both directions,
    /// ascending by timestamp.
    pub async fn find_conversation(&self, a: Uuid, b: Uuid) -> AppResult<Vec<Message>> {
        sqlx::query_as::<_, Message>(
            "SELECT * FROM messages \
             WHERE (sender = $1 AND recipient = $2) OR (sender = $2 AND recipient = $1) \
             ORDER BY timestamp ASC",
        )
        .bind(a)
        .bind(b)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to load conversation", e)
        })
    }
}
