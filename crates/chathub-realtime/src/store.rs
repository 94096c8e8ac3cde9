//! Persistence seam between the relay and durable storage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use chathub_core::result::AppResult;
use chathub_database::repositories::{MessageRepository, UserRepository};
use chathub_entity::message::Message;

/// The persistence operations the relay depends on.
///
/// The relay is injected with a `ChatStore` rather than reaching for the
/// database directly; tests supply an in-memory double. The store-before-
/// broadcast ordering contract lives in the relay, not here.
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Durably store a chat message, assigning its canonical id.
    async fn store_message(
        &self,
        sender: Uuid,
        recipient: Uuid,
        text: &str,
        timestamp: DateTime<Utc>,
    ) -> AppResult<Message>;

    /// Update a user's derived presence fields.
    async fn set_user_presence(
        &self,
        user_id: Uuid,
        online: bool,
        last_seen: Option<DateTime<Utc>>,
    ) -> AppResult<()>;
}

/// PostgreSQL-backed [`ChatStore`] over the repository layer.
#[derive(Debug, Clone)]
pub struct PgChatStore {
    users: UserRepository,
    messages: MessageRepository,
}

impl PgChatStore {
    /// Creates a store over a shared connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            messages: MessageRepository::new(pool),
        }
    }
}

#[async_trait]
impl ChatStore for PgChatStore {
    async fn store_message(
        &self,
        sender: Uuid,
        recipient: Uuid,
        text: &str,
        timestamp: DateTime<Utc>,
    ) -> AppResult<Message> {
        self.messages.create(sender, recipient, text, timestamp).await
    }

    async fn set_user_presence(
        &self,
        user_id: Uuid,
        online: bool,
        last_seen: Option<DateTime<Utc>>,
    ) -> AppResult<()> {
        self.users.set_presence(user_id, online, last_seen).await
    }
}
