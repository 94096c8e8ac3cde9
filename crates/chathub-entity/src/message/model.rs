//! Chat message entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A persisted one-to-one chat message.
///
/// Messages are immutable once stored. The canonical `id` is assigned by the
/// persistence layer before the message is ever broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Message {
    /// Canonical message identifier.
    pub id: Uuid,
    /// Sending user.
    pub sender: Uuid,
    /// Receiving user.
    pub recipient: Uuid,
    /// Message body.
    pub text: String,
    /// Creation timestamp.
    pub timestamp: DateTime<Utc>,
}
