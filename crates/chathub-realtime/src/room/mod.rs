//! Mailbox rooms and membership routing.

pub mod registry;

pub use registry::RoomRouter;

use uuid::Uuid;

/// Returns the mailbox room name for a user.
///
/// Events addressed "to a user" are emitted into this room, which decouples
/// routing from how many connections that user currently has.
pub fn mailbox(user_id: Uuid) -> String {
    format!("user_{user_id}")
}
