//! # chathub-realtime
//!
//! Real-time relay engine for ChatHub. Provides:
//!
//! - Connection lifecycle management (register, event dispatch, disconnect)
//! - Mailbox-room fan-out routing (`user_<id>` rooms)
//! - Presence tracking with per-user connection refcounting
//! - Typing indicators with background expiry sweep
//! - Persist-then-broadcast message pipeline over a pluggable store

pub mod connection;
pub mod events;
pub mod presence;
pub mod relay;
pub mod room;
pub mod store;
pub mod typing;

pub use connection::handle::{ConnectionHandle, ConnectionId};
pub use events::{ClientEvent, ServerEvent};
pub use relay::ChatRelay;
pub use store::{ChatStore, PgChatStore};
pub use typing::sweeper::run_typing_sweep;
