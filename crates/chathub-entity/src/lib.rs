//! # chathub-entity
//!
//! Domain models shared across the ChatHub crates: registered users and
//! persisted chat messages.

pub mod message;
pub mod user;

pub use message::Message;
pub use user::User;
