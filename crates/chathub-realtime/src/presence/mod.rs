//! Presence tracking.

pub mod store;

pub use store::PresenceStore;
