//! Typing indicators and their expiry sweep.

pub mod sweeper;
pub mod tracker;

pub use tracker::TypingTracker;
