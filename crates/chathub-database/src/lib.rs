//! # chathub-database
//!
//! PostgreSQL connection management and concrete repository implementations
//! for ChatHub users and messages. This crate is the durable persistence
//! service the real-time relay delegates to.

pub mod connection;
pub mod migration;
pub mod repositories;

pub use connection::DatabasePool;
