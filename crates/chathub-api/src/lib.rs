//! HTTP and WebSocket API layer for ChatHub.
//!
//! Exposes the REST surface under `/api` and the realtime WebSocket
//! endpoint at `/ws`. Handlers are thin: they validate input, call into
//! the auth/database/realtime crates, and shape responses.

pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod router;
pub mod state;

pub use error::ApiError;
pub use router::build_router;
pub use state::AppState;
