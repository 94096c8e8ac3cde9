//! Application state shared across all handlers.

use std::sync::Arc;

use chathub_auth::jwt::decoder::JwtDecoder;
use chathub_auth::jwt::encoder::JwtEncoder;
use chathub_auth::password::hasher::PasswordHasher;
use chathub_core::config::AppConfig;
use chathub_database::connection::DatabasePool;
use chathub_database::repositories::{MessageRepository, UserRepository};
use chathub_realtime::ChatRelay;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are `Arc`-wrapped or internally pooled for cheap cloning.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// PostgreSQL connection pool
    pub db: DatabasePool,

    /// JWT token encoder
    pub jwt_encoder: Arc<JwtEncoder>,
    /// JWT token decoder and validator
    pub jwt_decoder: Arc<JwtDecoder>,
    /// Password hasher (Argon2id)
    pub password_hasher: Arc<PasswordHasher>,

    /// User repository
    pub user_repo: Arc<UserRepository>,
    /// Message repository
    pub message_repo: Arc<MessageRepository>,

    /// Realtime relay engine
    pub relay: Arc<ChatRelay>,
}

impl AppState {
    /// Wires up the shared state from its already-constructed parts.
    pub fn new(config: Arc<AppConfig>, db: DatabasePool, relay: Arc<ChatRelay>) -> Self {
        let pool = db.pool().clone();
        Self {
            jwt_encoder: Arc::new(JwtEncoder::new(&config.auth)),
            jwt_decoder: Arc::new(JwtDecoder::new(&config.auth)),
            password_hasher: Arc::new(PasswordHasher::new()),
            user_repo: Arc::new(UserRepository::new(pool.clone())),
            message_repo: Arc::new(MessageRepository::new(pool)),
            config,
            db,
            relay,
        }
    }
}
