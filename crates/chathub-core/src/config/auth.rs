//! Authentication configuration.

use serde::{Deserialize, Serialize};

/// JWT and password policy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret used to sign access tokens.
    pub jwt_secret: String,
    /// Access token time-to-live in minutes.
    #[serde(default = "default_token_ttl")]
    pub jwt_ttl_minutes: u64,
    /// Minimum password length accepted at registration.
    #[serde(default = "default_min_password")]
    pub min_password_length: usize,
}

fn default_token_ttl() -> u64 {
    60
}

fn default_min_password() -> usize {
    6
}
