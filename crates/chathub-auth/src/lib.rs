//! # chathub-auth
//!
//! Credential handling for ChatHub: Argon2id password hashing and HS256
//! JWT access tokens.

pub mod jwt;
pub mod password;

pub use jwt::{Claims, JwtDecoder, JwtEncoder};
pub use password::PasswordHasher;
