//! Auth handlers — register and login.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use tracing::info;
use validator::Validate;

use chathub_core::error::AppError;
use chathub_entity::user::CreateUser;

use crate::dto::request::{LoginRequest, RegisterRequest};
use crate::dto::response::{ApiResponse, AuthResponse};
use crate::error::ApiError;
use crate::state::AppState;

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AuthResponse>>), ApiError> {
    req.validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let min_len = state.config.auth.min_password_length;
    if req.password.chars().count() < min_len {
        return Err(AppError::validation(format!(
            "Password must be at least {min_len} characters"
        ))
        .into());
    }

    let password_hash = state.password_hasher.hash_password(&req.password)?;
    let user = state
        .user_repo
        .create(&CreateUser {
            username: req.username,
            password_hash,
        })
        .await?;

    let (token, expires_at) = state.jwt_encoder.generate_token(user.id, &user.username)?;

    info!(user_id = %user.id, username = %user.username, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(AuthResponse {
            token,
            expires_at,
            user: user.into(),
        })),
    ))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<ApiResponse<AuthResponse>>, ApiError> {
    req.validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let user = state
        .user_repo
        .find_by_username(&req.username)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    let valid = state
        .password_hasher
        .verify_password(&req.password, &user.password_hash)?;
    if !valid {
        return Err(AppError::unauthorized("Invalid credentials").into());
    }

    let (token, expires_at) = state.jwt_encoder.generate_token(user.id, &user.username)?;

    info!(user_id = %user.id, username = %user.username, "User logged in");

    Ok(Json(ApiResponse::ok(AuthResponse {
        token,
        expires_at,
        user: user.into(),
    })))
}
