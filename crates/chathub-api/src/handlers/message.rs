//! Conversation history handlers.

use axum::Json;
use axum::extract::{Query, State};

use chathub_entity::message::Message;

use crate::dto::request::ConversationQuery;
use crate::dto::response::ApiResponse;
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// GET /api/messages?userId={a}&recipientId={b}
///
/// Returns the full conversation between the two users, both directions,
/// ascending by timestamp.
pub async fn conversation(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(query): Query<ConversationQuery>,
) -> Result<Json<ApiResponse<Vec<Message>>>, ApiError> {
    let messages = state
        .message_repo
        .find_conversation(query.user_id, query.recipient_id)
        .await?;

    Ok(Json(ApiResponse::ok(messages)))
}
