//! WebSocket upgrade handler.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::state::AppState;

/// Query parameter for WebSocket authentication.
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// JWT access token.
    pub token: String,
}

/// GET /ws?token={jwt} — WebSocket upgrade
///
/// The token is validated before the upgrade completes; an invalid token
/// rejects the handshake with 401 rather than closing an opened socket.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
) -> Result<Response, ApiError> {
    let claims = state.jwt_decoder.decode_token(&query.token)?;

    info!(user_id = %claims.user_id(), "WebSocket handshake authenticated");

    Ok(ws.on_upgrade(move |socket| handle_ws_connection(state, socket)))
}

/// Drives an established WebSocket connection.
///
/// One task forwards relay events out to the socket; this task reads
/// inbound frames and feeds them to the relay. Authentication only gates
/// the upgrade; the relay still waits for an explicit `join` event before
/// the connection participates in presence.
async fn handle_ws_connection(state: AppState, socket: WebSocket) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let (handle, mut outbound_rx) = state.relay.register();
    let conn_id = handle.id;

    let outbound_task = tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            if ws_tx.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(result) = ws_rx.next().await {
        match result {
            Ok(Message::Text(text)) => {
                state.relay.handle_event(conn_id, &text).await;
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                warn!(conn_id = %conn_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    outbound_task.abort();
    state.relay.disconnect(conn_id).await;

    info!(conn_id = %conn_id, "WebSocket connection closed");
}
