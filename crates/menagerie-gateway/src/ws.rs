//! WebSocket endpoint for live world subscriptions.
//!
//! Clients connect to `GET /ws/{user_id}` after authenticating with the
//! credential service. The connection registers with the broadcast hub
//! and from then on receives every world event as a JSON text frame.
//! Inbound traffic is limited to two message types: cursor updates and
//! an explicit flush request (sent before a voluntary disconnect so
//! debounced state is not lost).
//!
//! Connect marks the user online and disconnect marks them offline;
//! both transitions flush pending persistence so presence survives a
//! crash window.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use menagerie_types::{ClientMessage, UserId};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::state::AppState;

/// Upgrade an HTTP request to a WebSocket connection and begin
/// streaming world events.
///
/// # Route
///
/// `GET /ws/{user_id}`
pub async fn ws_connect(
    ws: WebSocketUpgrade,
    Path(user_id): Path<Uuid>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let user_id = UserId::from(user_id);
    ws.on_upgrade(move |socket| handle_ws(socket, state, user_id))
}

/// Handle the WebSocket lifecycle: register with the hub, pump
/// outbound frames, and serve inbound client messages until the
/// connection ends.
async fn handle_ws(mut socket: WebSocket, state: AppState, user_id: UserId) {
    let (connection_id, mut outbound) = state.hub.register(user_id).await;
    let _ = state.game.set_online(user_id, true).await;
    state.persist.flush().await;
    debug!(%connection_id, %user_id, "WebSocket client connected");

    loop {
        tokio::select! {
            // A frame fanned out by the hub.
            frame = outbound.recv() => {
                match frame {
                    Some(text) => {
                        if socket.send(Message::Text(text.into())).await.is_err() {
                            debug!(%connection_id, "WebSocket client disconnected (send failed)");
                            break;
                        }
                    }
                    // The hub pruned this connection.
                    None => break,
                }
            }
            // Inbound traffic from the client.
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        handle_client_message(&state, user_id, text.as_str()).await;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(%connection_id, "WebSocket client disconnected");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!(%connection_id, "WebSocket client disconnected (pong failed)");
                            break;
                        }
                    }
                    Some(Err(err)) => {
                        debug!(%connection_id, error = %err, "WebSocket error");
                        break;
                    }
                    _ => {
                        // Ignore binary and pong frames.
                    }
                }
            }
        }
    }

    state.hub.unregister(connection_id, user_id).await;
    let _ = state.game.set_online(user_id, false).await;
    // Disconnect flush: do not lose the last seconds of debounced state.
    state.persist.flush().await;
}

/// Dispatch one inbound client message.
async fn handle_client_message(state: &AppState, user_id: UserId, text: &str) {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::CursorUpdate { x, y }) => {
            let _ = state.game.update_cursor(user_id, x, y).await;
        }
        Ok(ClientMessage::Flush) => {
            state.persist.flush().await;
        }
        Err(err) => {
            warn!(%user_id, error = %err, "Unparseable client message");
        }
    }
}
