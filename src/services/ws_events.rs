//! Helpers that serialize protocol messages and push them onto audience
//! hubs or individual participant sockets.

use axum::extract::ws::Message;
use tokio::sync::mpsc;
use tracing::warn;
use uuid::Uuid;

use crate::{dto::ws::{ServerMessage, WsPayload}, state::SharedState};

/// Broadcast a message to every participant socket of a game.
pub fn broadcast_participants(state: &SharedState, game_id: Uuid, message: &ServerMessage) {
    match WsPayload::json(message) {
        Ok(payload) => state.audiences().channels(game_id).participants.broadcast(payload),
        Err(err) => warn!(%game_id, error = %err, "failed to serialize participant broadcast"),
    }
}

/// Broadcast a message to the display group of a game.
pub fn broadcast_display(state: &SharedState, game_id: Uuid, message: &ServerMessage) {
    match WsPayload::json(message) {
        Ok(payload) => state.audiences().channels(game_id).display.broadcast(payload),
        Err(err) => warn!(%game_id, error = %err, "failed to serialize display broadcast"),
    }
}

/// Broadcast a message to the admin group of a game.
pub fn broadcast_admin(state: &SharedState, game_id: Uuid, message: &ServerMessage) {
    match WsPayload::json(message) {
        Ok(payload) => state.audiences().channels(game_id).admin.broadcast(payload),
        Err(err) => warn!(%game_id, error = %err, "failed to serialize admin broadcast"),
    }
}

/// Broadcast the same message to all three audience groups.
pub fn broadcast_all_groups(state: &SharedState, game_id: Uuid, message: &ServerMessage) {
    broadcast_participants(state, game_id, message);
    broadcast_display(state, game_id, message);
    broadcast_admin(state, game_id, message);
}

/// Serialize a message and push it onto one socket's writer channel.
///
/// Serialization failures are logged and dropped (a bug, not a transient
/// condition); a closed writer simply means the socket is gone and the
/// message is moot.
pub fn send_to_connection(
    tx: &mpsc::UnboundedSender<Message>,
    message: &ServerMessage,
    context: &str,
) {
    let payload = match WsPayload::json(message) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(context, error = %err, "failed to serialize direct message");
            return;
        }
    };

    let _ = tx.send(Message::Text(payload.data.into()));
}
