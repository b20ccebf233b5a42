use axum::{
    Router,
    extract::{Query, State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;

use crate::{
    error::AppError,
    services::websocket_service::{self, ConnectionRole},
    state::SharedState,
};

/// Query parameters of the upgrade request.
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Audience the connection belongs to: `admin`, `display`, or
    /// `participant`.
    pub role: String,
}

#[utoipa::path(
    get,
    path = "/ws",
    tag = "realtime",
    params(("role" = String, Query, description = "Connection role: admin, display, or participant")),
    responses((status = 101, description = "Switching protocols to WebSocket"))
)]
/// Upgrade the HTTP connection into a role-scoped session socket.
pub async fn ws_handler(
    State(state): State<SharedState>,
    Query(params): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, AppError> {
    let role = ConnectionRole::parse(&params.role)
        .ok_or_else(|| AppError::BadRequest(format!("unknown role `{}`", params.role)))?;

    Ok(ws.on_upgrade(move |socket| websocket_service::handle_socket(state, socket, role)))
}

/// Configure the WebSocket endpoint.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/ws", get(ws_handler))
}
