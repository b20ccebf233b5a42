use axum::Router;

use crate::state::SharedState;

/// Admin REST routes.
pub mod admin;
/// Swagger UI routes.
pub mod docs;
/// Health routes.
pub mod health;
/// Participant join routes.
pub mod participant;
/// WebSocket upgrade route.
pub mod websocket;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(websocket::router())
        .merge(admin::router())
        .merge(participant::router());

    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}
