use axum::{Json, Router, extract::State, routing::post};
use axum_valid::Valid;

use crate::{
    dto::participant::{JoinRequest, JoinResponse},
    error::AppError,
    services::participant_service,
    state::SharedState,
};

/// Validate a team access code before the realtime join.
#[utoipa::path(
    post,
    path = "/participant/join",
    tag = "participant",
    request_body = JoinRequest,
    responses((status = 200, description = "Team resolved", body = JoinResponse))
)]
pub async fn join_lookup(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<JoinRequest>>,
) -> Result<Json<JoinResponse>, AppError> {
    Ok(Json(participant_service::lookup_join(&state, payload).await?))
}

/// Configure the participant routes subtree.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/participant/join", post(join_lookup))
}
