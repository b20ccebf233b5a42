use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::{
        admin::{
            CreateAnswerRequest, CreateGameRequest, CreateQuestionRequest, CreateTeamRequest,
            CreatedResponse, TeamCreatedResponse,
        },
        game::{GameDetail, GameListItem},
    },
    error::AppError,
    services::admin_service,
    state::SharedState,
};

/// Admin-only management endpoints for authoring and inspecting games.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/admin/games", get(list_games).post(create_game))
        .route("/admin/games/{id}", get(get_game).delete(delete_game))
        .route("/admin/teams", post(create_team))
        .route("/admin/teams/{id}", axum::routing::delete(delete_team))
        .route("/admin/questions", post(create_question))
        .route("/admin/questions/{id}", axum::routing::delete(delete_question))
        .route("/admin/answers", post(create_answer))
        .route("/admin/answers/{id}", axum::routing::delete(delete_answer))
}

/// Retrieve all games known to the system.
#[utoipa::path(
    get,
    path = "/admin/games",
    tag = "admin",
    responses((status = 200, description = "List available games", body = [GameListItem]))
)]
pub async fn list_games(
    State(state): State<SharedState>,
) -> Result<Json<Vec<GameListItem>>, AppError> {
    Ok(Json(admin_service::list_games(&state).await?))
}

/// Retrieve a game with its questions and teams.
#[utoipa::path(
    get,
    path = "/admin/games/{id}",
    tag = "admin",
    params(("id" = String, Path, description = "Identifier of the game to retrieve")),
    responses((status = 200, description = "Game detail", body = GameDetail))
)]
pub async fn get_game(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GameDetail>, AppError> {
    Ok(Json(admin_service::get_game(&state, id).await?))
}

/// Create a fresh game shell.
#[utoipa::path(
    post,
    path = "/admin/games",
    tag = "admin",
    request_body = CreateGameRequest,
    responses((status = 200, description = "Game created", body = CreatedResponse))
)]
pub async fn create_game(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreateGameRequest>>,
) -> Result<Json<CreatedResponse>, AppError> {
    Ok(Json(admin_service::create_game(&state, payload).await?))
}

/// Delete a game.
#[utoipa::path(
    delete,
    path = "/admin/games/{id}",
    tag = "admin",
    params(("id" = String, Path, description = "Identifier of the game to delete")),
    responses((status = 204, description = "Game deleted"))
)]
pub async fn delete_game(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    admin_service::delete_game(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Register a team and return its join material.
#[utoipa::path(
    post,
    path = "/admin/teams",
    tag = "admin",
    request_body = CreateTeamRequest,
    responses((status = 200, description = "Team created", body = TeamCreatedResponse))
)]
pub async fn create_team(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreateTeamRequest>>,
) -> Result<Json<TeamCreatedResponse>, AppError> {
    Ok(Json(admin_service::create_team(&state, payload).await?))
}

/// Delete a team.
#[utoipa::path(
    delete,
    path = "/admin/teams/{id}",
    tag = "admin",
    params(("id" = String, Path, description = "Identifier of the team to delete")),
    responses((status = 204, description = "Team deleted"))
)]
pub async fn delete_team(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    admin_service::delete_team(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Author a question.
#[utoipa::path(
    post,
    path = "/admin/questions",
    tag = "admin",
    request_body = CreateQuestionRequest,
    responses((status = 200, description = "Question created", body = CreatedResponse))
)]
pub async fn create_question(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreateQuestionRequest>>,
) -> Result<Json<CreatedResponse>, AppError> {
    Ok(Json(admin_service::create_question(&state, payload).await?))
}

/// Delete a question.
#[utoipa::path(
    delete,
    path = "/admin/questions/{id}",
    tag = "admin",
    params(("id" = String, Path, description = "Identifier of the question to delete")),
    responses((status = 204, description = "Question deleted"))
)]
pub async fn delete_question(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    admin_service::delete_question(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Author an answer option.
#[utoipa::path(
    post,
    path = "/admin/answers",
    tag = "admin",
    request_body = CreateAnswerRequest,
    responses((status = 200, description = "Answer option created", body = CreatedResponse))
)]
pub async fn create_answer(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreateAnswerRequest>>,
) -> Result<Json<CreatedResponse>, AppError> {
    Ok(Json(admin_service::create_answer(&state, payload).await?))
}

/// Delete an answer option.
#[utoipa::path(
    delete,
    path = "/admin/answers/{id}",
    tag = "admin",
    params(("id" = String, Path, description = "Identifier of the answer option to delete")),
    responses((status = 204, description = "Answer option deleted"))
)]
pub async fn delete_answer(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    admin_service::delete_answer(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
