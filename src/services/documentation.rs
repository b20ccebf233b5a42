use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the live trivia backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::websocket::ws_handler,
        crate::routes::admin::list_games,
        crate::routes::admin::get_game,
        crate::routes::admin::create_game,
        crate::routes::admin::delete_game,
        crate::routes::admin::create_team,
        crate::routes::admin::delete_team,
        crate::routes::admin::create_question,
        crate::routes::admin::delete_question,
        crate::routes::admin::create_answer,
        crate::routes::admin::delete_answer,
        crate::routes::participant::join_lookup,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::admin::CreateGameRequest,
            crate::dto::admin::CreateTeamRequest,
            crate::dto::admin::TeamCreatedResponse,
            crate::dto::admin::CreateQuestionRequest,
            crate::dto::admin::CreateAnswerRequest,
            crate::dto::admin::CreatedResponse,
            crate::dto::game::GameListItem,
            crate::dto::game::GameDetail,
            crate::dto::game::QuestionDetail,
            crate::dto::game::AnswerDetail,
            crate::dto::game::TeamSummary,
            crate::dto::participant::JoinRequest,
            crate::dto::participant::JoinResponse,
            crate::dto::participant::TeamJoinInfo,
            crate::dto::participant::GameJoinInfo,
            crate::dto::ws::ClientMessage,
            crate::dto::ws::ServerMessage,
            crate::dto::ws::QuestionSnapshot,
            crate::dto::ws::AnswerOption,
            crate::dto::ws::AnswerStat,
            crate::services::ranking::RankedTeam,
            crate::dao::models::GameStatus,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "admin", description = "Game authoring and management"),
        (name = "participant", description = "Participant join flow"),
        (name = "realtime", description = "WebSocket session protocol"),
    )
)]
pub struct ApiDoc;
