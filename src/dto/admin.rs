use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Payload creating a new game shell (questions are added separately).
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateGameRequest {
    /// Display name of the trivia session.
    #[validate(length(min = 1, max = 120))]
    pub name: String,
}

/// Payload registering a team for a game.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTeamRequest {
    /// Game the team plays in.
    pub game_id: Uuid,
    /// Display name of the team.
    #[validate(length(min = 1, max = 80))]
    pub name: String,
}

/// Response to a team creation, carrying the join material.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeamCreatedResponse {
    /// Team identifier.
    pub id: Uuid,
    /// Game the team belongs to.
    pub game_id: Uuid,
    /// Display name.
    pub name: String,
    /// Generated join code.
    pub access_code: String,
    /// Join URL participants open (rendered as a QR code client-side).
    pub join_url: String,
}

/// Payload authoring a question.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuestionRequest {
    /// Game the question belongs to.
    pub game_id: Uuid,
    /// Question text.
    #[validate(length(min = 1, max = 500))]
    pub text: String,
    /// Seconds participants get to answer.
    #[validate(range(min = 5, max = 600))]
    pub time_limit_secs: u32,
    /// Base points for a correct answer.
    #[validate(range(min = 1, max = 100_000))]
    pub points: i32,
    /// Position in the game's play order.
    pub order_index: u32,
}

/// Payload authoring an answer option.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAnswerRequest {
    /// Question the option belongs to.
    pub question_id: Uuid,
    /// Option text.
    #[validate(length(min = 1, max = 300))]
    pub text: String,
    /// Whether this option is the correct one (at most one per question).
    pub is_correct: bool,
}

/// Generic creation acknowledgement.
#[derive(Debug, Serialize, ToSchema)]
pub struct CreatedResponse {
    /// Identifier of the created resource.
    pub id: Uuid,
}
