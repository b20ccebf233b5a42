use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dao::models::{
        AnswerEntity, GameEntity, GameListItemEntity, GameStatus, QuestionEntity, TeamEntity,
    },
    dto::format_system_time,
};

/// List entry returned by the games index endpoint.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GameListItem {
    /// Game identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Lifecycle status.
    pub status: GameStatus,
    /// Number of authored questions.
    pub question_count: usize,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
}

impl From<GameListItemEntity> for GameListItem {
    fn from(entity: GameListItemEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            status: entity.status,
            question_count: entity.question_count,
            created_at: format_system_time(entity.created_at),
        }
    }
}

/// Full game projection returned to the admin UI, including ground truth.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GameDetail {
    /// Game identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Lifecycle status.
    pub status: GameStatus,
    /// Index of the question currently (or last) played.
    pub current_question_index: usize,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    /// Questions in play order.
    pub questions: Vec<QuestionDetail>,
    /// Teams registered for the game.
    pub teams: Vec<TeamSummary>,
}

impl GameDetail {
    /// Assemble the detail projection from a game and its teams.
    pub fn from_entities(game: GameEntity, teams: Vec<TeamEntity>) -> Self {
        Self {
            id: game.id,
            name: game.name,
            status: game.status,
            current_question_index: game.current_question_index,
            created_at: format_system_time(game.created_at),
            questions: game.questions.into_iter().map(Into::into).collect(),
            teams: teams.into_iter().map(Into::into).collect(),
        }
    }
}

/// Question projection inside [`GameDetail`] (admin view, correctness
/// included).
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDetail {
    /// Question identifier.
    pub id: Uuid,
    /// Question text.
    pub text: String,
    /// Seconds on the clock.
    pub time_limit_secs: u32,
    /// Base points for a correct answer.
    pub points: i32,
    /// Position in play order.
    pub order_index: u32,
    /// Answer options in authored order.
    pub answers: Vec<AnswerDetail>,
}

impl From<QuestionEntity> for QuestionDetail {
    fn from(entity: QuestionEntity) -> Self {
        Self {
            id: entity.id,
            text: entity.text,
            time_limit_secs: entity.time_limit_secs,
            points: entity.points,
            order_index: entity.order_index,
            answers: entity.answers.into_iter().map(Into::into).collect(),
        }
    }
}

/// Answer-option projection inside [`QuestionDetail`].
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnswerDetail {
    /// Option identifier.
    pub id: Uuid,
    /// Option text.
    pub text: String,
    /// Ground truth flag (admin surface only).
    pub is_correct: bool,
}

impl From<AnswerEntity> for AnswerDetail {
    fn from(entity: AnswerEntity) -> Self {
        Self {
            id: entity.id,
            text: entity.text,
            is_correct: entity.is_correct,
        }
    }
}

/// Team projection exposed to the admin UI.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeamSummary {
    /// Team identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Join code participants type in (or scan).
    pub access_code: String,
    /// Stored aggregate score.
    pub score: i32,
}

impl From<TeamEntity> for TeamSummary {
    fn from(entity: TeamEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            access_code: entity.access_code,
            score: entity.score,
        }
    }
}
