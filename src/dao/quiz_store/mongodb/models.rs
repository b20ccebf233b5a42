use mongodb::bson::{Binary, DateTime, Document, doc, spec::BinarySubtype};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dao::models::{
    AnswerRecordEntity, GameEntity, GameStatus, ParticipantEntity, QuestionEntity, TeamEntity,
};

/// Game document with embedded questions; `_id` carries the game id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoGameDocument {
    #[serde(rename = "_id")]
    id: Uuid,
    name: String,
    status: GameStatus,
    current_question_index: u32,
    questions: Vec<QuestionEntity>,
    created_at: DateTime,
}

impl From<GameEntity> for MongoGameDocument {
    fn from(value: GameEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
            status: value.status,
            current_question_index: value.current_question_index as u32,
            questions: value.questions,
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl From<MongoGameDocument> for GameEntity {
    fn from(value: MongoGameDocument) -> Self {
        Self {
            id: value.id,
            name: value.name,
            status: value.status,
            current_question_index: value.current_question_index as usize,
            questions: value.questions,
            created_at: value.created_at.to_system_time(),
        }
    }
}

/// Team document stored in its own collection keyed by `_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoTeamDocument {
    #[serde(rename = "_id")]
    id: Uuid,
    game_id: Uuid,
    name: String,
    access_code: String,
    score: i32,
    created_at: DateTime,
}

impl From<TeamEntity> for MongoTeamDocument {
    fn from(value: TeamEntity) -> Self {
        Self {
            id: value.id,
            game_id: value.game_id,
            name: value.name,
            access_code: value.access_code,
            score: value.score,
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl From<MongoTeamDocument> for TeamEntity {
    fn from(value: MongoTeamDocument) -> Self {
        Self {
            id: value.id,
            game_id: value.game_id,
            name: value.name,
            access_code: value.access_code,
            score: value.score,
            created_at: value.created_at.to_system_time(),
        }
    }
}

/// Participant document stored in its own collection keyed by `_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoParticipantDocument {
    #[serde(rename = "_id")]
    id: Uuid,
    team_id: Uuid,
    nickname: String,
    connection_id: String,
    total_score: i32,
    created_at: DateTime,
}

impl From<ParticipantEntity> for MongoParticipantDocument {
    fn from(value: ParticipantEntity) -> Self {
        Self {
            id: value.id,
            team_id: value.team_id,
            nickname: value.nickname,
            connection_id: value.connection_id,
            total_score: value.total_score,
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl From<MongoParticipantDocument> for ParticipantEntity {
    fn from(value: MongoParticipantDocument) -> Self {
        Self {
            id: value.id,
            team_id: value.team_id,
            nickname: value.nickname,
            connection_id: value.connection_id,
            total_score: value.total_score,
            created_at: value.created_at.to_system_time(),
        }
    }
}

/// Answer-record document; uniqueness of (participant_id, question_id) is
/// enforced by a compound index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoAnswerRecordDocument {
    participant_id: Uuid,
    question_id: Uuid,
    answer_id: Uuid,
    time_taken_secs: f64,
    points_earned: i32,
    created_at: DateTime,
}

impl From<AnswerRecordEntity> for MongoAnswerRecordDocument {
    fn from(value: AnswerRecordEntity) -> Self {
        Self {
            participant_id: value.participant_id,
            question_id: value.question_id,
            answer_id: value.answer_id,
            time_taken_secs: value.time_taken_secs,
            points_earned: value.points_earned,
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl From<MongoAnswerRecordDocument> for AnswerRecordEntity {
    fn from(value: MongoAnswerRecordDocument) -> Self {
        Self {
            participant_id: value.participant_id,
            question_id: value.question_id,
            answer_id: value.answer_id,
            time_taken_secs: value.time_taken_secs,
            points_earned: value.points_earned,
            created_at: value.created_at.to_system_time(),
        }
    }
}

/// Encode a UUID the way the driver stores `Uuid` fields.
pub fn uuid_as_binary(id: Uuid) -> Binary {
    Binary {
        subtype: BinarySubtype::Uuid,
        bytes: id.into_bytes().to_vec(),
    }
}

/// Filter document selecting by `_id`.
pub fn doc_id(id: Uuid) -> Document {
    doc! {"_id": uuid_as_binary(id)}
}

/// Serialized form of a game status for `$set` updates.
pub fn status_as_str(status: GameStatus) -> &'static str {
    match status {
        GameStatus::Waiting => "waiting",
        GameStatus::Active => "active",
        GameStatus::Finished => "finished",
    }
}
