use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle status of a game as persisted by the storage layer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    /// Game has been authored but not started yet.
    Waiting,
    /// Game is running; questions are being played.
    Active,
    /// Game reached its end; only rankings remain relevant.
    Finished,
}

/// Aggregate game entity persisted by the storage layer.
///
/// Questions are embedded (with their answer options) because they are
/// authored and played as one unit; teams live in their own table keyed by
/// `game_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameEntity {
    /// Primary key of the game.
    pub id: Uuid,
    /// Display name of the trivia session.
    pub name: String,
    /// Current lifecycle status.
    pub status: GameStatus,
    /// Index into `questions` of the question currently (or last) played.
    pub current_question_index: usize,
    /// Questions in play order (sorted by `order_index`).
    pub questions: Vec<QuestionEntity>,
    /// Creation timestamp for auditing/debugging.
    pub created_at: SystemTime,
}

impl GameEntity {
    /// Create a fresh game in the waiting state with no questions yet.
    pub fn new(name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            status: GameStatus::Waiting,
            current_question_index: 0,
            questions: Vec::new(),
            created_at: SystemTime::now(),
        }
    }

    /// Borrow the question at the given play-order position, if any.
    pub fn question_at(&self, index: usize) -> Option<&QuestionEntity> {
        self.questions.get(index)
    }
}

/// A single timed question belonging to one game.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestionEntity {
    /// Primary key of the question.
    pub id: Uuid,
    /// Game this question belongs to.
    pub game_id: Uuid,
    /// Question text shown to every audience.
    pub text: String,
    /// Seconds participants have to answer.
    pub time_limit_secs: u32,
    /// Base points awarded for a correct answer.
    pub points: i32,
    /// Position in the game's play order (unique per game).
    pub order_index: u32,
    /// Answer options in authored order; exactly one is flagged correct.
    pub answers: Vec<AnswerEntity>,
}

impl QuestionEntity {
    /// Identifier of the correct answer option, if one has been authored.
    pub fn correct_answer_id(&self) -> Option<Uuid> {
        self.answers.iter().find(|a| a.is_correct).map(|a| a.id)
    }
}

/// One selectable answer option of a question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnswerEntity {
    /// Primary key of the answer option.
    pub id: Uuid,
    /// Question this option belongs to.
    pub question_id: Uuid,
    /// Option text.
    pub text: String,
    /// Whether picking this option counts as correct.
    pub is_correct: bool,
}

/// Representation of a team stored in persistence and shared across layers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TeamEntity {
    /// Primary key of the team.
    pub id: Uuid,
    /// Game this team plays in.
    pub game_id: Uuid,
    /// Display name chosen for the team.
    pub name: String,
    /// Shared join code handed to participants (8 uppercase alphanumerics).
    pub access_code: String,
    /// Stored aggregate score: the rounded average of the team's answering
    /// participants' totals, recomputed whenever a ranking is requested.
    pub score: i32,
    /// Creation timestamp.
    pub created_at: SystemTime,
}

/// A person playing on a device, attached to one team.
///
/// Every join creates a fresh participant row; reconnects never resume a
/// prior identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParticipantEntity {
    /// Primary key of the participant.
    pub id: Uuid,
    /// Team this participant plays for.
    pub team_id: Uuid,
    /// Nickname entered on join (duplicates allowed).
    pub nickname: String,
    /// Identifier of the live connection that created this participant.
    pub connection_id: String,
    /// Cumulative points earned across all questions.
    pub total_score: i32,
    /// Creation timestamp.
    pub created_at: SystemTime,
}

/// Immutable record of one participant answering one question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnswerRecordEntity {
    /// Participant that submitted.
    pub participant_id: Uuid,
    /// Question that was answered.
    pub question_id: Uuid,
    /// Option that was picked.
    pub answer_id: Uuid,
    /// Seconds between question open and submission.
    pub time_taken_secs: f64,
    /// Points awarded by the scoring engine (0 when incorrect).
    pub points_earned: i32,
    /// Insertion timestamp.
    pub created_at: SystemTime,
}

/// Slim game projection used by list endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameListItemEntity {
    /// Primary key of the game.
    pub id: Uuid,
    /// Display name of the trivia session.
    pub name: String,
    /// Current lifecycle status.
    pub status: GameStatus,
    /// Number of authored questions.
    pub question_count: usize,
    /// Creation timestamp.
    pub created_at: SystemTime,
}

impl From<&GameEntity> for GameListItemEntity {
    fn from(entity: &GameEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name.clone(),
            status: entity.status,
            question_count: entity.questions.len(),
            created_at: entity.created_at,
        }
    }
}

/// Per-team aggregates needed to build a ranking entry.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TeamScoreSummary {
    /// Sum of all participant totals on the team.
    pub points_sum: i64,
    /// Participants with at least one answer record (the ranking divisor).
    pub answering_participants: u64,
    /// Answer records written by the team's participants.
    pub total_answers: u64,
    /// Of those, records that earned points.
    pub correct_answers: u64,
}

impl TeamScoreSummary {
    /// Rounded average of participant totals; 0 when nobody answered yet.
    ///
    /// The divisor defaults to 1 so a team without answering participants
    /// yields 0 instead of a division error.
    pub fn average_score(&self) -> i32 {
        let divisor = self.answering_participants.max(1) as f64;
        (self.points_sum as f64 / divisor).round() as i32
    }

    /// Percentage of answers that earned points, rounded; 0 without answers.
    pub fn accuracy_percent(&self) -> u32 {
        if self.total_answers == 0 {
            return 0;
        }
        ((self.correct_answers as f64 / self.total_answers as f64) * 100.0).round() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_score_guards_empty_divisor() {
        let summary = TeamScoreSummary::default();
        assert_eq!(summary.average_score(), 0);
    }

    #[test]
    fn average_score_rounds() {
        let summary = TeamScoreSummary {
            points_sum: 2375,
            answering_participants: 2,
            total_answers: 2,
            correct_answers: 2,
        };
        assert_eq!(summary.average_score(), 1188);
        assert_eq!(summary.accuracy_percent(), 100);
    }

    #[test]
    fn accuracy_without_answers_is_zero() {
        let summary = TeamScoreSummary {
            points_sum: 0,
            answering_participants: 0,
            total_answers: 0,
            correct_answers: 0,
        };
        assert_eq!(summary.accuracy_percent(), 0);
    }
}
