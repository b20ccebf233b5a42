//! Realtime protocol messages. Tags mirror the wire event names the clients
//! listen for (`role:event`), payload fields are camelCase.

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dao::models::QuestionEntity,
    services::ranking::RankedTeam,
};

/// Pre-serialized frame carried across audience broadcast channels.
#[derive(Clone, Debug)]
pub struct WsPayload {
    /// JSON text of one [`ServerMessage`].
    pub data: String,
}

impl WsPayload {
    /// Serialize a server message into a broadcastable frame.
    pub fn json<T: Serialize>(payload: &T) -> serde_json::Result<Self> {
        Ok(Self {
            data: serde_json::to_string(payload)?,
        })
    }
}

/// Messages accepted from connected clients.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Admin attaches to a game's admin group.
    #[serde(rename = "admin:connect", rename_all = "camelCase")]
    AdminConnect {
        /// Game to administer.
        game_id: Uuid,
    },
    /// Reset scores and open the first question.
    #[serde(rename = "admin:startGame", rename_all = "camelCase")]
    StartGame {
        /// Target game.
        game_id: Uuid,
    },
    /// Advance to the next question or finish the game.
    #[serde(rename = "admin:nextQuestion", rename_all = "camelCase")]
    NextQuestion {
        /// Target game.
        game_id: Uuid,
    },
    /// Re-broadcast the current question to the display with remaining time.
    #[serde(rename = "admin:reshowQuestion", rename_all = "camelCase")]
    ReshowQuestion {
        /// Target game.
        game_id: Uuid,
    },
    /// Close the current question and broadcast its statistics.
    #[serde(rename = "admin:showStats", rename_all = "camelCase")]
    ShowStats {
        /// Target game.
        game_id: Uuid,
    },
    /// Broadcast the current ranking.
    #[serde(rename = "admin:showRanking", rename_all = "camelCase")]
    ShowRanking {
        /// Target game.
        game_id: Uuid,
    },
    /// End the game immediately.
    #[serde(rename = "admin:endGame", rename_all = "camelCase")]
    EndGame {
        /// Target game.
        game_id: Uuid,
    },
    /// Participant enrolls into a team.
    #[serde(rename = "participant:join", rename_all = "camelCase")]
    Join {
        /// Team to join (resolved earlier from the access code).
        team_id: Uuid,
        /// Display name; duplicates allowed.
        nickname: String,
    },
    /// Participant submits an answer for the open question.
    #[serde(rename = "participant:answer", rename_all = "camelCase")]
    Answer {
        /// Identity handed out on join.
        participant_id: Uuid,
        /// Question being answered.
        question_id: Uuid,
        /// Picked option.
        answer_id: Uuid,
    },
    /// Display attaches to a game's display group.
    #[serde(rename = "display:connect", rename_all = "camelCase")]
    DisplayConnect {
        /// Game to mirror.
        game_id: Uuid,
    },
    /// Display-side countdown elapsed; close the question.
    #[serde(rename = "display:timeUp", rename_all = "camelCase")]
    TimeUp {
        /// Target game.
        game_id: Uuid,
    },
    /// Anything unrecognized; rejected with an error event.
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    /// Parse a text frame into a client message.
    pub fn from_json_str(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

/// An answer option as shown to participants and the display (no
/// correctness flag).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AnswerOption {
    /// Option identifier to submit back.
    pub id: Uuid,
    /// Option text.
    pub text: String,
}

/// Payload of a `question:new` broadcast.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSnapshot {
    /// Question identifier participants answer against.
    pub id: Uuid,
    /// Question text.
    pub text: String,
    /// Seconds on the clock (reduced on re-shows).
    pub time_limit: u32,
    /// Options in authored order.
    pub answers: Vec<AnswerOption>,
    /// 1-based ordinal of the question.
    pub question_number: usize,
    /// Total number of questions in the game.
    pub total_questions: usize,
    /// Ground truth, present only on the admin group's copy.
    pub correct_answer_id: Option<Uuid>,
}

impl QuestionSnapshot {
    /// Build the participant/display snapshot for a question.
    pub fn public(question: &QuestionEntity, question_number: usize, total: usize) -> Self {
        Self {
            id: question.id,
            text: question.text.clone(),
            time_limit: question.time_limit_secs,
            answers: question
                .answers
                .iter()
                .map(|answer| AnswerOption {
                    id: answer.id,
                    text: answer.text.clone(),
                })
                .collect(),
            question_number,
            total_questions: total,
            correct_answer_id: None,
        }
    }

    /// The same snapshot with the correct answer attached (admin copy).
    pub fn with_ground_truth(mut self, question: &QuestionEntity) -> Self {
        self.correct_answer_id = question.correct_answer_id();
        self
    }

    /// Copy with a reduced clock, used when re-showing a running question.
    pub fn with_remaining_time(mut self, remaining_secs: u32) -> Self {
        self.time_limit = remaining_secs;
        self
    }
}

/// Vote distribution line of a `question:stats` broadcast.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnswerStat {
    /// Option identifier.
    pub answer_id: Uuid,
    /// Option text.
    pub text: String,
    /// Whether this option was the correct one (revealed at close).
    pub is_correct: bool,
    /// Number of votes received.
    pub count: u64,
    /// Rounded share of the total votes; 0 when nobody voted.
    pub percent: u32,
}

/// Messages pushed to clients. The tag is the event name clients subscribe
/// to.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Game entered the active state.
    #[serde(rename = "game:started")]
    GameStarted,
    /// Game reached the finished state.
    #[serde(rename = "game:ended")]
    GameEnded,
    /// A question is (re-)shown.
    #[serde(rename = "question:new")]
    QuestionNew(QuestionSnapshot),
    /// Vote distribution after a question closed.
    #[serde(rename = "question:stats", rename_all = "camelCase")]
    QuestionStats {
        /// Total votes across every option.
        total_votes: u64,
        /// Per-option breakdown, zero-vote options included.
        distribution: Vec<AnswerStat>,
    },
    /// Current (or final) team ranking.
    #[serde(rename = "ranking:show", rename_all = "camelCase")]
    RankingShow {
        /// Dense-ranked teams, best first.
        teams: Vec<RankedTeam>,
        /// True only when the game is finished (server-authoritative).
        is_final: bool,
    },
    /// Join acknowledgement addressed to the joining socket.
    #[serde(rename = "participant:joined", rename_all = "camelCase")]
    Joined {
        /// Fresh participant identity to submit answers with.
        participant_id: Uuid,
        /// Team joined.
        team_id: Uuid,
        /// Echoed nickname.
        nickname: String,
        /// Starting score (always 0; joins never resume identities).
        score: i32,
    },
    /// Admin notification about a new participant.
    #[serde(rename = "participant:new", rename_all = "camelCase")]
    ParticipantNew {
        /// Created participant.
        participant_id: Uuid,
        /// Team joined.
        team_id: Uuid,
        /// Chosen nickname.
        nickname: String,
    },
    /// Admin notification about a submission (ground truth included).
    #[serde(rename = "participant:answered", rename_all = "camelCase")]
    ParticipantAnswered {
        /// Submitting participant.
        participant_id: Uuid,
        /// Whether the picked option was correct.
        is_correct: bool,
    },
    /// Neutral submission acknowledgement (no correctness revealed).
    #[serde(rename = "participant:answer_registered")]
    AnswerRegistered,
    /// The participant already answered this question.
    #[serde(rename = "participant:already_answered")]
    AlreadyAnswered,
    /// Number of participants currently connected (display bookkeeping).
    #[serde(rename = "participant:update_count")]
    UpdateCount {
        /// Connected participant sockets.
        count: u64,
    },
    /// Individually addressed outcome of a question for one participant.
    #[serde(rename = "answer:result", rename_all = "camelCase")]
    AnswerResult {
        /// Whether points were earned.
        is_correct: bool,
        /// Points awarded for this question.
        points_earned: i32,
        /// Submission time, absent when the participant never answered.
        time_taken: Option<f64>,
        /// Failure note ("time's up") on no-credit results.
        message: Option<String>,
    },
    /// Command rejected; scoped to the offending connection.
    #[serde(rename = "error")]
    Error {
        /// Human-readable reason.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_parse_wire_tags() {
        let raw = r#"{"type":"participant:answer","participantId":"6c5f84f2-4a43-4d6d-bd8f-3b1df4fd8a25","questionId":"9e107d9d-372b-4285-b26e-bb0b5eaa0f8b","answerId":"16fd2706-8baf-433b-82eb-8c7fada847da"}"#;
        match ClientMessage::from_json_str(raw).unwrap() {
            ClientMessage::Answer { participant_id, .. } => {
                assert_eq!(
                    participant_id,
                    "6c5f84f2-4a43-4d6d-bd8f-3b1df4fd8a25".parse::<Uuid>().unwrap()
                );
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn unrecognized_type_maps_to_unknown() {
        let parsed = ClientMessage::from_json_str(r#"{"type":"admin:reboot"}"#).unwrap();
        assert!(matches!(parsed, ClientMessage::Unknown));
    }

    #[test]
    fn server_messages_carry_wire_tags() {
        let frame = WsPayload::json(&ServerMessage::AnswerRegistered).unwrap();
        assert_eq!(frame.data, r#"{"type":"participant:answer_registered"}"#);

        let frame = WsPayload::json(&ServerMessage::UpdateCount { count: 7 }).unwrap();
        assert!(frame.data.contains(r#""type":"participant:update_count""#));
        assert!(frame.data.contains(r#""count":7"#));
    }

    #[test]
    fn answer_result_omits_absent_fields() {
        let frame = WsPayload::json(&ServerMessage::AnswerResult {
            is_correct: false,
            points_earned: 0,
            time_taken: None,
            message: Some("time's up".into()),
        })
        .unwrap();
        assert!(!frame.data.contains("timeTaken"));
        assert!(frame.data.contains(r#""message":"time's up""#));
    }
}
