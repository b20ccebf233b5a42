/// Always-available in-memory backend (tests, storage-less operation).
pub mod memory;
#[cfg(feature = "mongo-store")]
/// MongoDB-backed persistent store.
pub mod mongodb;

use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::{
    models::{
        AnswerEntity, AnswerRecordEntity, GameEntity, GameListItemEntity, GameStatus,
        ParticipantEntity, QuestionEntity, TeamEntity, TeamScoreSummary,
    },
    storage::StorageResult,
};

/// Abstraction over the persistence layer for games, teams, questions,
/// participants, and answer records.
///
/// The orchestrator and REST services only ever see this trait object; the
/// concrete backend is installed into shared state by the storage supervisor.
pub trait QuizStore: Send + Sync {
    // -- games -------------------------------------------------------------

    /// Insert or replace a game (questions embedded).
    fn save_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Fetch a game with its questions and answer options.
    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>>;
    /// List all games, newest first.
    fn list_games(&self) -> BoxFuture<'static, StorageResult<Vec<GameListItemEntity>>>;
    /// Delete a game; returns whether it existed.
    fn delete_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;
    /// Persist a status transition.
    fn update_game_status(
        &self,
        id: Uuid,
        status: GameStatus,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Persist the current question index.
    fn update_current_question(
        &self,
        id: Uuid,
        index: usize,
    ) -> BoxFuture<'static, StorageResult<()>>;

    // -- teams -------------------------------------------------------------

    /// Insert or replace a team.
    fn save_team(&self, team: TeamEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Fetch a team by id.
    fn find_team(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<TeamEntity>>>;
    /// Fetch a team by its participant join code.
    fn find_team_by_access_code(
        &self,
        access_code: String,
    ) -> BoxFuture<'static, StorageResult<Option<TeamEntity>>>;
    /// Teams registered for a game, in creation order.
    fn teams_for_game(&self, game_id: Uuid)
    -> BoxFuture<'static, StorageResult<Vec<TeamEntity>>>;
    /// Delete a team; returns whether it existed.
    fn delete_team(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;
    /// Persist a recomputed aggregate team score.
    fn update_team_score(&self, id: Uuid, score: i32) -> BoxFuture<'static, StorageResult<()>>;

    // -- questions & answer options ---------------------------------------

    /// Append a question to its game, keeping play order sorted.
    fn save_question(&self, question: QuestionEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Fetch a question (with options) by id.
    fn find_question(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<QuestionEntity>>>;
    /// Remove a question from its game; returns whether it existed.
    fn delete_question(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;
    /// Append an answer option to its question.
    fn save_answer(&self, answer: AnswerEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Fetch an answer option by id.
    fn find_answer(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<AnswerEntity>>>;
    /// Remove an answer option; returns whether it existed.
    fn delete_answer(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;

    // -- participants ------------------------------------------------------

    /// Insert a freshly joined participant.
    fn save_participant(
        &self,
        participant: ParticipantEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Fetch a participant by id.
    fn find_participant(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>>;
    /// Add earned points to a participant's cumulative total.
    fn add_participant_points(
        &self,
        id: Uuid,
        points: i32,
    ) -> BoxFuture<'static, StorageResult<()>>;

    // -- answer records ----------------------------------------------------

    /// Insert an answer record unless the (participant, question) pair
    /// already has one; returns whether the record was inserted.
    fn record_answer(
        &self,
        record: AnswerRecordEntity,
    ) -> BoxFuture<'static, StorageResult<bool>>;
    /// Number of answer records written for a question.
    fn count_answer_records(
        &self,
        question_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<u64>>;
    /// All answer records for a question (stats + result fan-out).
    fn answer_records_for_question(
        &self,
        question_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<AnswerRecordEntity>>>;

    // -- aggregates & lifecycle -------------------------------------------

    /// Aggregates feeding one team's ranking entry.
    fn team_score_summary(
        &self,
        team_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<TeamScoreSummary>>;
    /// Zero team scores and participant totals and delete answer records for
    /// every team of the game (game start / restart).
    fn reset_game_progress(&self, game_id: Uuid) -> BoxFuture<'static, StorageResult<()>>;

    // -- infrastructure ----------------------------------------------------

    /// Cheap liveness probe against the backend.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Attempt to re-establish a dropped backend connection.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
