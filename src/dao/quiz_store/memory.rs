use std::{collections::HashSet, sync::Arc};

use futures::future::BoxFuture;
use indexmap::IndexMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::dao::{
    models::{
        AnswerEntity, AnswerRecordEntity, GameEntity, GameListItemEntity, GameStatus,
        ParticipantEntity, QuestionEntity, TeamEntity, TeamScoreSummary,
    },
    quiz_store::QuizStore,
    storage::{StorageError, StorageResult},
};

/// In-memory [`QuizStore`] backend.
///
/// Used by the integration tests and as the fallback when the server runs
/// without a database. All tables live behind one async mutex; operations
/// are short and never await while holding it.
#[derive(Clone, Default)]
pub struct MemoryQuizStore {
    inner: Arc<Mutex<Tables>>,
}

#[derive(Default)]
struct Tables {
    games: IndexMap<Uuid, GameEntity>,
    teams: IndexMap<Uuid, TeamEntity>,
    participants: IndexMap<Uuid, ParticipantEntity>,
    /// Keyed by (participant, question) so duplicates are structurally
    /// impossible, mirroring the unique compound index of the MongoDB
    /// backend.
    records: IndexMap<(Uuid, Uuid), AnswerRecordEntity>,
}

impl MemoryQuizStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn missing_game(id: Uuid) -> StorageError {
    StorageError::Inconsistent {
        message: format!("game `{id}` not present in memory store"),
    }
}

impl Tables {
    fn question_mut(&mut self, id: Uuid) -> Option<&mut QuestionEntity> {
        self.games
            .values_mut()
            .flat_map(|game| game.questions.iter_mut())
            .find(|question| question.id == id)
    }

    fn team_participant_ids(&self, team_id: Uuid) -> Vec<Uuid> {
        self.participants
            .values()
            .filter(|p| p.team_id == team_id)
            .map(|p| p.id)
            .collect()
    }
}

impl QuizStore for MemoryQuizStore {
    fn save_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.inner.lock().await;
            tables.games.insert(game.id, game);
            Ok(())
        })
    }

    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.inner.lock().await;
            Ok(tables.games.get(&id).cloned())
        })
    }

    fn list_games(&self) -> BoxFuture<'static, StorageResult<Vec<GameListItemEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.inner.lock().await;
            Ok(tables.games.values().rev().map(Into::into).collect())
        })
    }

    fn delete_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.inner.lock().await;
            Ok(tables.games.shift_remove(&id).is_some())
        })
    }

    fn update_game_status(
        &self,
        id: Uuid,
        status: GameStatus,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.inner.lock().await;
            let game = tables.games.get_mut(&id).ok_or_else(|| missing_game(id))?;
            game.status = status;
            Ok(())
        })
    }

    fn update_current_question(
        &self,
        id: Uuid,
        index: usize,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.inner.lock().await;
            let game = tables.games.get_mut(&id).ok_or_else(|| missing_game(id))?;
            game.current_question_index = index;
            Ok(())
        })
    }

    fn save_team(&self, team: TeamEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.inner.lock().await;
            tables.teams.insert(team.id, team);
            Ok(())
        })
    }

    fn find_team(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<TeamEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.inner.lock().await;
            Ok(tables.teams.get(&id).cloned())
        })
    }

    fn find_team_by_access_code(
        &self,
        access_code: String,
    ) -> BoxFuture<'static, StorageResult<Option<TeamEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.inner.lock().await;
            Ok(tables
                .teams
                .values()
                .find(|team| team.access_code == access_code)
                .cloned())
        })
    }

    fn teams_for_game(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<TeamEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.inner.lock().await;
            Ok(tables
                .teams
                .values()
                .filter(|team| team.game_id == game_id)
                .cloned()
                .collect())
        })
    }

    fn delete_team(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.inner.lock().await;
            Ok(tables.teams.shift_remove(&id).is_some())
        })
    }

    fn update_team_score(&self, id: Uuid, score: i32) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.inner.lock().await;
            if let Some(team) = tables.teams.get_mut(&id) {
                team.score = score;
            }
            Ok(())
        })
    }

    fn save_question(&self, question: QuestionEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.inner.lock().await;
            let game_id = question.game_id;
            let game = tables
                .games
                .get_mut(&game_id)
                .ok_or_else(|| missing_game(game_id))?;
            game.questions.push(question);
            game.questions.sort_by_key(|q| q.order_index);
            Ok(())
        })
    }

    fn find_question(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<QuestionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.inner.lock().await;
            Ok(tables
                .games
                .values()
                .flat_map(|game| game.questions.iter())
                .find(|question| question.id == id)
                .cloned())
        })
    }

    fn delete_question(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.inner.lock().await;
            for game in tables.games.values_mut() {
                let before = game.questions.len();
                game.questions.retain(|question| question.id != id);
                if game.questions.len() != before {
                    return Ok(true);
                }
            }
            Ok(false)
        })
    }

    fn save_answer(&self, answer: AnswerEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.inner.lock().await;
            let question_id = answer.question_id;
            let question = tables.question_mut(question_id).ok_or_else(|| {
                StorageError::Inconsistent {
                    message: format!("question `{question_id}` not present in memory store"),
                }
            })?;
            question.answers.push(answer);
            Ok(())
        })
    }

    fn find_answer(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<AnswerEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.inner.lock().await;
            Ok(tables
                .games
                .values()
                .flat_map(|game| game.questions.iter())
                .flat_map(|question| question.answers.iter())
                .find(|answer| answer.id == id)
                .cloned())
        })
    }

    fn delete_answer(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.inner.lock().await;
            for game in tables.games.values_mut() {
                for question in game.questions.iter_mut() {
                    let before = question.answers.len();
                    question.answers.retain(|answer| answer.id != id);
                    if question.answers.len() != before {
                        return Ok(true);
                    }
                }
            }
            Ok(false)
        })
    }

    fn save_participant(
        &self,
        participant: ParticipantEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.inner.lock().await;
            tables.participants.insert(participant.id, participant);
            Ok(())
        })
    }

    fn find_participant(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.inner.lock().await;
            Ok(tables.participants.get(&id).cloned())
        })
    }

    fn add_participant_points(
        &self,
        id: Uuid,
        points: i32,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.inner.lock().await;
            if let Some(participant) = tables.participants.get_mut(&id) {
                participant.total_score += points;
            }
            Ok(())
        })
    }

    fn record_answer(
        &self,
        record: AnswerRecordEntity,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.inner.lock().await;
            let key = (record.participant_id, record.question_id);
            if tables.records.contains_key(&key) {
                return Ok(false);
            }
            tables.records.insert(key, record);
            Ok(true)
        })
    }

    fn count_answer_records(
        &self,
        question_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<u64>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.inner.lock().await;
            Ok(tables
                .records
                .values()
                .filter(|record| record.question_id == question_id)
                .count() as u64)
        })
    }

    fn answer_records_for_question(
        &self,
        question_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<AnswerRecordEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.inner.lock().await;
            Ok(tables
                .records
                .values()
                .filter(|record| record.question_id == question_id)
                .cloned()
                .collect())
        })
    }

    fn team_score_summary(
        &self,
        team_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<TeamScoreSummary>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.inner.lock().await;
            let member_ids: HashSet<Uuid> =
                tables.team_participant_ids(team_id).into_iter().collect();

            let mut summary = TeamScoreSummary::default();
            for participant in tables.participants.values() {
                if member_ids.contains(&participant.id) {
                    summary.points_sum += i64::from(participant.total_score);
                }
            }

            let mut answering: HashSet<Uuid> = HashSet::new();
            for record in tables.records.values() {
                if member_ids.contains(&record.participant_id) {
                    answering.insert(record.participant_id);
                    summary.total_answers += 1;
                    if record.points_earned > 0 {
                        summary.correct_answers += 1;
                    }
                }
            }
            summary.answering_participants = answering.len() as u64;

            Ok(summary)
        })
    }

    fn reset_game_progress(&self, game_id: Uuid) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.inner.lock().await;

            let team_ids: HashSet<Uuid> = tables
                .teams
                .values()
                .filter(|team| team.game_id == game_id)
                .map(|team| team.id)
                .collect();

            for team in tables.teams.values_mut() {
                if team_ids.contains(&team.id) {
                    team.score = 0;
                }
            }

            let mut member_ids: HashSet<Uuid> = HashSet::new();
            for participant in tables.participants.values_mut() {
                if team_ids.contains(&participant.team_id) {
                    participant.total_score = 0;
                    member_ids.insert(participant.id);
                }
            }

            tables
                .records
                .retain(|(participant_id, _), _| !member_ids.contains(participant_id));

            Ok(())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_game() -> GameEntity {
        GameEntity::new("quiz night".into())
    }

    #[tokio::test]
    async fn record_answer_rejects_duplicates() {
        let store = MemoryQuizStore::new();
        let record = AnswerRecordEntity {
            participant_id: Uuid::new_v4(),
            question_id: Uuid::new_v4(),
            answer_id: Uuid::new_v4(),
            time_taken_secs: 1.5,
            points_earned: 100,
            created_at: std::time::SystemTime::now(),
        };

        assert!(store.record_answer(record.clone()).await.unwrap());
        assert!(!store.record_answer(record.clone()).await.unwrap());
        assert_eq!(
            store.count_answer_records(record.question_id).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn questions_keep_play_order() {
        let store = MemoryQuizStore::new();
        let game = sample_game();
        let game_id = game.id;
        store.save_game(game).await.unwrap();

        for order_index in [2u32, 0, 1] {
            store
                .save_question(QuestionEntity {
                    id: Uuid::new_v4(),
                    game_id,
                    text: format!("q{order_index}"),
                    time_limit_secs: 20,
                    points: 100,
                    order_index,
                    answers: Vec::new(),
                })
                .await
                .unwrap();
        }

        let game = store.find_game(game_id).await.unwrap().unwrap();
        let order: Vec<u32> = game.questions.iter().map(|q| q.order_index).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn reset_game_progress_clears_scores_and_records() {
        let store = MemoryQuizStore::new();
        let game = sample_game();
        let game_id = game.id;
        store.save_game(game).await.unwrap();

        let team = TeamEntity {
            id: Uuid::new_v4(),
            game_id,
            name: "reds".into(),
            access_code: "ABCD1234".into(),
            score: 50,
            created_at: std::time::SystemTime::now(),
        };
        let team_id = team.id;
        store.save_team(team).await.unwrap();

        let participant = ParticipantEntity {
            id: Uuid::new_v4(),
            team_id,
            nickname: "ana".into(),
            connection_id: "conn-1".into(),
            total_score: 120,
            created_at: std::time::SystemTime::now(),
        };
        let participant_id = participant.id;
        store.save_participant(participant).await.unwrap();

        let question_id = Uuid::new_v4();
        store
            .record_answer(AnswerRecordEntity {
                participant_id,
                question_id,
                answer_id: Uuid::new_v4(),
                time_taken_secs: 2.0,
                points_earned: 120,
                created_at: std::time::SystemTime::now(),
            })
            .await
            .unwrap();

        store.reset_game_progress(game_id).await.unwrap();

        let team = store.find_team(team_id).await.unwrap().unwrap();
        assert_eq!(team.score, 0);
        let participant = store.find_participant(participant_id).await.unwrap().unwrap();
        assert_eq!(participant.total_score, 0);
        assert_eq!(store.count_answer_records(question_id).await.unwrap(), 0);
    }
}
