use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database, IndexModel,
    bson::{Bson, doc},
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::IndexOptions,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{
        MongoAnswerRecordDocument, MongoGameDocument, MongoParticipantDocument,
        MongoTeamDocument, doc_id, status_as_str, uuid_as_binary,
    },
};
use crate::dao::{
    models::{
        AnswerEntity, AnswerRecordEntity, GameEntity, GameListItemEntity, GameStatus,
        ParticipantEntity, QuestionEntity, TeamEntity, TeamScoreSummary,
    },
    quiz_store::QuizStore,
    storage::{StorageError, StorageResult},
};

const GAMES: &str = "games";
const TEAMS: &str = "teams";
const PARTICIPANTS: &str = "participants";
const ANSWER_RECORDS: &str = "answer_records";

const DUPLICATE_KEY_CODE: i32 = 11000;

/// MongoDB-backed [`QuizStore`].
#[derive(Clone)]
pub struct MongoQuizStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

fn is_duplicate_key(err: &MongoError) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => {
            write_error.code == DUPLICATE_KEY_CODE
        }
        _ => false,
    }
}

fn ids_as_bson(ids: impl IntoIterator<Item = Uuid>) -> Vec<Bson> {
    ids.into_iter()
        .map(|id| Bson::Binary(uuid_as_binary(id)))
        .collect()
}

impl MongoQuizStore {
    /// Connect to MongoDB and ensure the indexes the backend relies on.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let database = self.database().await;

        let teams = database.collection::<MongoTeamDocument>(TEAMS);
        let access_code_index = IndexModel::builder()
            .keys(doc! {"access_code": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("team_access_code_idx".to_owned()))
                    .unique(Some(true))
                    .build(),
            )
            .build();
        teams
            .create_index(access_code_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: TEAMS,
                index: "access_code",
                source,
            })?;

        let records = database.collection::<MongoAnswerRecordDocument>(ANSWER_RECORDS);
        // The compound unique index is what makes `record_answer` atomic per
        // (participant, question) pair.
        let record_index = IndexModel::builder()
            .keys(doc! {"participant_id": 1, "question_id": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("record_participant_question_idx".to_owned()))
                    .unique(Some(true))
                    .build(),
            )
            .build();
        records
            .create_index(record_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: ANSWER_RECORDS,
                index: "participant_id,question_id",
                source,
            })?;

        let question_index = IndexModel::builder()
            .keys(doc! {"question_id": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("record_question_idx".to_owned()))
                    .build(),
            )
            .build();
        records
            .create_index(question_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: ANSWER_RECORDS,
                index: "question_id",
                source,
            })?;

        let participants = database.collection::<MongoParticipantDocument>(PARTICIPANTS);
        let team_index = IndexModel::builder()
            .keys(doc! {"team_id": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("participant_team_idx".to_owned()))
                    .build(),
            )
            .build();
        participants
            .create_index(team_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: PARTICIPANTS,
                index: "team_id",
                source,
            })?;

        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn games(&self) -> Collection<MongoGameDocument> {
        self.database().await.collection(GAMES)
    }

    async fn teams(&self) -> Collection<MongoTeamDocument> {
        self.database().await.collection(TEAMS)
    }

    async fn participants(&self) -> Collection<MongoParticipantDocument> {
        self.database().await.collection(PARTICIPANTS)
    }

    async fn records(&self) -> Collection<MongoAnswerRecordDocument> {
        self.database().await.collection(ANSWER_RECORDS)
    }

    async fn replace_game(&self, game: GameEntity) -> MongoResult<()> {
        let id = game.id;
        let document: MongoGameDocument = game.into();
        self.games()
            .await
            .replace_one(doc_id(id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::Write {
                collection: GAMES,
                source,
            })?;
        Ok(())
    }

    async fn load_game(&self, id: Uuid) -> MongoResult<Option<GameEntity>> {
        let document = self
            .games()
            .await
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::Read {
                collection: GAMES,
                source,
            })?;
        Ok(document.map(Into::into))
    }

    async fn load_game_containing_question(
        &self,
        question_id: Uuid,
    ) -> MongoResult<Option<GameEntity>> {
        let document = self
            .games()
            .await
            .find_one(doc! {"questions.id": uuid_as_binary(question_id)})
            .await
            .map_err(|source| MongoDaoError::Read {
                collection: GAMES,
                source,
            })?;
        Ok(document.map(Into::into))
    }

    async fn load_game_containing_answer(
        &self,
        answer_id: Uuid,
    ) -> MongoResult<Option<GameEntity>> {
        let document = self
            .games()
            .await
            .find_one(doc! {"questions.answers.id": uuid_as_binary(answer_id)})
            .await
            .map_err(|source| MongoDaoError::Read {
                collection: GAMES,
                source,
            })?;
        Ok(document.map(Into::into))
    }

    async fn team_ids_for_game(&self, game_id: Uuid) -> MongoResult<Vec<Uuid>> {
        let teams: Vec<MongoTeamDocument> = self
            .teams()
            .await
            .find(doc! {"game_id": uuid_as_binary(game_id)})
            .await
            .map_err(|source| MongoDaoError::Read {
                collection: TEAMS,
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::Read {
                collection: TEAMS,
                source,
            })?;
        Ok(teams
            .into_iter()
            .map(|doc| TeamEntity::from(doc).id)
            .collect())
    }

    async fn participants_for_teams(
        &self,
        team_ids: &[Uuid],
    ) -> MongoResult<Vec<ParticipantEntity>> {
        let filter = doc! {"team_id": {"$in": ids_as_bson(team_ids.iter().copied())}};
        let documents: Vec<MongoParticipantDocument> = self
            .participants()
            .await
            .find(filter)
            .await
            .map_err(|source| MongoDaoError::Read {
                collection: PARTICIPANTS,
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::Read {
                collection: PARTICIPANTS,
                source,
            })?;
        Ok(documents.into_iter().map(Into::into).collect())
    }
}

impl QuizStore for MongoQuizStore {
    fn save_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.replace_game(game).await.map_err(Into::into) })
    }

    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.load_game(id).await.map_err(Into::into) })
    }

    fn list_games(&self) -> BoxFuture<'static, StorageResult<Vec<GameListItemEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let documents: Vec<MongoGameDocument> = store
                .games()
                .await
                .find(doc! {})
                .sort(doc! {"created_at": -1})
                .await
                .map_err(|source| MongoDaoError::Read {
                    collection: GAMES,
                    source,
                })?
                .try_collect()
                .await
                .map_err(|source| MongoDaoError::Read {
                    collection: GAMES,
                    source,
                })?;

            Ok(documents
                .into_iter()
                .map(|doc| GameListItemEntity::from(&GameEntity::from(doc)))
                .collect())
        })
    }

    fn delete_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let result = store
                .games()
                .await
                .delete_one(doc_id(id))
                .await
                .map_err(|source| MongoDaoError::Delete {
                    collection: GAMES,
                    source,
                })?;

            // Orphaned teams are useless without their game.
            store
                .teams()
                .await
                .delete_many(doc! {"game_id": uuid_as_binary(id)})
                .await
                .map_err(|source| MongoDaoError::Delete {
                    collection: TEAMS,
                    source,
                })?;

            Ok(result.deleted_count > 0)
        })
    }

    fn update_game_status(
        &self,
        id: Uuid,
        status: GameStatus,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .games()
                .await
                .update_one(doc_id(id), doc! {"$set": {"status": status_as_str(status)}})
                .await
                .map_err(|source| MongoDaoError::Write {
                    collection: GAMES,
                    source,
                })?;
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
            store
                .games()
                .await
                .update_one(
                    doc_id(id),
                    doc! {"$set": {"current_question_index": index as i64}},
                )
                .await
                .map_err(|source| MongoDaoError::Write {
                    collection: GAMES,
                    source,
                })?;
            Ok(())
        })
    }

    fn save_team(&self, team: TeamEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let id = team.id;
            let document: MongoTeamDocument = team.into();
            store
                .teams()
                .await
                .replace_one(doc_id(id), &document)
                .upsert(true)
                .await
                .map_err(|source| MongoDaoError::Write {
                    collection: TEAMS,
                    source,
                })?;
            Ok(())
        })
    }

    fn find_team(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<TeamEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let document = store
                .teams()
                .await
                .find_one(doc_id(id))
                .await
                .map_err(|source| MongoDaoError::Read {
                    collection: TEAMS,
                    source,
                })?;
            Ok(document.map(Into::into))
        })
    }

    fn find_team_by_access_code(
        &self,
        access_code: String,
    ) -> BoxFuture<'static, StorageResult<Option<TeamEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let document = store
                .teams()
                .await
                .find_one(doc! {"access_code": access_code})
                .await
                .map_err(|source| MongoDaoError::Read {
                    collection: TEAMS,
                    source,
                })?;
            Ok(document.map(Into::into))
        })
    }

    fn teams_for_game(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<TeamEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let documents: Vec<MongoTeamDocument> = store
                .teams()
                .await
                .find(doc! {"game_id": uuid_as_binary(game_id)})
                .sort(doc! {"created_at": 1})
                .await
                .map_err(|source| MongoDaoError::Read {
                    collection: TEAMS,
                    source,
                })?
                .try_collect()
                .await
                .map_err(|source| MongoDaoError::Read {
                    collection: TEAMS,
                    source,
                })?;
            Ok(documents.into_iter().map(Into::into).collect())
        })
    }

    fn delete_team(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let result = store
                .teams()
                .await
                .delete_one(doc_id(id))
                .await
                .map_err(|source| MongoDaoError::Delete {
                    collection: TEAMS,
                    source,
                })?;
            Ok(result.deleted_count > 0)
        })
    }

    fn update_team_score(&self, id: Uuid, score: i32) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .teams()
                .await
                .update_one(doc_id(id), doc! {"$set": {"score": score}})
                .await
                .map_err(|source| MongoDaoError::Write {
                    collection: TEAMS,
                    source,
                })?;
            Ok(())
        })
    }

    fn save_question(&self, question: QuestionEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let game_id = question.game_id;
            let Some(mut game) = store.load_game(game_id).await? else {
                return Err(StorageError::Inconsistent {
                    message: format!("game `{game_id}` not found for new question"),
                });
            };
            game.questions.push(question);
            game.questions.sort_by_key(|q| q.order_index);
            store.replace_game(game).await.map_err(Into::into)
        })
    }

    fn find_question(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<QuestionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let Some(game) = store.load_game_containing_question(id).await? else {
                return Ok(None);
            };
            Ok(game.questions.into_iter().find(|q| q.id == id))
        })
    }

    fn delete_question(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let Some(mut game) = store.load_game_containing_question(id).await? else {
                return Ok(false);
            };
            game.questions.retain(|question| question.id != id);
            store.replace_game(game).await?;
            Ok(true)
        })
    }

    fn save_answer(&self, answer: AnswerEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let question_id = answer.question_id;
            let Some(mut game) = store.load_game_containing_question(question_id).await? else {
                return Err(StorageError::Inconsistent {
                    message: format!("question `{question_id}` not found for new answer"),
                });
            };
            if let Some(question) = game
                .questions
                .iter_mut()
                .find(|question| question.id == question_id)
            {
                question.answers.push(answer);
            }
            store.replace_game(game).await.map_err(Into::into)
        })
    }

    fn find_answer(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<AnswerEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let Some(game) = store.load_game_containing_answer(id).await? else {
                return Ok(None);
            };
            Ok(game
                .questions
                .into_iter()
                .flat_map(|question| question.answers)
                .find(|answer| answer.id == id))
        })
    }

    fn delete_answer(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let Some(mut game) = store.load_game_containing_answer(id).await? else {
                return Ok(false);
            };
            for question in game.questions.iter_mut() {
                question.answers.retain(|answer| answer.id != id);
            }
            store.replace_game(game).await?;
            Ok(true)
        })
    }

    fn save_participant(
        &self,
        participant: ParticipantEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let id = participant.id;
            let document: MongoParticipantDocument = participant.into();
            store
                .participants()
                .await
                .replace_one(doc_id(id), &document)
                .upsert(true)
                .await
                .map_err(|source| MongoDaoError::Write {
                    collection: PARTICIPANTS,
                    source,
                })?;
            Ok(())
        })
    }

    fn find_participant(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let document = store
                .participants()
                .await
                .find_one(doc_id(id))
                .await
                .map_err(|source| MongoDaoError::Read {
                    collection: PARTICIPANTS,
                    source,
                })?;
            Ok(document.map(Into::into))
        })
    }

    fn add_participant_points(
        &self,
        id: Uuid,
        points: i32,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .participants()
                .await
                .update_one(doc_id(id), doc! {"$inc": {"total_score": points}})
                .await
                .map_err(|source| MongoDaoError::Write {
                    collection: PARTICIPANTS,
                    source,
                })?;
            Ok(())
        })
    }

    fn record_answer(
        &self,
        record: AnswerRecordEntity,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let document: MongoAnswerRecordDocument = record.into();
            match store.records().await.insert_one(&document).await {
                Ok(_) => Ok(true),
                // The unique compound index turns a duplicate submission
                // into a detectable write error instead of a second row.
                Err(err) if is_duplicate_key(&err) => Ok(false),
                Err(source) => Err(MongoDaoError::Write {
                    collection: ANSWER_RECORDS,
                    source,
                }
                .into()),
            }
        })
    }

    fn count_answer_records(
        &self,
        question_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<u64>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .records()
                .await
                .count_documents(doc! {"question_id": uuid_as_binary(question_id)})
                .await
                .map_err(|source| {
                    MongoDaoError::Read {
                        collection: ANSWER_RECORDS,
                        source,
                    }
                    .into()
                })
        })
    }

    fn answer_records_for_question(
        &self,
        question_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<AnswerRecordEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let documents: Vec<MongoAnswerRecordDocument> = store
                .records()
                .await
                .find(doc! {"question_id": uuid_as_binary(question_id)})
                .await
                .map_err(|source| MongoDaoError::Read {
                    collection: ANSWER_RECORDS,
                    source,
                })?
                .try_collect()
                .await
                .map_err(|source| MongoDaoError::Read {
                    collection: ANSWER_RECORDS,
                    source,
                })?;
            Ok(documents.into_iter().map(Into::into).collect())
        })
    }

    fn team_score_summary(
        &self,
        team_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<TeamScoreSummary>> {
        let store = self.clone();
        Box::pin(async move {
            let members = store.participants_for_teams(&[team_id]).await?;
            let mut summary = TeamScoreSummary::default();
            for participant in &members {
                summary.points_sum += i64::from(participant.total_score);
            }

            if members.is_empty() {
                return Ok(summary);
            }

            let member_ids: Vec<Uuid> = members.iter().map(|p| p.id).collect();
            let records: Vec<MongoAnswerRecordDocument> = store
                .records()
                .await
                .find(doc! {"participant_id": {"$in": ids_as_bson(member_ids)}})
                .await
                .map_err(|source| MongoDaoError::Read {
                    collection: ANSWER_RECORDS,
                    source,
                })?
                .try_collect()
                .await
                .map_err(|source| MongoDaoError::Read {
                    collection: ANSWER_RECORDS,
                    source,
                })?;

            let mut answering = std::collections::HashSet::new();
            for record in records.into_iter().map(AnswerRecordEntity::from) {
                answering.insert(record.participant_id);
                summary.total_answers += 1;
                if record.points_earned > 0 {
                    summary.correct_answers += 1;
                }
            }
            summary.answering_participants = answering.len() as u64;

            Ok(summary)
        })
    }

    fn reset_game_progress(&self, game_id: Uuid) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let team_ids = store.team_ids_for_game(game_id).await?;
            if team_ids.is_empty() {
                return Ok(());
            }

            store
                .teams()
                .await
                .update_many(
                    doc! {"game_id": uuid_as_binary(game_id)},
                    doc! {"$set": {"score": 0}},
                )
                .await
                .map_err(|source| MongoDaoError::Write {
                    collection: TEAMS,
                    source,
                })?;

            let members = store.participants_for_teams(&team_ids).await?;
            let member_ids: Vec<Uuid> = members.iter().map(|p| p.id).collect();

            store
                .participants()
                .await
                .update_many(
                    doc! {"team_id": {"$in": ids_as_bson(team_ids)}},
                    doc! {"$set": {"total_score": 0}},
                )
                .await
                .map_err(|source| MongoDaoError::Write {
                    collection: PARTICIPANTS,
                    source,
                })?;

            if !member_ids.is_empty() {
                store
                    .records()
                    .await
                    .delete_many(doc! {"participant_id": {"$in": ids_as_bson(member_ids)}})
                    .await
                    .map_err(|source| MongoDaoError::Delete {
                        collection: ANSWER_RECORDS,
                        source,
                    })?;
            }

            Ok(())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
