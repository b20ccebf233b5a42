//! Business logic behind the admin REST routes: authoring games, teams,
//! questions, and answer options.

use rand::Rng;
use std::time::SystemTime;
use tracing::info;
use uuid::Uuid;

use crate::{
    dao::models::{AnswerEntity, GameEntity, QuestionEntity, TeamEntity},
    dto::{
        admin::{
            CreateAnswerRequest, CreateGameRequest, CreateQuestionRequest, CreateTeamRequest,
            CreatedResponse, TeamCreatedResponse,
        },
        game::{GameDetail, GameListItem},
        validation::ACCESS_CODE_LENGTH,
    },
    error::ServiceError,
    state::SharedState,
};

const ACCESS_CODE_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const ACCESS_CODE_ATTEMPTS: usize = 16;

/// List every known game, newest first.
pub async fn list_games(state: &SharedState) -> Result<Vec<GameListItem>, ServiceError> {
    let store = state.require_quiz_store().await?;
    let games = store.list_games().await?;
    Ok(games.into_iter().map(Into::into).collect())
}

/// Fetch one game with its questions and teams.
pub async fn get_game(state: &SharedState, id: Uuid) -> Result<GameDetail, ServiceError> {
    let store = state.require_quiz_store().await?;
    let game = store
        .find_game(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("game `{id}` not found")))?;
    let teams = store.teams_for_game(id).await?;
    Ok(GameDetail::from_entities(game, teams))
}

/// Create a fresh game shell in the waiting state.
pub async fn create_game(
    state: &SharedState,
    request: CreateGameRequest,
) -> Result<CreatedResponse, ServiceError> {
    let store = state.require_quiz_store().await?;
    let game = GameEntity::new(request.name);
    let id = game.id;
    store.save_game(game).await?;

    info!(game_id = %id, "game created");
    Ok(CreatedResponse { id })
}

/// Delete a game and everything hanging off it.
///
/// Rejected while the game has a question in flight; end the game first.
pub async fn delete_game(state: &SharedState, id: Uuid) -> Result<(), ServiceError> {
    if state.sessions().snapshot(id).is_some() {
        return Err(ServiceError::InvalidState(
            "cannot delete a game with a question in flight".into(),
        ));
    }

    let store = state.require_quiz_store().await?;
    if !store.delete_game(id).await? {
        return Err(ServiceError::NotFound(format!("game `{id}` not found")));
    }

    info!(game_id = %id, "game deleted");
    Ok(())
}

/// Register a team and hand back its join material.
pub async fn create_team(
    state: &SharedState,
    request: CreateTeamRequest,
) -> Result<TeamCreatedResponse, ServiceError> {
    let store = state.require_quiz_store().await?;
    let game_id = request.game_id;
    store
        .find_game(game_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("game `{game_id}` not found")))?;

    // Codes are short, so collide eventually; retry a few times before
    // giving up.
    let mut access_code = generate_access_code();
    let mut attempts = 1;
    while store
        .find_team_by_access_code(access_code.clone())
        .await?
        .is_some()
    {
        if attempts >= ACCESS_CODE_ATTEMPTS {
            return Err(ServiceError::InvalidState(
                "could not allocate a unique access code".into(),
            ));
        }
        access_code = generate_access_code();
        attempts += 1;
    }

    let team = TeamEntity {
        id: Uuid::new_v4(),
        game_id,
        name: request.name,
        access_code: access_code.clone(),
        score: 0,
        created_at: SystemTime::now(),
    };
    let response = TeamCreatedResponse {
        id: team.id,
        game_id,
        name: team.name.clone(),
        access_code,
        join_url: state.config().join_url(&team.access_code),
    };
    store.save_team(team).await?;

    info!(team_id = %response.id, %game_id, "team created");
    Ok(response)
}

/// Delete a team.
pub async fn delete_team(state: &SharedState, id: Uuid) -> Result<(), ServiceError> {
    let store = state.require_quiz_store().await?;
    if !store.delete_team(id).await? {
        return Err(ServiceError::NotFound(format!("team `{id}` not found")));
    }
    info!(team_id = %id, "team deleted");
    Ok(())
}

/// Author a question for a game.
pub async fn create_question(
    state: &SharedState,
    request: CreateQuestionRequest,
) -> Result<CreatedResponse, ServiceError> {
    let store = state.require_quiz_store().await?;
    let game_id = request.game_id;
    let game = store
        .find_game(game_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("game `{game_id}` not found")))?;

    if game
        .questions
        .iter()
        .any(|question| question.order_index == request.order_index)
    {
        return Err(ServiceError::InvalidInput(format!(
            "game already has a question at order index {}",
            request.order_index
        )));
    }

    let question = QuestionEntity {
        id: Uuid::new_v4(),
        game_id,
        text: request.text,
        time_limit_secs: request.time_limit_secs,
        points: request.points,
        order_index: request.order_index,
        answers: Vec::new(),
    };
    let id = question.id;
    store.save_question(question).await?;

    info!(question_id = %id, %game_id, "question created");
    Ok(CreatedResponse { id })
}

/// Delete a question.
pub async fn delete_question(state: &SharedState, id: Uuid) -> Result<(), ServiceError> {
    let store = state.require_quiz_store().await?;
    if !store.delete_question(id).await? {
        return Err(ServiceError::NotFound(format!("question `{id}` not found")));
    }
    info!(question_id = %id, "question deleted");
    Ok(())
}

/// Author an answer option for a question.
///
/// At most one option per question may be flagged correct; a second one is
/// rejected here rather than trusted to content authors.
pub async fn create_answer(
    state: &SharedState,
    request: CreateAnswerRequest,
) -> Result<CreatedResponse, ServiceError> {
    let store = state.require_quiz_store().await?;
    let question_id = request.question_id;
    let question = store
        .find_question(question_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("question `{question_id}` not found")))?;

    if request.is_correct && question.correct_answer_id().is_some() {
        return Err(ServiceError::InvalidInput(
            "question already has a correct answer".into(),
        ));
    }

    let answer = AnswerEntity {
        id: Uuid::new_v4(),
        question_id,
        text: request.text,
        is_correct: request.is_correct,
    };
    let id = answer.id;
    store.save_answer(answer).await?;

    info!(answer_id = %id, %question_id, "answer option created");
    Ok(CreatedResponse { id })
}

/// Delete an answer option.
pub async fn delete_answer(state: &SharedState, id: Uuid) -> Result<(), ServiceError> {
    let store = state.require_quiz_store().await?;
    if !store.delete_answer(id).await? {
        return Err(ServiceError::NotFound(format!("answer `{id}` not found")));
    }
    info!(answer_id = %id, "answer option deleted");
    Ok(())
}

fn generate_access_code() -> String {
    let mut rng = rand::rng();
    (0..ACCESS_CODE_LENGTH)
        .map(|_| ACCESS_CODE_CHARS[rng.random_range(0..ACCESS_CODE_CHARS.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::validation::validate_access_code;

    #[test]
    fn generated_codes_pass_validation() {
        for _ in 0..64 {
            let code = generate_access_code();
            assert!(validate_access_code(&code).is_ok(), "bad code: {code}");
        }
    }
}
