//! The session orchestrator: the per-game state machine coordinating admin
//! commands, participant submissions, timers, scoring, and ranking.
//!
//! Lifecycle commands for one game serialize through the game's gate;
//! submission-driven close scheduling serializes through the registry's
//! `Open -> Closing` swap. Timer callbacks capture the question id they were
//! scheduled for and re-validate registry state at fire time, so stale
//! timers are safe no-ops.

use std::{collections::HashMap, time::SystemTime};

use axum::extract::ws::Message;
use tokio::{sync::mpsc, time::sleep};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dao::models::{AnswerRecordEntity, GameEntity, GameStatus, ParticipantEntity},
    dto::ws::{AnswerStat, QuestionSnapshot, ServerMessage},
    error::ServiceError,
    services::{
        ranking::{self, TeamStanding},
        scoring, ws_events,
    },
    state::{SharedState, audience::ParticipantConnection, session::QuestionPhase},
};

/// Outcome of a submission attempt, mapped to reply events by the socket
/// layer. Timing rejections are outcomes, not errors: they are reported to
/// the submitter as neutral failures and never logged as abuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Answer recorded and scored.
    Registered {
        /// Ground truth, forwarded to the admin group only.
        is_correct: bool,
    },
    /// The participant already has a record for this question.
    AlreadyAnswered,
    /// Submission arrived outside the grace window, or for a question that
    /// is no longer the live one.
    TooLate,
    /// No question is open for the participant's game.
    NoQuestionOpen,
}

/// Start (or restart) a game: reset all progress, set status active, open
/// question 0.
///
/// Rejected while a question is open or closing for the game. Restarting a
/// finished game is allowed and clears prior answer records and totals.
pub async fn start_game(state: &SharedState, game_id: Uuid) -> Result<(), ServiceError> {
    let gate = state.game_gate(game_id);
    let _guard = gate.lock().await;

    let store = state.require_quiz_store().await?;
    let game = store
        .find_game(game_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("game `{game_id}` not found")))?;

    if game.questions.is_empty() {
        return Err(ServiceError::InvalidState(
            "cannot start a game without questions".into(),
        ));
    }

    if let Some(live) = state.sessions().snapshot(game_id) {
        if live.phase != QuestionPhase::Closed {
            return Err(ServiceError::InvalidState(
                "a question is still open for this game".into(),
            ));
        }
    }

    store.reset_game_progress(game_id).await?;
    store.update_game_status(game_id, GameStatus::Active).await?;
    store.update_current_question(game_id, 0).await?;

    ws_events::broadcast_all_groups(state, game_id, &ServerMessage::GameStarted);
    info!(%game_id, "game started");

    open_question_from(state, &game, 0)
}

/// Open the question at `index`, broadcasting it and installing the live
/// registry entry.
fn open_question_from(
    state: &SharedState,
    game: &GameEntity,
    index: usize,
) -> Result<(), ServiceError> {
    let question = game.question_at(index).ok_or_else(|| {
        ServiceError::NotFound(format!(
            "game `{}` has no question at index {index}",
            game.id
        ))
    })?;

    let snapshot = QuestionSnapshot::public(question, index + 1, game.questions.len());
    let admin_snapshot = snapshot.clone().with_ground_truth(question);

    ws_events::broadcast_participants(
        state,
        game.id,
        &ServerMessage::QuestionNew(snapshot.clone()),
    );
    ws_events::broadcast_display(state, game.id, &ServerMessage::QuestionNew(snapshot));
    // The admin copy carries the correct answer id: the admin needs ground
    // truth to run the show.
    ws_events::broadcast_admin(state, game.id, &ServerMessage::QuestionNew(admin_snapshot));

    state
        .sessions()
        .open_question(game.id, question.id, index, question.time_limit_secs);

    info!(
        game_id = %game.id,
        question = index + 1,
        total = game.questions.len(),
        "question opened"
    );

    Ok(())
}

/// Re-broadcast the current question to the display with the remaining
/// time. The original start instant stays authoritative for scoring; when
/// the clock already ran out this routes to a close instead.
pub async fn reshow_question(state: &SharedState, game_id: Uuid) -> Result<(), ServiceError> {
    let Some(live) = state.sessions().snapshot(game_id) else {
        return Ok(());
    };

    if live.elapsed_secs() >= f64::from(live.time_limit_secs) {
        return close_question(state, game_id).await;
    }

    let store = state.require_quiz_store().await?;
    let game = store
        .find_game(game_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("game `{game_id}` not found")))?;
    let Some(question) = game.question_at(live.question_index) else {
        return Ok(());
    };

    let snapshot = QuestionSnapshot::public(question, live.question_index + 1, game.questions.len())
        .with_remaining_time(live.remaining_secs());
    ws_events::broadcast_display(state, game_id, &ServerMessage::QuestionNew(snapshot));

    Ok(())
}

/// Record one participant's submission for the open question.
///
/// Validation failures (unknown ids) are errors scoped to the submitter;
/// timing failures are [`SubmitOutcome`]s. On success the admin group is
/// notified and the auto-close check is spawned.
pub async fn submit_answer(
    state: &SharedState,
    game_id: Uuid,
    participant_id: Uuid,
    question_id: Uuid,
    answer_id: Uuid,
) -> Result<SubmitOutcome, ServiceError> {
    let store = state.require_quiz_store().await?;

    let Some(live) = state.sessions().snapshot(game_id) else {
        return Ok(SubmitOutcome::NoQuestionOpen);
    };
    if live.question_id != question_id {
        // Submission for a question that has already advanced.
        return Ok(SubmitOutcome::TooLate);
    }

    let elapsed = live.elapsed_secs();
    if live.past_deadline(state.config().grace_period()) {
        return Ok(SubmitOutcome::TooLate);
    }

    let participant = store
        .find_participant(participant_id)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("participant `{participant_id}` not found"))
        })?;
    let answer = store
        .find_answer(answer_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("answer `{answer_id}` not found")))?;
    if answer.question_id != question_id {
        return Err(ServiceError::InvalidInput(
            "answer does not belong to the submitted question".into(),
        ));
    }
    let question = store
        .find_question(question_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("question `{question_id}` not found")))?;

    let points_earned = scoring::score(
        answer.is_correct,
        elapsed,
        question.time_limit_secs,
        question.points,
    );

    let inserted = store
        .record_answer(AnswerRecordEntity {
            participant_id: participant.id,
            question_id,
            answer_id,
            time_taken_secs: elapsed,
            points_earned,
            created_at: SystemTime::now(),
        })
        .await?;
    if !inserted {
        return Ok(SubmitOutcome::AlreadyAnswered);
    }

    store.add_participant_points(participant.id, points_earned).await?;

    ws_events::broadcast_admin(
        state,
        game_id,
        &ServerMessage::ParticipantAnswered {
            participant_id: participant.id,
            is_correct: answer.is_correct,
        },
    );

    info!(
        %game_id,
        participant_id = %participant.id,
        %question_id,
        is_correct = answer.is_correct,
        points_earned,
        "answer recorded"
    );

    let check_state = state.clone();
    tokio::spawn(async move {
        run_auto_close_check(check_state, game_id, question_id).await;
    });

    Ok(SubmitOutcome::Registered {
        is_correct: answer.is_correct,
    })
}

/// Close the question early once every connected participant has answered.
///
/// No-op unless the registry entry still refers to `question_id` and is
/// open; stale checks from a prior question land here and are ignored.
/// The `Open -> Closing` swap has a single winner, so concurrent
/// submissions cannot double-schedule the close. The scheduled close
/// re-validates at fire time.
pub async fn run_auto_close_check(state: SharedState, game_id: Uuid, question_id: Uuid) {
    if !state.sessions().is_open(game_id, question_id) {
        debug!(%game_id, %question_id, "close check against stale question; ignoring");
        return;
    }

    let Ok(store) = state.require_quiz_store().await else {
        return;
    };

    let online = state.audiences().connected_participants(game_id);
    let answered = match store.count_answer_records(question_id).await {
        Ok(count) => count,
        Err(err) => {
            warn!(%game_id, error = %err, "close check could not count answers");
            return;
        }
    };

    debug!(%game_id, online, answered, "close check");

    if online == 0 || answered < online {
        return;
    }

    if !state.sessions().begin_close(game_id, question_id) {
        // Another submission already scheduled the close.
        return;
    }

    info!(%game_id, %question_id, "all connected participants answered; closing shortly");

    let delay = state.config().auto_close_delay();
    tokio::spawn(async move {
        sleep(delay).await;

        // The question may have advanced (or been closed by the admin)
        // while we paused for UX.
        if !state.sessions().is_closing(game_id, question_id) {
            debug!(%game_id, %question_id, "scheduled close is stale; ignoring");
            return;
        }

        if let Err(err) = close_question(&state, game_id).await {
            warn!(%game_id, error = %err, "scheduled close failed");
        }
    });
}

/// Close the current question: broadcast the vote distribution to the
/// display and fan out per-participant results.
///
/// No-op without a live entry. The fan-out is per-recipient, not a
/// broadcast: each participant's result differs.
pub async fn close_question(state: &SharedState, game_id: Uuid) -> Result<(), ServiceError> {
    let Some(live) = state.sessions().snapshot(game_id) else {
        return Ok(());
    };
    let question_id = live.question_id;

    let store = state.require_quiz_store().await?;
    let question = store
        .find_question(question_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("question `{question_id}` not found")))?;
    let records = store.answer_records_for_question(question_id).await?;

    if !state.sessions().mark_closed(game_id, question_id) {
        // The game advanced while we were reading; the new question owns
        // the entry now.
        return Ok(());
    }

    let mut votes: HashMap<Uuid, u64> = HashMap::new();
    for record in &records {
        *votes.entry(record.answer_id).or_default() += 1;
    }
    let total_votes = records.len() as u64;

    let distribution: Vec<AnswerStat> = question
        .answers
        .iter()
        .map(|answer| {
            let count = votes.get(&answer.id).copied().unwrap_or(0);
            let percent = if total_votes == 0 {
                0
            } else {
                ((count as f64 / total_votes as f64) * 100.0).round() as u32
            };
            AnswerStat {
                answer_id: answer.id,
                text: answer.text.clone(),
                is_correct: answer.is_correct,
                count,
                percent,
            }
        })
        .collect();

    ws_events::broadcast_display(
        state,
        game_id,
        &ServerMessage::QuestionStats {
            total_votes,
            distribution,
        },
    );

    let by_participant: HashMap<Uuid, &AnswerRecordEntity> = records
        .iter()
        .map(|record| (record.participant_id, record))
        .collect();

    for connection in state.audiences().participants_of_game(game_id) {
        let result = match by_participant.get(&connection.participant_id) {
            Some(record) => ServerMessage::AnswerResult {
                is_correct: record.points_earned > 0,
                points_earned: record.points_earned,
                time_taken: Some(record.time_taken_secs),
                message: None,
            },
            None => ServerMessage::AnswerResult {
                is_correct: false,
                points_earned: 0,
                time_taken: None,
                message: Some("time's up".into()),
            },
        };
        ws_events::send_to_connection(&connection.tx, &result, "answer result");
    }

    info!(%game_id, %question_id, total_votes, "question closed");

    Ok(())
}

/// Open the next question, or finish the game when none remains.
pub async fn advance_question(state: &SharedState, game_id: Uuid) -> Result<(), ServiceError> {
    let gate = state.game_gate(game_id);
    let _guard = gate.lock().await;

    let store = state.require_quiz_store().await?;
    let game = store
        .find_game(game_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("game `{game_id}` not found")))?;

    let next_index = game.current_question_index + 1;
    if next_index < game.questions.len() {
        store.update_current_question(game_id, next_index).await?;
        // Installing the next entry invalidates any auto-close timer still
        // pending for the previous question.
        open_question_from(state, &game, next_index)
    } else {
        finish_game_locked(state, game_id).await
    }
}

/// End the game immediately (admin command).
pub async fn end_game(state: &SharedState, game_id: Uuid) -> Result<(), ServiceError> {
    let gate = state.game_gate(game_id);
    let _guard = gate.lock().await;
    finish_game_locked(state, game_id).await
}

async fn finish_game_locked(state: &SharedState, game_id: Uuid) -> Result<(), ServiceError> {
    let store = state.require_quiz_store().await?;
    store
        .update_game_status(game_id, GameStatus::Finished)
        .await?;

    ws_events::broadcast_all_groups(state, game_id, &ServerMessage::GameEnded);
    state.sessions().remove(game_id);

    info!(%game_id, "game finished");
    Ok(())
}

/// Recompute team standings, persist the refreshed averages, and broadcast
/// the dense ranking to participants and display.
///
/// `isFinal` is set authoritatively from the game status: the display
/// treats an ended game as final regardless, but the server remains the
/// single source of truth.
pub async fn show_ranking(state: &SharedState, game_id: Uuid) -> Result<(), ServiceError> {
    let store = state.require_quiz_store().await?;
    let game = store
        .find_game(game_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("game `{game_id}` not found")))?;
    let is_final = game.status == GameStatus::Finished;

    let teams = store.teams_for_game(game_id).await?;
    let mut standings = Vec::with_capacity(teams.len());
    for team in teams {
        let summary = store.team_score_summary(team.id).await?;
        let score = summary.average_score();
        store.update_team_score(team.id, score).await?;
        standings.push(TeamStanding {
            id: team.id,
            name: team.name,
            score,
            accuracy: summary.accuracy_percent(),
        });
    }

    let message = ServerMessage::RankingShow {
        teams: ranking::rank(standings),
        is_final,
    };
    ws_events::broadcast_participants(state, game_id, &message);
    ws_events::broadcast_display(state, game_id, &message);

    info!(%game_id, is_final, "ranking broadcast");
    Ok(())
}

/// Enroll a fresh participant for a team and register its socket.
///
/// Every join creates a new participant row (reconnects never resume an
/// identity); the admin group is notified and the display's live count
/// refreshed.
pub async fn join_participant(
    state: &SharedState,
    team_id: Uuid,
    nickname: String,
    connection_id: Uuid,
    tx: mpsc::UnboundedSender<Message>,
) -> Result<(ParticipantEntity, Uuid), ServiceError> {
    let store = state.require_quiz_store().await?;
    let team = store
        .find_team(team_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("team `{team_id}` not found")))?;

    let participant = ParticipantEntity {
        id: Uuid::new_v4(),
        team_id,
        nickname: nickname.clone(),
        connection_id: connection_id.to_string(),
        total_score: 0,
        created_at: SystemTime::now(),
    };
    store.save_participant(participant.clone()).await?;

    ws_events::broadcast_admin(
        state,
        team.game_id,
        &ServerMessage::ParticipantNew {
            participant_id: participant.id,
            team_id,
            nickname,
        },
    );

    state.audiences().register_participant(ParticipantConnection {
        connection_id,
        participant_id: participant.id,
        game_id: team.game_id,
        tx,
    });

    info!(
        game_id = %team.game_id,
        participant_id = %participant.id,
        nickname = %participant.nickname,
        "participant joined"
    );

    broadcast_live_count(state, team.game_id);

    Ok((participant, team.game_id))
}

/// Bookkeeping after a participant socket left: refresh the live count and,
/// when a question is in flight, re-run the close check after a settle
/// delay so in-flight leaves are not undercounted.
pub fn handle_participant_disconnect(state: SharedState, connection: ParticipantConnection) {
    let game_id = connection.game_id;

    info!(
        %game_id,
        participant_id = %connection.participant_id,
        "participant disconnected"
    );

    broadcast_live_count(&state, game_id);

    let Some(live) = state.sessions().snapshot(game_id) else {
        return;
    };
    let question_id = live.question_id;
    let settle = state.config().disconnect_settle();

    tokio::spawn(async move {
        sleep(settle).await;
        run_auto_close_check(state, game_id, question_id).await;
    });
}

/// Push the current connected-participant count to the display group.
pub fn broadcast_live_count(state: &SharedState, game_id: Uuid) {
    let count = state.audiences().connected_participants(game_id);
    ws_events::broadcast_display(state, game_id, &ServerMessage::UpdateCount { count });
}
