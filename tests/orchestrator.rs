//! End-to-end orchestrator tests over the in-memory store, with the tokio
//! clock paused so deadlines and scheduled closes are deterministic.

use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};

use axum::extract::ws::Message;
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use livequiz_back::{
    config::AppConfig,
    dao::{
        models::{AnswerEntity, GameEntity, GameStatus, QuestionEntity, TeamEntity},
        quiz_store::{QuizStore, memory::MemoryQuizStore},
    },
    dto::ws::{ServerMessage, WsPayload},
    services::session_service::{self, SubmitOutcome},
    state::{AppState, SharedState},
};

struct Fixture {
    state: SharedState,
    store: MemoryQuizStore,
    game_id: Uuid,
    team_id: Uuid,
    question_ids: Vec<Uuid>,
    correct_ids: Vec<Uuid>,
}

/// Seed a game with `question_count` questions (base 1000 points, 20 s
/// limit, two options each with the first correct) and one team.
async fn fixture(question_count: usize) -> Fixture {
    let state = AppState::new(AppConfig::default());
    let store = MemoryQuizStore::new();
    state
        .install_quiz_store(Arc::new(store.clone()))
        .await;

    let mut game = GameEntity::new("friday night trivia".into());
    let game_id = game.id;
    let mut question_ids = Vec::new();
    let mut correct_ids = Vec::new();

    for order_index in 0..question_count {
        let question_id = Uuid::new_v4();
        question_ids.push(question_id);
        let correct_id = Uuid::new_v4();
        correct_ids.push(correct_id);
        let answers = vec![
            AnswerEntity {
                id: correct_id,
                question_id,
                text: "right".into(),
                is_correct: true,
            },
            AnswerEntity {
                id: Uuid::new_v4(),
                question_id,
                text: "wrong".into(),
                is_correct: false,
            },
        ];
        game.questions.push(QuestionEntity {
            id: question_id,
            game_id,
            text: format!("question {order_index}"),
            time_limit_secs: 20,
            points: 1000,
            order_index: order_index as u32,
            answers,
        });
    }

    store.save_game(game).await.unwrap();

    let team_id = Uuid::new_v4();
    store
        .save_team(TeamEntity {
            id: team_id,
            game_id,
            name: "night owls".into(),
            access_code: "QZ4K9H2M".into(),
            score: 0,
            created_at: SystemTime::now(),
        })
        .await
        .unwrap();

    Fixture {
        state,
        store,
        game_id,
        team_id,
        question_ids,
        correct_ids,
    }
}

struct JoinedParticipant {
    id: Uuid,
    rx: mpsc::UnboundedReceiver<Message>,
}

async fn join(fixture: &Fixture, nickname: &str) -> JoinedParticipant {
    let (tx, rx) = mpsc::unbounded_channel();
    let (participant, game_id) = session_service::join_participant(
        &fixture.state,
        fixture.team_id,
        nickname.into(),
        Uuid::new_v4(),
        tx,
    )
    .await
    .unwrap();
    assert_eq!(game_id, fixture.game_id);
    JoinedParticipant {
        id: participant.id,
        rx,
    }
}

fn correct_answer(fixture: &Fixture, question: usize) -> Uuid {
    fixture.correct_ids[question]
}

/// Let spawned tasks and pending timers run; the paused clock auto-advances
/// while the runtime is idle.
async fn settle(duration: Duration) {
    tokio::time::sleep(duration).await;
}

fn drain_group(rx: &mut broadcast::Receiver<WsPayload>) -> Vec<ServerMessage> {
    let mut messages = Vec::new();
    while let Ok(payload) = rx.try_recv() {
        messages.push(serde_json::from_str(&payload.data).unwrap());
    }
    messages
}

fn drain_direct(rx: &mut mpsc::UnboundedReceiver<Message>) -> Vec<ServerMessage> {
    let mut messages = Vec::new();
    while let Ok(message) = rx.try_recv() {
        if let Message::Text(text) = message {
            messages.push(serde_json::from_str(&text).unwrap());
        }
    }
    messages
}

#[tokio::test(start_paused = true)]
async fn speed_bonus_rewards_faster_correct_answers() {
    let fixture = fixture(1).await;
    let fast = join(&fixture, "ana").await;
    let slow = join(&fixture, "bea").await;

    session_service::start_game(&fixture.state, fixture.game_id)
        .await
        .unwrap();

    let question_id = fixture.question_ids[0];
    let answer_id = correct_answer(&fixture, 0);

    let outcome = session_service::submit_answer(
        &fixture.state,
        fixture.game_id,
        fast.id,
        question_id,
        answer_id,
    )
    .await
    .unwrap();
    assert_eq!(outcome, SubmitOutcome::Registered { is_correct: true });

    settle(Duration::from_secs(10)).await;

    let outcome = session_service::submit_answer(
        &fixture.state,
        fixture.game_id,
        slow.id,
        question_id,
        answer_id,
    )
    .await
    .unwrap();
    assert_eq!(outcome, SubmitOutcome::Registered { is_correct: true });

    let fast_total = fixture
        .store
        .find_participant(fast.id)
        .await
        .unwrap()
        .unwrap()
        .total_score;
    let slow_total = fixture
        .store
        .find_participant(slow.id)
        .await
        .unwrap()
        .unwrap()
        .total_score;

    // base 1000 + floor(ratio * 500): full bonus at t=0, half at t=10.
    assert_eq!(fast_total, 1500);
    assert_eq!(slow_total, 1250);
}

#[tokio::test(start_paused = true)]
async fn everyone_answered_closes_the_question_after_a_pause() {
    let fixture = fixture(1).await;
    let mut player = join(&fixture, "ana").await;

    let mut display = fixture
        .state
        .audiences()
        .channels(fixture.game_id)
        .display
        .subscribe();

    session_service::start_game(&fixture.state, fixture.game_id)
        .await
        .unwrap();

    let question_id = fixture.question_ids[0];
    session_service::submit_answer(
        &fixture.state,
        fixture.game_id,
        player.id,
        question_id,
        correct_answer(&fixture, 0),
    )
    .await
    .unwrap();

    // The check runs, sees 1/1 answered, and schedules the close 1 s out.
    settle(Duration::from_millis(1_500)).await;

    let stats: Vec<_> = drain_group(&mut display)
        .into_iter()
        .filter(|message| matches!(message, ServerMessage::QuestionStats { .. }))
        .collect();
    assert_eq!(stats.len(), 1, "expected exactly one stats broadcast");

    match &stats[0] {
        ServerMessage::QuestionStats {
            total_votes,
            distribution,
        } => {
            assert_eq!(*total_votes, 1);
            // Zero-vote options are part of the distribution.
            assert_eq!(distribution.len(), 2);
            let correct_line = distribution.iter().find(|line| line.is_correct).unwrap();
            assert_eq!(correct_line.count, 1);
            assert_eq!(correct_line.percent, 100);
            let other_line = distribution.iter().find(|line| !line.is_correct).unwrap();
            assert_eq!(other_line.count, 0);
            assert_eq!(other_line.percent, 0);
        }
        other => panic!("unexpected message: {other:?}"),
    }

    // The participant got an individually addressed result.
    let results = drain_direct(&mut player.rx);
    assert!(results.iter().any(|message| matches!(
        message,
        ServerMessage::AnswerResult {
            is_correct: true,
            points_earned: 1500,
            ..
        }
    )));
}

#[tokio::test(start_paused = true)]
async fn close_check_is_idempotent_after_the_question_closed() {
    let fixture = fixture(1).await;
    let player = join(&fixture, "ana").await;

    let mut display = fixture
        .state
        .audiences()
        .channels(fixture.game_id)
        .display
        .subscribe();

    session_service::start_game(&fixture.state, fixture.game_id)
        .await
        .unwrap();

    let question_id = fixture.question_ids[0];
    session_service::submit_answer(
        &fixture.state,
        fixture.game_id,
        player.id,
        question_id,
        correct_answer(&fixture, 0),
    )
    .await
    .unwrap();

    settle(Duration::from_millis(1_500)).await;

    // Re-running the check after the close must not re-send stats.
    session_service::run_auto_close_check(fixture.state.clone(), fixture.game_id, question_id)
        .await;
    session_service::run_auto_close_check(fixture.state.clone(), fixture.game_id, question_id)
        .await;
    settle(Duration::from_millis(1_500)).await;

    let stats_count = drain_group(&mut display)
        .into_iter()
        .filter(|message| matches!(message, ServerMessage::QuestionStats { .. }))
        .count();
    assert_eq!(stats_count, 1);
}

#[tokio::test(start_paused = true)]
async fn stale_close_timer_is_a_no_op_after_advancing() {
    let fixture = fixture(2).await;
    let player = join(&fixture, "ana").await;

    let mut display = fixture
        .state
        .audiences()
        .channels(fixture.game_id)
        .display
        .subscribe();

    session_service::start_game(&fixture.state, fixture.game_id)
        .await
        .unwrap();

    let first_question = fixture.question_ids[0];
    session_service::submit_answer(
        &fixture.state,
        fixture.game_id,
        player.id,
        first_question,
        correct_answer(&fixture, 0),
    )
    .await
    .unwrap();

    // Give the check a chance to schedule the close, but advance the game
    // before the timer fires.
    tokio::task::yield_now().await;
    session_service::advance_question(&fixture.state, fixture.game_id)
        .await
        .unwrap();

    settle(Duration::from_secs(3)).await;

    let messages = drain_group(&mut display);
    assert!(
        !messages
            .iter()
            .any(|message| matches!(message, ServerMessage::QuestionStats { .. })),
        "stale timer must not send stats for the old question"
    );
    assert!(messages.iter().any(|message| matches!(
        message,
        ServerMessage::QuestionNew(snapshot) if snapshot.question_number == 2
    )));
}

#[tokio::test(start_paused = true)]
async fn silent_participant_receives_no_credit_result() {
    let fixture = fixture(1).await;
    let answering = join(&fixture, "ana").await;
    let mut silent = join(&fixture, "mute").await;

    session_service::start_game(&fixture.state, fixture.game_id)
        .await
        .unwrap();

    session_service::submit_answer(
        &fixture.state,
        fixture.game_id,
        answering.id,
        fixture.question_ids[0],
        correct_answer(&fixture, 0),
    )
    .await
    .unwrap();

    // Admin closes without waiting for the auto-close.
    session_service::close_question(&fixture.state, fixture.game_id)
        .await
        .unwrap();

    let results = drain_direct(&mut silent.rx);
    assert!(results.iter().any(|message| matches!(
        message,
        ServerMessage::AnswerResult {
            is_correct: false,
            points_earned: 0,
            time_taken: None,
            message: Some(note),
        } if note == "time's up"
    )));
}

#[tokio::test(start_paused = true)]
async fn submissions_outside_the_grace_window_are_rejected() {
    let fixture = fixture(1).await;
    let player = join(&fixture, "ana").await;

    session_service::start_game(&fixture.state, fixture.game_id)
        .await
        .unwrap();

    // 20 s limit + 3 s grace.
    settle(Duration::from_secs(24)).await;

    let outcome = session_service::submit_answer(
        &fixture.state,
        fixture.game_id,
        player.id,
        fixture.question_ids[0],
        correct_answer(&fixture, 0),
    )
    .await
    .unwrap();
    assert_eq!(outcome, SubmitOutcome::TooLate);

    assert_eq!(
        fixture
            .store
            .count_answer_records(fixture.question_ids[0])
            .await
            .unwrap(),
        0
    );
}

#[tokio::test(start_paused = true)]
async fn a_late_submission_inside_the_grace_window_still_scores_base() {
    let fixture = fixture(1).await;
    let player = join(&fixture, "ana").await;

    session_service::start_game(&fixture.state, fixture.game_id)
        .await
        .unwrap();

    settle(Duration::from_secs(22)).await;

    let outcome = session_service::submit_answer(
        &fixture.state,
        fixture.game_id,
        player.id,
        fixture.question_ids[0],
        correct_answer(&fixture, 0),
    )
    .await
    .unwrap();
    assert_eq!(outcome, SubmitOutcome::Registered { is_correct: true });

    let total = fixture
        .store
        .find_participant(player.id)
        .await
        .unwrap()
        .unwrap()
        .total_score;
    // Past the nominal limit the bonus clamps to zero.
    assert_eq!(total, 1000);
}

#[tokio::test(start_paused = true)]
async fn duplicate_submissions_are_reported_and_stored_once() {
    let fixture = fixture(1).await;
    let player = join(&fixture, "ana").await;

    session_service::start_game(&fixture.state, fixture.game_id)
        .await
        .unwrap();

    let question_id = fixture.question_ids[0];
    let answer_id = correct_answer(&fixture, 0);

    let first = session_service::submit_answer(
        &fixture.state,
        fixture.game_id,
        player.id,
        question_id,
        answer_id,
    )
    .await
    .unwrap();
    assert!(matches!(first, SubmitOutcome::Registered { .. }));

    let second = session_service::submit_answer(
        &fixture.state,
        fixture.game_id,
        player.id,
        question_id,
        answer_id,
    )
    .await
    .unwrap();
    assert_eq!(second, SubmitOutcome::AlreadyAnswered);

    assert_eq!(
        fixture.store.count_answer_records(question_id).await.unwrap(),
        1
    );
    // The duplicate must not double-count the participant's total.
    let total = fixture
        .store
        .find_participant(player.id)
        .await
        .unwrap()
        .unwrap()
        .total_score;
    assert_eq!(total, 1500);
}

#[tokio::test(start_paused = true)]
async fn ranking_is_final_only_after_the_game_ends() {
    let fixture = fixture(1).await;
    let player = join(&fixture, "ana").await;

    let mut display = fixture
        .state
        .audiences()
        .channels(fixture.game_id)
        .display
        .subscribe();

    session_service::start_game(&fixture.state, fixture.game_id)
        .await
        .unwrap();
    session_service::submit_answer(
        &fixture.state,
        fixture.game_id,
        player.id,
        fixture.question_ids[0],
        correct_answer(&fixture, 0),
    )
    .await
    .unwrap();

    session_service::show_ranking(&fixture.state, fixture.game_id)
        .await
        .unwrap();

    session_service::end_game(&fixture.state, fixture.game_id)
        .await
        .unwrap();
    session_service::show_ranking(&fixture.state, fixture.game_id)
        .await
        .unwrap();

    let rankings: Vec<_> = drain_group(&mut display)
        .into_iter()
        .filter_map(|message| match message {
            ServerMessage::RankingShow { teams, is_final } => Some((teams, is_final)),
            _ => None,
        })
        .collect();

    assert_eq!(rankings.len(), 2);
    assert!(!rankings[0].1);
    assert!(rankings[1].1);

    // One answering participant with 1500 points -> team average 1500.
    assert_eq!(rankings[1].0[0].score, 1500);
    assert_eq!(rankings[1].0[0].rank, 1);
    assert!(!rankings[1].0[0].has_tie);
}

#[tokio::test(start_paused = true)]
async fn team_without_answering_participants_ranks_at_zero() {
    let fixture = fixture(1).await;
    let mut display = fixture
        .state
        .audiences()
        .channels(fixture.game_id)
        .display
        .subscribe();

    session_service::show_ranking(&fixture.state, fixture.game_id)
        .await
        .unwrap();

    let messages = drain_group(&mut display);
    match messages.as_slice() {
        [ServerMessage::RankingShow { teams, is_final }] => {
            assert!(!is_final);
            assert_eq!(teams.len(), 1);
            assert_eq!(teams[0].score, 0);
            assert_eq!(teams[0].accuracy, 0);
        }
        other => panic!("unexpected messages: {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn restart_clears_records_and_totals() {
    let fixture = fixture(1).await;
    let player = join(&fixture, "ana").await;

    session_service::start_game(&fixture.state, fixture.game_id)
        .await
        .unwrap();
    session_service::submit_answer(
        &fixture.state,
        fixture.game_id,
        player.id,
        fixture.question_ids[0],
        correct_answer(&fixture, 0),
    )
    .await
    .unwrap();
    session_service::end_game(&fixture.state, fixture.game_id)
        .await
        .unwrap();

    let game = fixture
        .store
        .find_game(fixture.game_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(game.status, GameStatus::Finished);

    session_service::start_game(&fixture.state, fixture.game_id)
        .await
        .unwrap();

    assert_eq!(
        fixture
            .store
            .count_answer_records(fixture.question_ids[0])
            .await
            .unwrap(),
        0
    );
    let total = fixture
        .store
        .find_participant(player.id)
        .await
        .unwrap()
        .unwrap()
        .total_score;
    assert_eq!(total, 0);

    let game = fixture
        .store
        .find_game(fixture.game_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(game.status, GameStatus::Active);
    assert_eq!(game.current_question_index, 0);
}

#[tokio::test(start_paused = true)]
async fn reshowing_an_expired_question_routes_to_close() {
    let fixture = fixture(1).await;
    let _player = join(&fixture, "ana").await;

    let mut display = fixture
        .state
        .audiences()
        .channels(fixture.game_id)
        .display
        .subscribe();

    session_service::start_game(&fixture.state, fixture.game_id)
        .await
        .unwrap();
    // Drop the question:new broadcast of the open.
    drain_group(&mut display);

    settle(Duration::from_secs(21)).await;

    session_service::reshow_question(&fixture.state, fixture.game_id)
        .await
        .unwrap();

    let messages = drain_group(&mut display);
    assert!(messages
        .iter()
        .any(|message| matches!(message, ServerMessage::QuestionStats { .. })));
    assert!(!messages
        .iter()
        .any(|message| matches!(message, ServerMessage::QuestionNew(_))));
}

#[tokio::test(start_paused = true)]
async fn reshow_rebroadcasts_with_reduced_time() {
    let fixture = fixture(1).await;
    let _player = join(&fixture, "ana").await;

    let mut display = fixture
        .state
        .audiences()
        .channels(fixture.game_id)
        .display
        .subscribe();

    session_service::start_game(&fixture.state, fixture.game_id)
        .await
        .unwrap();
    drain_group(&mut display);

    settle(Duration::from_secs(8)).await;

    session_service::reshow_question(&fixture.state, fixture.game_id)
        .await
        .unwrap();

    let messages = drain_group(&mut display);
    match messages.as_slice() {
        [ServerMessage::QuestionNew(snapshot)] => {
            assert_eq!(snapshot.time_limit, 12);
            // The display never learns the correct answer.
            assert!(snapshot.correct_answer_id.is_none());
        }
        other => panic!("unexpected messages: {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn finishing_the_last_question_ends_the_game_for_all_groups() {
    let fixture = fixture(1).await;
    let player = join(&fixture, "ana").await;

    let mut display = fixture
        .state
        .audiences()
        .channels(fixture.game_id)
        .display
        .subscribe();
    let mut admin = fixture
        .state
        .audiences()
        .channels(fixture.game_id)
        .admin
        .subscribe();
    let mut participants = fixture
        .state
        .audiences()
        .channels(fixture.game_id)
        .participants
        .subscribe();

    session_service::start_game(&fixture.state, fixture.game_id)
        .await
        .unwrap();
    session_service::advance_question(&fixture.state, fixture.game_id)
        .await
        .unwrap();

    for rx in [&mut display, &mut participants] {
        assert!(
            drain_group(rx)
                .iter()
                .any(|message| matches!(message, ServerMessage::GameEnded)),
            "every group hears the game end"
        );
    }
    let admin_messages = drain_group(&mut admin);
    assert!(admin_messages
        .iter()
        .any(|message| matches!(message, ServerMessage::GameEnded)));
    // The admin's question:new carried ground truth.
    assert!(admin_messages.iter().any(|message| matches!(
        message,
        ServerMessage::QuestionNew(snapshot) if snapshot.correct_answer_id.is_some()
    )));

    // Submitting after the end finds no open question.
    let outcome = session_service::submit_answer(
        &fixture.state,
        fixture.game_id,
        player.id,
        fixture.question_ids[0],
        correct_answer(&fixture, 0),
    )
    .await
    .unwrap();
    assert_eq!(outcome, SubmitOutcome::NoQuestionOpen);
}
