//! WebSocket connection lifecycle: role-scoped message dispatch, audience
//! subscriptions, and participant bookkeeping.

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::{
    sync::{broadcast::error::RecvError, mpsc},
    task::JoinHandle,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dto::ws::{ClientMessage, ServerMessage, WsPayload},
    services::{session_service, session_service::SubmitOutcome, ws_events},
    state::SharedState,
};

/// Audience a connection belongs to, declared via the `role` query
/// parameter on the upgrade request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionRole {
    /// Drives the session.
    Admin,
    /// Mirrors it on the shared screen.
    Display,
    /// Plays on a personal device.
    Participant,
}

impl ConnectionRole {
    /// Parse the query-parameter value.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "admin" => Some(Self::Admin),
            "display" => Some(Self::Display),
            "participant" => Some(Self::Participant),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Display => "display",
            Self::Participant => "participant",
        }
    }
}

/// Handle the full lifecycle of one WebSocket connection.
pub async fn handle_socket(state: SharedState, socket: WebSocket, role: ConnectionRole) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we
    // await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let connection_id = Uuid::new_v4();
    info!(%connection_id, role = role.as_str(), "socket connected");

    let mut forwarders: Vec<JoinHandle<()>> = Vec::new();
    // Game the admin/display socket subscribed to.
    let mut attached_game: Option<Uuid> = None;
    // (participant id, game id) once a participant socket joined.
    let mut joined: Option<(Uuid, Uuid)> = None;

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => match ClientMessage::from_json_str(&text) {
                Ok(inbound) => {
                    dispatch(
                        &state,
                        role,
                        connection_id,
                        &outbound_tx,
                        &mut forwarders,
                        &mut attached_game,
                        &mut joined,
                        inbound,
                    )
                    .await;
                }
                Err(err) => {
                    warn!(%connection_id, error = %err, "failed to parse client message");
                    send_error(&outbound_tx, "malformed message");
                }
            },
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) => {}
            Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(%connection_id, error = %err, "websocket error");
                break;
            }
        }
    }

    if joined.is_some() {
        if let Some(connection) = state.audiences().remove_participant(connection_id) {
            session_service::handle_participant_disconnect(state.clone(), connection);
        }
    }

    for forwarder in forwarders {
        forwarder.abort();
    }

    info!(%connection_id, role = role.as_str(), "socket disconnected");
    finalize(writer_task, outbound_tx).await;
}

#[allow(clippy::too_many_arguments)]
async fn dispatch(
    state: &SharedState,
    role: ConnectionRole,
    connection_id: Uuid,
    outbound_tx: &mpsc::UnboundedSender<Message>,
    forwarders: &mut Vec<JoinHandle<()>>,
    attached_game: &mut Option<Uuid>,
    joined: &mut Option<(Uuid, Uuid)>,
    inbound: ClientMessage,
) {
    match (role, inbound) {
        (ConnectionRole::Admin, ClientMessage::AdminConnect { game_id }) => {
            if attached_game.is_some() {
                send_error(outbound_tx, "already attached to a game");
                return;
            }
            let receiver = state.audiences().channels(game_id).admin.subscribe();
            forwarders.push(spawn_forwarder(receiver, outbound_tx.clone()));
            *attached_game = Some(game_id);
            info!(%connection_id, %game_id, "admin attached");
        }
        (ConnectionRole::Display, ClientMessage::DisplayConnect { game_id }) => {
            if attached_game.is_some() {
                send_error(outbound_tx, "already attached to a game");
                return;
            }
            let receiver = state.audiences().channels(game_id).display.subscribe();
            forwarders.push(spawn_forwarder(receiver, outbound_tx.clone()));
            *attached_game = Some(game_id);
            info!(%connection_id, %game_id, "display attached");
            session_service::broadcast_live_count(state, game_id);
        }
        (ConnectionRole::Admin, ClientMessage::StartGame { game_id }) => {
            reply_on_error(
                outbound_tx,
                session_service::start_game(state, game_id).await,
            );
        }
        (ConnectionRole::Admin, ClientMessage::NextQuestion { game_id }) => {
            reply_on_error(
                outbound_tx,
                session_service::advance_question(state, game_id).await,
            );
        }
        (ConnectionRole::Admin, ClientMessage::ReshowQuestion { game_id }) => {
            reply_on_error(
                outbound_tx,
                session_service::reshow_question(state, game_id).await,
            );
        }
        (ConnectionRole::Admin, ClientMessage::ShowStats { game_id }) => {
            reply_on_error(
                outbound_tx,
                session_service::close_question(state, game_id).await,
            );
        }
        (ConnectionRole::Admin, ClientMessage::ShowRanking { game_id }) => {
            reply_on_error(
                outbound_tx,
                session_service::show_ranking(state, game_id).await,
            );
        }
        (ConnectionRole::Admin, ClientMessage::EndGame { game_id }) => {
            reply_on_error(outbound_tx, session_service::end_game(state, game_id).await);
        }
        (ConnectionRole::Display, ClientMessage::TimeUp { game_id }) => {
            reply_on_error(
                outbound_tx,
                session_service::close_question(state, game_id).await,
            );
        }
        (ConnectionRole::Participant, ClientMessage::Join { team_id, nickname }) => {
            if joined.is_some() {
                send_error(outbound_tx, "already joined");
                return;
            }
            match session_service::join_participant(
                state,
                team_id,
                nickname,
                connection_id,
                outbound_tx.clone(),
            )
            .await
            {
                Ok((participant, game_id)) => {
                    let receiver = state.audiences().channels(game_id).participants.subscribe();
                    forwarders.push(spawn_forwarder(receiver, outbound_tx.clone()));
                    *joined = Some((participant.id, game_id));

                    ws_events::send_to_connection(
                        outbound_tx,
                        &ServerMessage::Joined {
                            participant_id: participant.id,
                            team_id,
                            nickname: participant.nickname,
                            score: participant.total_score,
                        },
                        "join ack",
                    );
                }
                Err(err) => send_error(outbound_tx, &err.to_string()),
            }
        }
        (
            ConnectionRole::Participant,
            ClientMessage::Answer {
                participant_id,
                question_id,
                answer_id,
            },
        ) => {
            let Some((own_participant_id, game_id)) = *joined else {
                send_error(outbound_tx, "join a team before answering");
                return;
            };
            if participant_id != own_participant_id {
                send_error(outbound_tx, "participant id does not match this connection");
                return;
            }

            match session_service::submit_answer(
                state,
                game_id,
                participant_id,
                question_id,
                answer_id,
            )
            .await
            {
                Ok(outcome) => send_submit_outcome(outbound_tx, outcome),
                Err(err) => send_error(outbound_tx, &err.to_string()),
            }
        }
        (_, ClientMessage::Unknown) => {
            send_error(outbound_tx, "unsupported message");
        }
        (role, other) => {
            warn!(role = role.as_str(), message = ?other, "message outside connection role");
            send_error(outbound_tx, "message not allowed for this role");
        }
    }
}

/// Map a submission outcome to the reply event for the submitter.
fn send_submit_outcome(tx: &mpsc::UnboundedSender<Message>, outcome: SubmitOutcome) {
    let message = match outcome {
        SubmitOutcome::Registered { .. } => ServerMessage::AnswerRegistered,
        SubmitOutcome::AlreadyAnswered => ServerMessage::AlreadyAnswered,
        SubmitOutcome::TooLate => ServerMessage::AnswerResult {
            is_correct: false,
            points_earned: 0,
            time_taken: None,
            message: Some("time's up".into()),
        },
        SubmitOutcome::NoQuestionOpen => ServerMessage::AnswerResult {
            is_correct: false,
            points_earned: 0,
            time_taken: None,
            message: Some("no question is open".into()),
        },
    };
    ws_events::send_to_connection(tx, &message, "submit outcome");
}

/// Forward a command failure to the issuing connection only.
fn reply_on_error<T>(
    tx: &mpsc::UnboundedSender<Message>,
    result: Result<T, crate::error::ServiceError>,
) {
    if let Err(err) = result {
        send_error(tx, &err.to_string());
    }
}

fn send_error(tx: &mpsc::UnboundedSender<Message>, message: &str) {
    ws_events::send_to_connection(
        tx,
        &ServerMessage::Error {
            message: message.into(),
        },
        "error event",
    );
}

/// Pump one audience broadcast subscription into a socket's writer channel.
///
/// Lagged receivers skip missed frames and keep going; a closed writer ends
/// the task.
fn spawn_forwarder(
    mut receiver: tokio::sync::broadcast::Receiver<WsPayload>,
    tx: mpsc::UnboundedSender<Message>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(payload) => {
                    if tx.send(Message::Text(payload.data.into())).is_err() {
                        break;
                    }
                }
                Err(RecvError::Closed) => break,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "broadcast receiver lagged; skipping frames");
                    continue;
                }
            }
        }
    })
}

/// Ensure the writer task winds down before we return from the socket
/// handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
