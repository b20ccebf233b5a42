use std::sync::Arc;

use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use crate::dto::ws::WsPayload;

/// Broadcast hub for one audience group of one game.
///
/// Wraps a Tokio broadcast channel carrying pre-serialized frames; every
/// connected socket of the group runs a forwarder task off `subscribe`.
pub struct AudienceHub {
    sender: broadcast::Sender<WsPayload>,
}

impl AudienceHub {
    fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent frames.
    pub fn subscribe(&self) -> broadcast::Receiver<WsPayload> {
        self.sender.subscribe()
    }

    /// Send a frame to all current subscribers, ignoring delivery errors
    /// (no subscriber connected is fine).
    pub fn broadcast(&self, payload: WsPayload) {
        let _ = self.sender.send(payload);
    }
}

/// The three broadcast groups scoping messages for one game.
pub struct GameChannels {
    /// Everyone playing on a personal device.
    pub participants: AudienceHub,
    /// The shared screen.
    pub display: AudienceHub,
    /// The session administrator.
    pub admin: AudienceHub,
}

impl GameChannels {
    fn new(capacity: usize) -> Self {
        Self {
            participants: AudienceHub::new(capacity),
            display: AudienceHub::new(capacity),
            admin: AudienceHub::new(capacity),
        }
    }
}

/// Handle used to push individually addressed messages to one participant
/// socket.
#[derive(Clone)]
pub struct ParticipantConnection {
    /// Socket-scoped identifier (fresh per connection).
    pub connection_id: Uuid,
    /// Participant row created by this connection's join.
    pub participant_id: Uuid,
    /// Game the participant plays in.
    pub game_id: Uuid,
    /// Outbound channel of the socket's writer task.
    pub tx: mpsc::UnboundedSender<Message>,
}

/// Registry of per-game broadcast channels and addressable participant
/// sockets.
pub struct AudienceRegistry {
    channels: DashMap<Uuid, Arc<GameChannels>>,
    participants: DashMap<Uuid, ParticipantConnection>,
    capacity: usize,
}

impl AudienceRegistry {
    /// Create an empty registry whose hubs use the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            participants: DashMap::new(),
            capacity,
        }
    }

    /// Get (or lazily create) the channel trio for a game.
    ///
    /// Channels are kept for the process lifetime; clients may still be
    /// subscribed after a game ends (final ranking, `game:ended`).
    pub fn channels(&self, game_id: Uuid) -> Arc<GameChannels> {
        self.channels
            .entry(game_id)
            .or_insert_with(|| Arc::new(GameChannels::new(self.capacity)))
            .clone()
    }

    /// Track a participant socket for fan-out and live counting.
    pub fn register_participant(&self, connection: ParticipantConnection) {
        self.participants
            .insert(connection.connection_id, connection);
    }

    /// Drop a participant socket, returning its handle when it was tracked.
    pub fn remove_participant(&self, connection_id: Uuid) -> Option<ParticipantConnection> {
        self.participants
            .remove(&connection_id)
            .map(|(_, connection)| connection)
    }

    /// Number of participant sockets currently connected to a game.
    pub fn connected_participants(&self, game_id: Uuid) -> u64 {
        self.participants
            .iter()
            .filter(|entry| entry.game_id == game_id)
            .count() as u64
    }

    /// Snapshot of every participant socket of a game, for per-recipient
    /// fan-out.
    pub fn participants_of_game(&self, game_id: Uuid) -> Vec<ParticipantConnection> {
        self.participants
            .iter()
            .filter(|entry| entry.game_id == game_id)
            .map(|entry| entry.value().clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection(game_id: Uuid) -> (ParticipantConnection, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            ParticipantConnection {
                connection_id: Uuid::new_v4(),
                participant_id: Uuid::new_v4(),
                game_id,
                tx,
            },
            rx,
        )
    }

    #[tokio::test]
    async fn counts_are_scoped_per_game() {
        let registry = AudienceRegistry::new(8);
        let game_a = Uuid::new_v4();
        let game_b = Uuid::new_v4();

        let (first, _rx1) = connection(game_a);
        let (second, _rx2) = connection(game_a);
        let (third, _rx3) = connection(game_b);
        let second_id = second.connection_id;
        registry.register_participant(first);
        registry.register_participant(second);
        registry.register_participant(third);

        assert_eq!(registry.connected_participants(game_a), 2);
        assert_eq!(registry.connected_participants(game_b), 1);

        registry.remove_participant(second_id);
        assert_eq!(registry.connected_participants(game_a), 1);
    }

    #[tokio::test]
    async fn channels_are_created_once_per_game() {
        let registry = AudienceRegistry::new(8);
        let game_id = Uuid::new_v4();
        let first = registry.channels(game_id);
        let second = registry.channels(game_id);
        assert!(Arc::ptr_eq(&first, &second));
    }
}
