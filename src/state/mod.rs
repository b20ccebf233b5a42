/// Per-game broadcast groups and addressable participant sockets.
pub mod audience;
/// Live question registry (the per-game session state).
pub mod session;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, RwLock, watch};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dao::quiz_store::QuizStore,
    error::ServiceError,
    state::{audience::AudienceRegistry, session::SessionRegistry},
};

/// Cheaply cloneable handle to the central application state.
pub type SharedState = Arc<AppState>;

/// Central application state: storage handle, live sessions, audience
/// channels, and per-game command gates.
pub struct AppState {
    quiz_store: RwLock<Option<Arc<dyn QuizStore>>>,
    sessions: SessionRegistry,
    audiences: AudienceRegistry,
    /// Serializes admin lifecycle commands (start/advance/end) per game.
    game_gates: DashMap<Uuid, Arc<Mutex<()>>>,
    degraded: watch::Sender<bool>,
    config: AppConfig,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`].
    ///
    /// The application starts in degraded mode until a storage backend is
    /// installed by the supervisor.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        let capacity = config.broadcast_capacity();
        Arc::new(Self {
            quiz_store: RwLock::new(None),
            sessions: SessionRegistry::new(),
            audiences: AudienceRegistry::new(capacity),
            game_gates: DashMap::new(),
            degraded: degraded_tx,
            config,
        })
    }

    /// Immutable runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Obtain a handle to the current quiz store, if one is installed.
    pub async fn quiz_store(&self) -> Option<Arc<dyn QuizStore>> {
        let guard = self.quiz_store.read().await;
        guard.as_ref().cloned()
    }

    /// Obtain the quiz store or fail with the degraded-mode error.
    pub async fn require_quiz_store(&self) -> Result<Arc<dyn QuizStore>, ServiceError> {
        self.quiz_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a storage backend and leave degraded mode.
    pub async fn install_quiz_store(&self, store: Arc<dyn QuizStore>) {
        {
            let mut guard = self.quiz_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false).await;
    }

    /// Remove the storage backend and enter degraded mode.
    pub async fn clear_quiz_store(&self) {
        {
            let mut guard = self.quiz_store.write().await;
            guard.take();
        }
        self.update_degraded(true).await;
    }

    /// Whether the application currently runs without storage.
    pub async fn is_degraded(&self) -> bool {
        let guard = self.quiz_store.read().await;
        guard.is_none()
    }

    /// Subscribe to degraded-mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub async fn update_degraded(&self, value: bool) {
        if self.is_degraded().await == value {
            return;
        }
        let _ = self.degraded.send(value);
    }

    /// Registry of live questions keyed by game id.
    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Per-game audience channels and participant sockets.
    pub fn audiences(&self) -> &AudienceRegistry {
        &self.audiences
    }

    /// Lock guarding lifecycle commands for one game.
    ///
    /// Gates are created lazily and kept for the process lifetime; they are
    /// held across one command only, never across a subscriber's lifetime.
    pub fn game_gate(&self, game_id: Uuid) -> Arc<Mutex<()>> {
        self.game_gates
            .entry(game_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
