use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use uuid::Uuid;

/// Sub-state of the question currently held by a registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionPhase {
    /// Accepting submissions.
    Open,
    /// An auto-close has been scheduled; submissions still accepted until it
    /// fires.
    Closing,
    /// Statistics have been sent; the entry lingers until the game advances.
    Closed,
}

/// Live state of one game's current question.
///
/// Exists only while a question is in flight; absence of an entry means no
/// question is currently open for that game. `started_at` uses the tokio
/// clock so tests can drive deadlines deterministically.
#[derive(Debug, Clone)]
pub struct LiveQuestion {
    /// Question the entry refers to.
    pub question_id: Uuid,
    /// Play-order index of that question.
    pub question_index: usize,
    /// Instant the question was shown; authoritative for scoring even across
    /// re-shows.
    pub started_at: Instant,
    /// Allowed answering time in seconds.
    pub time_limit_secs: u32,
    /// Close-scheduling sub-state.
    pub phase: QuestionPhase,
}

impl LiveQuestion {
    /// Seconds elapsed since the question was shown.
    pub fn elapsed_secs(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }

    /// Whole seconds left on the clock, saturating at zero.
    pub fn remaining_secs(&self) -> u32 {
        let remaining = f64::from(self.time_limit_secs) - self.elapsed_secs();
        if remaining <= 0.0 {
            0
        } else {
            remaining.round() as u32
        }
    }

    /// Whether the deadline plus the given grace window has passed.
    pub fn past_deadline(&self, grace: Duration) -> bool {
        self.elapsed_secs() > f64::from(self.time_limit_secs) + grace.as_secs_f64()
    }
}

/// Process-wide map from game id to its live question.
///
/// All mutations run inside short map-entry critical sections that never
/// span an await; phase transitions double as the per-game serialization
/// point for close scheduling (only one caller wins the `Open -> Closing`
/// swap).
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<Uuid, LiveQuestion>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install (or replace) the live question for a game, phase `Open`,
    /// clock starting now.
    pub fn open_question(
        &self,
        game_id: Uuid,
        question_id: Uuid,
        question_index: usize,
        time_limit_secs: u32,
    ) {
        self.sessions.insert(
            game_id,
            LiveQuestion {
                question_id,
                question_index,
                started_at: Instant::now(),
                time_limit_secs,
                phase: QuestionPhase::Open,
            },
        );
    }

    /// Clone the live question for a game, if any.
    pub fn snapshot(&self, game_id: Uuid) -> Option<LiveQuestion> {
        self.sessions.get(&game_id).map(|entry| entry.clone())
    }

    /// Remove a game's entry entirely (game ended).
    pub fn remove(&self, game_id: Uuid) {
        self.sessions.remove(&game_id);
    }

    /// Whether the entry still refers to `question_id` and is accepting an
    /// auto-close (phase `Open`). Stale checks from a prior question land
    /// here and read false.
    pub fn is_open(&self, game_id: Uuid, question_id: Uuid) -> bool {
        self.sessions
            .get(&game_id)
            .map(|entry| entry.question_id == question_id && entry.phase == QuestionPhase::Open)
            .unwrap_or(false)
    }

    /// Single-winner `Open -> Closing` transition; returns whether this
    /// caller performed it. Losing callers (concurrent submissions racing to
    /// be "the answer that closes the question") get false and schedule
    /// nothing.
    pub fn begin_close(&self, game_id: Uuid, question_id: Uuid) -> bool {
        let Some(mut entry) = self.sessions.get_mut(&game_id) else {
            return false;
        };
        if entry.question_id != question_id || entry.phase != QuestionPhase::Open {
            return false;
        }
        entry.phase = QuestionPhase::Closing;
        true
    }

    /// Whether a scheduled close is still valid at fire time: same question,
    /// phase still `Closing`.
    pub fn is_closing(&self, game_id: Uuid, question_id: Uuid) -> bool {
        self.sessions
            .get(&game_id)
            .map(|entry| {
                entry.question_id == question_id && entry.phase == QuestionPhase::Closing
            })
            .unwrap_or(false)
    }

    /// Mark the question closed; returns whether the entry (still) referred
    /// to `question_id`.
    pub fn mark_closed(&self, game_id: Uuid, question_id: Uuid) -> bool {
        let Some(mut entry) = self.sessions.get_mut(&game_id) else {
            return false;
        };
        if entry.question_id != question_id {
            return false;
        }
        entry.phase = QuestionPhase::Closed;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_entry_reads_as_nothing_open() {
        let registry = SessionRegistry::new();
        let game_id = Uuid::new_v4();
        assert!(registry.snapshot(game_id).is_none());
        assert!(!registry.is_open(game_id, Uuid::new_v4()));
    }

    #[tokio::test]
    async fn begin_close_has_a_single_winner() {
        let registry = SessionRegistry::new();
        let game_id = Uuid::new_v4();
        let question_id = Uuid::new_v4();
        registry.open_question(game_id, question_id, 0, 20);

        assert!(registry.begin_close(game_id, question_id));
        // Second submission racing for the close loses the swap.
        assert!(!registry.begin_close(game_id, question_id));
        assert!(registry.is_closing(game_id, question_id));
    }

    #[tokio::test]
    async fn stale_question_id_cannot_transition() {
        let registry = SessionRegistry::new();
        let game_id = Uuid::new_v4();
        let first = Uuid::new_v4();
        registry.open_question(game_id, first, 0, 20);

        let second = Uuid::new_v4();
        registry.open_question(game_id, second, 1, 20);

        assert!(!registry.begin_close(game_id, first));
        assert!(!registry.mark_closed(game_id, first));
        assert!(registry.is_open(game_id, second));
    }

    #[tokio::test]
    async fn closed_entry_rejects_further_auto_close() {
        let registry = SessionRegistry::new();
        let game_id = Uuid::new_v4();
        let question_id = Uuid::new_v4();
        registry.open_question(game_id, question_id, 0, 20);

        assert!(registry.mark_closed(game_id, question_id));
        assert!(!registry.is_open(game_id, question_id));
        assert!(!registry.begin_close(game_id, question_id));
    }

    #[tokio::test(start_paused = true)]
    async fn remaining_time_tracks_the_clock() {
        let registry = SessionRegistry::new();
        let game_id = Uuid::new_v4();
        registry.open_question(game_id, Uuid::new_v4(), 0, 20);

        tokio::time::advance(std::time::Duration::from_secs(5)).await;
        let snapshot = registry.snapshot(game_id).unwrap();
        assert_eq!(snapshot.remaining_secs(), 15);
        assert!(!snapshot.past_deadline(std::time::Duration::from_secs(3)));

        tokio::time::advance(std::time::Duration::from_secs(19)).await;
        let snapshot = registry.snapshot(game_id).unwrap();
        assert_eq!(snapshot.remaining_secs(), 0);
        assert!(snapshot.past_deadline(std::time::Duration::from_secs(3)));
    }
}
