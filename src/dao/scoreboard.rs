use std::sync::Mutex;

use futures::future::BoxFuture;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::state::{game::Difficulty, state_machine::FinishReason};

/// Result alias for scoreboard operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by scoreboard backends regardless of the underlying store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The store could not be reached or rejected the write.
    #[error("scoreboard unavailable: {message}")]
    Unavailable {
        /// Human readable description of the failure.
        message: String,
        /// Underlying backend failure.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(
        message: String,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}

/// One leaderboard row of a completed game.
#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    /// Player identifier.
    pub player_id: String,
    /// Name shown on the leaderboard.
    pub display_name: String,
    /// Final score.
    pub score: u32,
    /// Correctly answered questions.
    pub correct_answers: u32,
}

/// Record persisted when a game reaches its terminal phase.
#[derive(Debug, Clone, Serialize)]
pub struct CompletedGameEntity {
    /// The session the record belongs to.
    pub session_id: Uuid,
    /// Difficulty the game was played at.
    pub difficulty: Difficulty,
    /// Number of questions that were actually played.
    pub questions_played: usize,
    /// Why the game ended.
    #[serde(skip)]
    pub reason: FinishReason,
    /// Final standings, best first.
    pub standings: Vec<LeaderboardEntry>,
}

/// Abstraction over the persistence layer for completed games. The engine
/// calls it opportunistically at game end and tolerates failure.
pub trait ScoreboardStore: Send + Sync {
    /// Persist a completion record.
    fn record_completion(
        &self,
        entry: CompletedGameEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
}

/// Scoreboard store keeping records in memory, for demos and tests.
#[derive(Default)]
pub struct InMemoryScoreboard {
    records: Mutex<Vec<CompletedGameEntity>>,
}

impl InMemoryScoreboard {
    /// Create an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every record written so far.
    pub fn records(&self) -> Vec<CompletedGameEntity> {
        self.records
            .lock()
            .expect("scoreboard lock poisoned")
            .clone()
    }
}

impl ScoreboardStore for InMemoryScoreboard {
    fn record_completion(
        &self,
        entry: CompletedGameEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.records
            .lock()
            .expect("scoreboard lock poisoned")
            .push(entry);
        Box::pin(async { Ok(()) })
    }
}
