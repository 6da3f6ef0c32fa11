use serde::Serialize;

use crate::state::state_machine::{FinishReason, GamePhase};

/// Session phase as exposed to status queries and presenter payloads.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VisiblePhase {
    /// Session is open for players, nothing generated yet.
    Waiting,
    /// Question generation in progress.
    Starting,
    /// Questions are being played.
    Active,
    /// Session ended; every question was played.
    Finished,
    /// Session ended without content to play.
    NoContent,
    /// Session ended because everyone left.
    Abandoned,
}

impl From<&GamePhase> for VisiblePhase {
    fn from(value: &GamePhase) -> Self {
        match value {
            GamePhase::Waiting => VisiblePhase::Waiting,
            GamePhase::Starting => VisiblePhase::Starting,
            GamePhase::Active => VisiblePhase::Active,
            GamePhase::Finished(FinishReason::Completed) => VisiblePhase::Finished,
            GamePhase::Finished(FinishReason::NoContent) => VisiblePhase::NoContent,
            GamePhase::Finished(FinishReason::Abandoned) => VisiblePhase::Abandoned,
        }
    }
}
