//! Typed failures crossing the engine boundary. Every command-surface
//! operation returns one of these; there is no unstructured error path.

use thiserror::Error;
use uuid::Uuid;

use crate::state::state_machine::InvalidTransition;

/// Errors that can occur in engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The player is already registered to an active game.
    #[error("player `{0}` is already in a game")]
    AlreadyInGame(String),
    /// No session exists for the given identifier.
    #[error("game `{0}` not found")]
    SessionNotFound(Uuid),
    /// The session has reached its configured player capacity.
    #[error("game `{0}` is full")]
    SessionFull(Uuid),
    /// The session no longer accepts new players (play has started or ended).
    #[error("game `{0}` no longer accepts players")]
    SessionClosed(Uuid),
    /// The player is not registered to the targeted session.
    #[error("player `{0}` is not in this game")]
    PlayerNotInSession(String),
    /// Only the session owner may perform this operation.
    #[error("player `{0}` does not own game `{1}`")]
    NotGameOwner(String, Uuid),
    /// Invalid input provided by the caller.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Operation cannot be performed in the current phase.
    #[error("invalid state: {0}")]
    InvalidState(String),
}

impl From<InvalidTransition> for EngineError {
    fn from(err: InvalidTransition) -> Self {
        EngineError::InvalidState(err.to_string())
    }
}
