use thiserror::Error;

/// High-level phases a trivia session can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    /// Session exists, players may join, generation has not been requested.
    Waiting,
    /// Question generation is in flight; the poll and timeout timers are armed.
    Starting,
    /// Questions are being asked and answered.
    Active,
    /// Terminal phase; carries why the session ended.
    Finished(FinishReason),
}

impl GamePhase {
    /// Whether the session has reached its terminal phase.
    pub fn is_finished(&self) -> bool {
        matches!(self, GamePhase::Finished(_))
    }
}

/// Indicates why a session reached the finished phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    /// Every question was asked and evaluated.
    Completed,
    /// Generation yielded zero questions, so there was nothing to play.
    NoContent,
    /// All players left before the game could complete.
    Abandoned,
}

/// Events that can be applied to the session state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    /// Question generation has been requested.
    StartGeneration,
    /// The generated batch is ready and contains at least one question.
    GenerationReady,
    /// The generation deadline fired; proceed with whatever arrived.
    GenerationTimedOut,
    /// The question cursor reached the end of the batch (or the batch was
    /// empty when play would have started).
    QuestionsExhausted,
    /// Every player left the session.
    Abandon,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the state machine was in when the invalid event was received.
    pub from: GamePhase,
    /// The event that cannot be applied from this phase.
    pub event: GameEvent,
}

/// State machine implementing the waiting → starting → active → finished
/// sequence. Transitions are committed directly; the version counter
/// increments on each applied event.
#[derive(Debug, Clone)]
pub struct GameStateMachine {
    phase: GamePhase,
    version: usize,
}

impl Default for GameStateMachine {
    fn default() -> Self {
        Self {
            phase: GamePhase::Waiting,
            version: 0,
        }
    }
}

impl GameStateMachine {
    /// Create a new state machine initialised in the waiting phase.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    /// Number of transitions applied so far.
    pub fn version(&self) -> usize {
        self.version
    }

    /// Apply an event, moving the state machine to the next phase.
    pub fn apply(&mut self, event: GameEvent) -> Result<GamePhase, InvalidTransition> {
        let next = self.compute_transition(event)?;
        self.phase = next;
        self.version += 1;
        Ok(self.phase)
    }

    /// Compute the phase an event would lead to, if the transition is valid.
    fn compute_transition(&self, event: GameEvent) -> Result<GamePhase, InvalidTransition> {
        let next = match (self.phase, event) {
            (GamePhase::Waiting, GameEvent::StartGeneration) => GamePhase::Starting,
            (GamePhase::Starting, GameEvent::GenerationReady) => GamePhase::Active,
            (GamePhase::Starting, GameEvent::GenerationTimedOut) => GamePhase::Active,
            (GamePhase::Starting, GameEvent::QuestionsExhausted) => {
                GamePhase::Finished(FinishReason::NoContent)
            }
            (GamePhase::Active, GameEvent::QuestionsExhausted) => {
                GamePhase::Finished(FinishReason::Completed)
            }
            (
                GamePhase::Waiting | GamePhase::Starting | GamePhase::Active,
                GameEvent::Abandon,
            ) => GamePhase::Finished(FinishReason::Abandoned),
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}
