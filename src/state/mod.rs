//! Shared engine state: the session registry plus the injected collaborator
//! handles every service function operates on.

/// Session data model.
pub mod game;
/// Session registry and player mappings.
pub mod registry;
/// Phase state machine.
pub mod state_machine;
/// Cancelable per-session timers.
pub mod timers;

use std::sync::Arc;

use crate::{
    config::EngineConfig,
    dao::{question_source::QuestionSource, scoreboard::ScoreboardStore},
    presenter::Presenter,
    state::registry::GameRegistry,
};

/// Cheaply clonable handle to the engine state.
pub type SharedEngine = Arc<EngineState>;

/// Central engine state wiring the registry to the external collaborators.
pub struct EngineState {
    config: EngineConfig,
    registry: GameRegistry,
    source: Arc<dyn QuestionSource>,
    presenter: Arc<dyn Presenter>,
    scoreboard: Option<Arc<dyn ScoreboardStore>>,
}

impl EngineState {
    /// Construct the engine wrapped in an [`Arc`] so timer callbacks can hold
    /// it across their deadlines.
    pub fn new(
        config: EngineConfig,
        source: Arc<dyn QuestionSource>,
        presenter: Arc<dyn Presenter>,
        scoreboard: Option<Arc<dyn ScoreboardStore>>,
    ) -> SharedEngine {
        Arc::new(Self {
            config,
            registry: GameRegistry::new(),
            source,
            presenter,
            scoreboard,
        })
    }

    /// Immutable engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The session registry.
    pub fn registry(&self) -> &GameRegistry {
        &self.registry
    }

    /// The question source sessions generate their batches from.
    pub fn question_source(&self) -> &Arc<dyn QuestionSource> {
        &self.source
    }

    /// The presenter all session output is delivered through.
    pub fn presenter(&self) -> &Arc<dyn Presenter> {
        &self.presenter
    }

    /// The best-effort completion store, if one is installed.
    pub fn scoreboard(&self) -> Option<&Arc<dyn ScoreboardStore>> {
        self.scoreboard.as_ref()
    }
}
