use std::{
    collections::BTreeMap,
    time::{Duration, SystemTime},
};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::state_machine::{GameEvent, GamePhase, GameStateMachine, InvalidTransition};

/// Opaque player identifier handed in by the hosting platform.
pub type PlayerId = String;

/// Difficulty levels a session can be created with. Immutable after creation;
/// selects the per-question time limit and points via the difficulty table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// Longest answer window, lowest reward.
    Easy,
    /// Standard answer window and reward.
    Medium,
    /// Short answer window, higher reward.
    Hard,
    /// Shortest answer window, highest reward.
    Expert,
}

/// One trivia item as delivered by the question source.
#[derive(Debug, Clone)]
pub struct Question {
    /// The question prompt shown to players.
    pub text: String,
    /// Fixed ordered list of answer options.
    pub options: Vec<String>,
    /// Index into `options` of the correct answer.
    pub correct_option_index: usize,
    /// Domain metadata attached to the question, opaque to the engine.
    pub bible_reference: Option<String>,
    /// Points awarded for a correct answer.
    pub points: u32,
    /// How long players may answer this question.
    pub time_limit: Duration,
}

/// One player's live state within a session.
#[derive(Debug, Clone)]
pub struct PlayerState {
    /// Identifier the hosting platform knows the player by.
    pub id: PlayerId,
    /// Name shown on scoreboards and reviews.
    pub display_name: String,
    /// When the player joined the session.
    pub joined_at: SystemTime,
    /// Running total, monotonically non-decreasing.
    pub score: u32,
    /// Running count of correctly answered questions.
    pub correct_answers: u32,
    /// The option index chosen for the current question, if any. Cleared
    /// after every evaluation.
    pub selected_answer: Option<usize>,
    /// When the current answer was submitted. Cleared with `selected_answer`.
    pub answered_at: Option<SystemTime>,
}

impl PlayerState {
    /// Build a fresh player record with zeroed scores.
    pub fn new(id: PlayerId, display_name: String) -> Self {
        Self {
            id,
            display_name,
            joined_at: SystemTime::now(),
            score: 0,
            correct_answers: 0,
            selected_answer: None,
            answered_at: None,
        }
    }
}

/// What a player answered on one question, captured at evaluation time and
/// never mutated afterward. `answer: None` records that the player never
/// answered; it is rendered with the literal marker "no answer".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewEntry {
    /// The option index the player had selected, if any.
    pub answer: Option<usize>,
    /// Whether the answer matched the question's correct option.
    pub correct: bool,
    /// Points awarded for this question.
    pub awarded: u32,
}

/// Aggregated state for one trivia game from creation to completion.
#[derive(Debug, Clone)]
pub struct GameSession {
    /// Primary key of the session.
    pub id: Uuid,
    /// Player that created the session; gates the start command.
    pub owner_id: PlayerId,
    /// Difficulty selected at creation.
    pub difficulty: Difficulty,
    /// Target question count, fixed at creation.
    pub total_questions: usize,
    /// Upper bound on concurrently joined players (1 for solo).
    pub max_players: usize,
    /// Solo sessions deliver privately instead of broadcasting.
    pub is_solo: bool,
    /// Creation timestamp for auditing/debugging.
    pub created_at: SystemTime,
    /// Participating players, insertion order = join order.
    pub players: IndexMap<PlayerId, PlayerState>,
    /// Question batch, populated once by the question source.
    pub questions: Vec<Question>,
    /// Cursor into `questions`; monotonically increasing.
    pub current_question_index: usize,
    /// Per-question record of what each player answered, retained for the
    /// end-of-game review.
    pub question_reviews: BTreeMap<usize, IndexMap<PlayerId, ReviewEntry>>,
    machine: GameStateMachine,
    questions_ready: bool,
}

impl GameSession {
    /// Build a new in-memory session with the owner as its first player.
    pub fn new(
        owner_id: PlayerId,
        owner_name: String,
        difficulty: Difficulty,
        total_questions: usize,
        max_players: usize,
        is_solo: bool,
    ) -> Self {
        let mut players = IndexMap::new();
        players.insert(
            owner_id.clone(),
            PlayerState::new(owner_id.clone(), owner_name),
        );

        Self {
            id: Uuid::new_v4(),
            owner_id,
            difficulty,
            total_questions,
            max_players,
            is_solo,
            created_at: SystemTime::now(),
            players,
            questions: Vec::new(),
            current_question_index: 0,
            question_reviews: BTreeMap::new(),
            machine: GameStateMachine::new(),
            questions_ready: false,
        }
    }

    /// Current phase of the session.
    pub fn phase(&self) -> GamePhase {
        self.machine.phase()
    }

    /// Apply a lifecycle event to the embedded state machine.
    pub fn apply_event(&mut self, event: GameEvent) -> Result<GamePhase, InvalidTransition> {
        self.machine.apply(event)
    }

    /// Whether the generated question batch has been delivered.
    pub fn questions_ready(&self) -> bool {
        self.questions_ready
    }

    /// Store the generated batch. The batch is populated at most once; a
    /// second delivery is ignored and reported as `false`.
    pub fn install_questions(&mut self, questions: Vec<Question>) -> bool {
        if self.questions_ready {
            return false;
        }
        self.questions = questions;
        self.questions_ready = true;
        true
    }

    /// The question currently pointed at by the cursor, if any.
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current_question_index)
    }

    /// Advance the cursor past the current question.
    pub fn advance_cursor(&mut self) {
        debug_assert!(self.current_question_index < self.questions.len());
        self.current_question_index += 1;
    }

    /// Whether the cursor has consumed every question in the batch.
    pub fn questions_exhausted(&self) -> bool {
        self.current_question_index >= self.questions.len()
    }

    /// Final standings: stable sort by score descending, ties preserve join
    /// order.
    pub fn standings(&self) -> Vec<PlayerState> {
        let mut standings: Vec<PlayerState> = self.players.values().cloned().collect();
        standings.sort_by(|a, b| b.score.cmp(&a.score));
        standings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_with_players(scores: &[(&str, u32)]) -> GameSession {
        let mut session = GameSession::new(
            scores[0].0.to_string(),
            scores[0].0.to_string(),
            Difficulty::Easy,
            5,
            8,
            false,
        );
        session.players.get_mut(scores[0].0).unwrap().score = scores[0].1;
        for (id, score) in &scores[1..] {
            let mut player = PlayerState::new(id.to_string(), id.to_string());
            player.score = *score;
            session.players.insert(id.to_string(), player);
        }
        session
    }

    #[test]
    fn standings_sort_by_score_descending() {
        let session = session_with_players(&[("ana", 3), ("bo", 7), ("cy", 5)]);
        let order: Vec<String> = session.standings().into_iter().map(|p| p.id).collect();
        assert_eq!(order, ["bo", "cy", "ana"]);
    }

    #[test]
    fn standings_ties_preserve_join_order() {
        let session = session_with_players(&[("ana", 4), ("bo", 4), ("cy", 4)]);
        let order: Vec<String> = session.standings().into_iter().map(|p| p.id).collect();
        assert_eq!(order, ["ana", "bo", "cy"]);
    }

    #[test]
    fn questions_install_only_once() {
        let mut session = session_with_players(&[("ana", 0)]);
        let question = Question {
            text: "first".into(),
            options: vec!["a".into(), "b".into()],
            correct_option_index: 0,
            bible_reference: None,
            points: 1,
            time_limit: Duration::from_secs(12),
        };

        assert!(session.install_questions(vec![question.clone()]));
        assert!(!session.install_questions(vec![question.clone(), question]));
        assert_eq!(session.questions.len(), 1);
    }
}
