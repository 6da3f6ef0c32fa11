use std::fmt;

use serde::{Serialize, Serializer};
use uuid::Uuid;

use crate::{
    dto::phase::VisiblePhase,
    state::game::{Difficulty, GameSession, PlayerState, Question, ReviewEntry},
};

/// Public projection of one player's running totals.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerStanding {
    /// Player identifier.
    pub id: String,
    /// Name shown to other players.
    pub display_name: String,
    /// Current score.
    pub score: u32,
    /// Correctly answered questions so far.
    pub correct_answers: u32,
}

impl From<&PlayerState> for PlayerStanding {
    fn from(value: &PlayerState) -> Self {
        Self {
            id: value.id.clone(),
            display_name: value.display_name.clone(),
            score: value.score,
            correct_answers: value.correct_answers,
        }
    }
}

/// Summary returned by status queries.
#[derive(Debug, Clone, Serialize)]
pub struct GameStatusSummary {
    /// Session identifier.
    pub id: Uuid,
    /// Current phase of the session.
    pub phase: VisiblePhase,
    /// Difficulty the session was created with.
    pub difficulty: Difficulty,
    /// Questions already consumed by the cursor.
    pub current_question: usize,
    /// Target question count.
    pub total_questions: usize,
    /// Whether output is delivered privately to a single player.
    pub is_solo: bool,
    /// Players in join order with their running totals.
    pub players: Vec<PlayerStanding>,
}

impl From<&GameSession> for GameStatusSummary {
    fn from(session: &GameSession) -> Self {
        Self {
            id: session.id,
            phase: (&session.phase()).into(),
            difficulty: session.difficulty,
            current_question: session.current_question_index,
            total_questions: session.total_questions,
            is_solo: session.is_solo,
            players: session.players.values().map(Into::into).collect(),
        }
    }
}

/// The shape of one question as shown to players. Deliberately omits the
/// correct option index.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionSnapshot {
    /// Zero-based position of the question within the game.
    pub index: usize,
    /// Total number of questions in the game.
    pub total: usize,
    /// The question prompt.
    pub text: String,
    /// Ordered answer options.
    pub options: Vec<String>,
    /// Seconds players have to answer.
    pub time_limit_secs: u64,
    /// Points a correct answer is worth.
    pub points: u32,
}

impl QuestionSnapshot {
    /// Build the snapshot for the question at `index`.
    pub fn new(session: &GameSession, question: &Question, index: usize) -> Self {
        Self {
            index,
            total: session.questions.len(),
            text: question.text.clone(),
            options: question.options.clone(),
            time_limit_secs: question.time_limit.as_secs(),
            points: question.points,
        }
    }
}

/// What one player answered on one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerGiven {
    /// The option index the player chose.
    Choice(usize),
    /// The player never answered before the timer fired.
    NoAnswer,
}

impl From<Option<usize>> for AnswerGiven {
    fn from(value: Option<usize>) -> Self {
        match value {
            Some(index) => AnswerGiven::Choice(index),
            None => AnswerGiven::NoAnswer,
        }
    }
}

impl fmt::Display for AnswerGiven {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnswerGiven::Choice(index) => write!(f, "{index}"),
            AnswerGiven::NoAnswer => write!(f, "no answer"),
        }
    }
}

impl Serialize for AnswerGiven {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            AnswerGiven::Choice(index) => serializer.serialize_u64(*index as u64),
            AnswerGiven::NoAnswer => serializer.serialize_str("no answer"),
        }
    }
}

/// One player's row in a question result or review.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerAnswerSummary {
    /// Player identifier.
    pub id: String,
    /// Name shown next to the answer.
    pub display_name: String,
    /// What was answered, or the "no answer" marker.
    pub answer: AnswerGiven,
    /// Whether the answer was correct.
    pub correct: bool,
    /// Points awarded for this question.
    pub awarded: u32,
}

impl PlayerAnswerSummary {
    fn new(player: &PlayerState, entry: &ReviewEntry) -> Self {
        Self {
            id: player.id.clone(),
            display_name: player.display_name.clone(),
            answer: entry.answer.into(),
            correct: entry.correct,
            awarded: entry.awarded,
        }
    }
}

/// Per-question outcome shown after evaluation and again in the end-of-game
/// review.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionResultSummary {
    /// Zero-based question position.
    pub index: usize,
    /// The question prompt.
    pub text: String,
    /// Index of the correct option.
    pub correct_option_index: usize,
    /// Domain metadata attached to the question.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bible_reference: Option<String>,
    /// Answers in player join order.
    pub answers: Vec<PlayerAnswerSummary>,
}

impl QuestionResultSummary {
    /// Build the result summary for an evaluated question, if its review row
    /// has been written.
    pub fn for_question(session: &GameSession, index: usize) -> Option<Self> {
        let question = session.questions.get(index)?;
        let reviews = session.question_reviews.get(&index)?;

        // Players who quit after answering keep their review rows; fall back
        // to the raw identifier for their display name.
        let answers = reviews
            .iter()
            .map(|(player_id, entry)| match session.players.get(player_id) {
                Some(player) => PlayerAnswerSummary::new(player, entry),
                None => PlayerAnswerSummary {
                    id: player_id.clone(),
                    display_name: player_id.clone(),
                    answer: entry.answer.into(),
                    correct: entry.correct,
                    awarded: entry.awarded,
                },
            })
            .collect();

        Some(Self {
            index,
            text: question.text.clone(),
            correct_option_index: question.correct_option_index,
            bible_reference: question.bible_reference.clone(),
            answers,
        })
    }
}
