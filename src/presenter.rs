//! Presenter boundary: where questions, results, and reviews leave the
//! engine. Delivery is fire-and-forget; a failed or missing subscriber never
//! affects session state.

use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::dto::game::{PlayerStanding, QuestionResultSummary, QuestionSnapshot};

/// Who an event is meant for. Solo sessions deliver privately to their only
/// player instead of broadcasting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    /// Everyone watching the session.
    Public,
    /// A single player, addressed by identifier.
    Player(String),
}

/// Routing envelope attached to every delivery.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryContext {
    /// The session the event belongs to.
    pub session_id: Uuid,
    /// Who should see the event.
    pub audience: Audience,
}

/// Payload of one presenter delivery.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EventPayload {
    /// A question is now open for answers.
    Question(QuestionSnapshot),
    /// A question's answer window closed and was evaluated.
    QuestionResult(QuestionResultSummary),
    /// The game ended; final standings, best first.
    FinalResults {
        /// Standings sorted by score descending, ties in join order.
        standings: Vec<PlayerStanding>,
    },
    /// Question-by-question review delivered after the final results.
    Review {
        /// One result summary per evaluated question, in question order.
        questions: Vec<QuestionResultSummary>,
    },
}

/// One event as seen by presenter subscribers.
#[derive(Debug, Clone, Serialize)]
pub struct PresenterEvent {
    /// Routing envelope.
    #[serde(flatten)]
    pub context: DeliveryContext,
    /// What happened.
    #[serde(flatten)]
    pub payload: EventPayload,
}

/// Outbound rendering boundary. Implementations must not block; the engine
/// calls these from timer callbacks and never awaits delivery.
pub trait Presenter: Send + Sync {
    /// Render the current question.
    fn show_question(&self, context: DeliveryContext, question: QuestionSnapshot);
    /// Render a question's per-player results.
    fn show_question_result(&self, context: DeliveryContext, result: QuestionResultSummary);
    /// Render the final leaderboard.
    fn show_final_results(&self, context: DeliveryContext, standings: Vec<PlayerStanding>);
    /// Render the end-of-game question review.
    fn show_review(&self, context: DeliveryContext, review: Vec<QuestionResultSummary>);
}

/// Presenter that fans events out over a broadcast channel, the engine-side
/// equivalent of a server-sent-events hub. Send errors (no subscribers) are
/// ignored.
pub struct HubPresenter {
    sender: broadcast::Sender<PresenterEvent>,
}

impl HubPresenter {
    /// Construct a hub backed by a broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<PresenterEvent> {
        self.sender.subscribe()
    }

    fn broadcast(&self, context: DeliveryContext, payload: EventPayload) {
        let _ = self.sender.send(PresenterEvent { context, payload });
    }
}

impl Presenter for HubPresenter {
    fn show_question(&self, context: DeliveryContext, question: QuestionSnapshot) {
        self.broadcast(context, EventPayload::Question(question));
    }

    fn show_question_result(&self, context: DeliveryContext, result: QuestionResultSummary) {
        self.broadcast(context, EventPayload::QuestionResult(result));
    }

    fn show_final_results(&self, context: DeliveryContext, standings: Vec<PlayerStanding>) {
        self.broadcast(context, EventPayload::FinalResults { standings });
    }

    fn show_review(&self, context: DeliveryContext, review: Vec<QuestionResultSummary>) {
        self.broadcast(context, EventPayload::Review { questions: review });
    }
}

/// Presenter that drops everything, for tests that only exercise state.
#[derive(Default)]
pub struct NullPresenter;

impl Presenter for NullPresenter {
    fn show_question(&self, _context: DeliveryContext, _question: QuestionSnapshot) {}
    fn show_question_result(&self, _context: DeliveryContext, _result: QuestionResultSummary) {}
    fn show_final_results(&self, _context: DeliveryContext, _standings: Vec<PlayerStanding>) {}
    fn show_review(&self, _context: DeliveryContext, _review: Vec<QuestionResultSummary>) {}
}
