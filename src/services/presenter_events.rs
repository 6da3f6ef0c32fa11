//! Assembles presenter payloads from session state and routes them through
//! the configured [`Presenter`]. All helpers are fire-and-forget.

use tracing::warn;

use crate::{
    dto::game::{PlayerStanding, QuestionResultSummary, QuestionSnapshot},
    presenter::{Audience, DeliveryContext},
    state::{SharedEngine, game::GameSession},
};

/// Routing envelope for a session: solo games address their only player
/// privately, everything else broadcasts.
pub fn delivery_context(session: &GameSession) -> DeliveryContext {
    let audience = if session.is_solo {
        Audience::Player(session.owner_id.clone())
    } else {
        Audience::Public
    };
    DeliveryContext {
        session_id: session.id,
        audience,
    }
}

/// Present the question at the session's cursor.
pub fn present_current_question(engine: &SharedEngine, session: &GameSession) {
    let Some(question) = session.current_question() else {
        warn!(session_id = %session.id, "no question at cursor to present");
        return;
    };

    let snapshot = QuestionSnapshot::new(session, question, session.current_question_index);
    engine
        .presenter()
        .show_question(delivery_context(session), snapshot);
}

/// Present the evaluated outcome of the question at `index`.
pub fn present_question_result(engine: &SharedEngine, session: &GameSession, index: usize) {
    let Some(result) = QuestionResultSummary::for_question(session, index) else {
        warn!(session_id = %session.id, index, "no review row to present");
        return;
    };

    engine
        .presenter()
        .show_question_result(delivery_context(session), result);
}

/// Present final standings followed by the question-by-question review.
pub fn present_final_results(engine: &SharedEngine, session: &GameSession) {
    let standings: Vec<PlayerStanding> =
        session.standings().iter().map(Into::into).collect();
    engine
        .presenter()
        .show_final_results(delivery_context(session), standings);

    let review: Vec<QuestionResultSummary> = session
        .question_reviews
        .keys()
        .filter_map(|index| QuestionResultSummary::for_question(session, *index))
        .collect();
    if !review.is_empty() {
        engine
            .presenter()
            .show_review(delivery_context(session), review);
    }
}
