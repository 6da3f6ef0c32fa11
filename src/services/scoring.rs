//! Answer recording and question evaluation. Recording happens on player
//! input at any point of the answer window; evaluation happens exactly once
//! per question, driven by the lifecycle controller on timer expiry.

use indexmap::IndexMap;
use std::time::SystemTime;
use tracing::warn;
use uuid::Uuid;

use crate::{
    error::EngineError,
    state::{
        SharedEngine,
        game::{GameSession, ReviewEntry},
        state_machine::GamePhase,
    },
};

/// Record a player's answer for the current question. The last answer
/// submitted before the timer fires wins; resubmission overwrites rather
/// than locking out, tolerating corrected input.
pub async fn record_answer(
    engine: &SharedEngine,
    session_id: Uuid,
    player_id: &str,
    choice: usize,
) -> Result<(), EngineError> {
    match engine.registry().session_for_player(player_id) {
        Some(mapped) if mapped == session_id => {}
        _ => return Err(EngineError::PlayerNotInSession(player_id.to_string())),
    }

    engine
        .registry()
        .with_session_mut(session_id, |session| apply_answer(session, player_id, choice))
        .await?
}

/// Validate and store an answer on the session.
fn apply_answer(
    session: &mut GameSession,
    player_id: &str,
    choice: usize,
) -> Result<(), EngineError> {
    if session.phase() != GamePhase::Active {
        return Err(EngineError::InvalidState(
            "answers are only accepted while a question is open".into(),
        ));
    }

    let Some(question) = session.current_question() else {
        return Err(EngineError::InvalidState(
            "no question is currently open".into(),
        ));
    };
    if choice >= question.options.len() {
        return Err(EngineError::InvalidInput(format!(
            "option index {choice} is out of range (question has {} options)",
            question.options.len()
        )));
    }

    let Some(player) = session.players.get_mut(player_id) else {
        return Err(EngineError::PlayerNotInSession(player_id.to_string()));
    };
    player.selected_answer = Some(choice);
    player.answered_at = Some(SystemTime::now());
    Ok(())
}

/// Score the question at the session's cursor against every player's
/// selected answer, in player join order. Writes the write-once review row
/// before clearing the transient answer fields. Returns `false` (and does
/// nothing) when the question was already evaluated; timers firing
/// redundantly must not double-award.
pub fn evaluate(session: &mut GameSession) -> bool {
    let index = session.current_question_index;
    let Some(question) = session.current_question().cloned() else {
        warn!(session_id = %session.id, index, "evaluation requested past the batch");
        return false;
    };
    if session.question_reviews.contains_key(&index) {
        warn!(session_id = %session.id, index, "question already evaluated; ignoring");
        return false;
    }

    let mut rows = IndexMap::new();
    for (player_id, player) in session.players.iter_mut() {
        let correct = player.selected_answer == Some(question.correct_option_index);
        let awarded = if correct { question.points } else { 0 };

        if correct {
            player.score += awarded;
            player.correct_answers += 1;
        }

        rows.insert(
            player_id.clone(),
            ReviewEntry {
                answer: player.selected_answer,
                correct,
                awarded,
            },
        );

        player.selected_answer = None;
        player.answered_at = None;
    }

    session.question_reviews.insert(index, rows);
    true
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::state::{
        game::{Difficulty, PlayerState, Question},
        state_machine::GameEvent,
    };

    fn question(points: u32) -> Question {
        Question {
            text: "who built the ark?".into(),
            options: vec!["Moses".into(), "Noah".into(), "David".into(), "Paul".into()],
            correct_option_index: 1,
            bible_reference: Some("Genesis 6".into()),
            points,
            time_limit: Duration::from_secs(12),
        }
    }

    fn active_session(players: &[&str]) -> GameSession {
        let mut session = GameSession::new(
            players[0].to_string(),
            players[0].to_string(),
            Difficulty::Easy,
            5,
            8,
            players.len() == 1,
        );
        for id in &players[1..] {
            session
                .players
                .insert(id.to_string(), PlayerState::new(id.to_string(), id.to_string()));
        }
        session.apply_event(GameEvent::StartGeneration).unwrap();
        session.install_questions(vec![question(10), question(10)]);
        session.apply_event(GameEvent::GenerationReady).unwrap();
        session
    }

    #[test]
    fn correct_answer_awards_points_and_count() {
        let mut session = active_session(&["ana", "bo"]);
        apply_answer(&mut session, "ana", 1).unwrap();
        apply_answer(&mut session, "bo", 0).unwrap();

        assert!(evaluate(&mut session));

        let ana = &session.players["ana"];
        assert_eq!(ana.score, 10);
        assert_eq!(ana.correct_answers, 1);
        let bo = &session.players["bo"];
        assert_eq!(bo.score, 0);
        assert_eq!(bo.correct_answers, 0);
    }

    #[test]
    fn silent_player_is_reviewed_as_no_answer() {
        let mut session = active_session(&["ana"]);
        assert!(evaluate(&mut session));

        let review = &session.question_reviews[&0]["ana"];
        assert_eq!(review.answer, None);
        assert!(!review.correct);
        assert_eq!(review.awarded, 0);
        assert_eq!(session.players["ana"].score, 0);
    }

    #[test]
    fn review_is_written_before_transients_are_cleared() {
        let mut session = active_session(&["ana"]);
        apply_answer(&mut session, "ana", 1).unwrap();
        assert!(evaluate(&mut session));

        let review = &session.question_reviews[&0]["ana"];
        assert_eq!(review.answer, Some(1));
        assert!(review.correct);
        let ana = &session.players["ana"];
        assert_eq!(ana.selected_answer, None);
        assert_eq!(ana.answered_at, None);
    }

    #[test]
    fn evaluating_twice_is_a_no_op() {
        let mut session = active_session(&["ana"]);
        apply_answer(&mut session, "ana", 1).unwrap();
        assert!(evaluate(&mut session));
        assert!(!evaluate(&mut session));
        assert_eq!(session.players["ana"].score, 10);
        assert_eq!(session.players["ana"].correct_answers, 1);
    }

    #[test]
    fn last_answer_before_expiry_wins() {
        let mut session = active_session(&["ana"]);
        apply_answer(&mut session, "ana", 0).unwrap();
        apply_answer(&mut session, "ana", 1).unwrap();
        assert!(evaluate(&mut session));
        assert_eq!(session.players["ana"].score, 10);
        assert_eq!(session.question_reviews[&0]["ana"].answer, Some(1));
    }

    #[test]
    fn out_of_range_choice_is_rejected() {
        let mut session = active_session(&["ana"]);
        let err = apply_answer(&mut session, "ana", 4).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }

    #[test]
    fn unknown_player_is_rejected() {
        let mut session = active_session(&["ana"]);
        let err = apply_answer(&mut session, "ghost", 1).unwrap_err();
        assert!(matches!(err, EngineError::PlayerNotInSession(_)));
    }

    #[test]
    fn scores_never_decrease_across_evaluations() {
        let mut session = active_session(&["ana"]);
        apply_answer(&mut session, "ana", 1).unwrap();
        evaluate(&mut session);
        let after_first = session.players["ana"].score;

        session.advance_cursor();
        evaluate(&mut session);
        assert!(session.players["ana"].score >= after_first);
    }
}
