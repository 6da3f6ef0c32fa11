//! The engine-facing command surface. Every operation validates its input,
//! mutates state through the registry, and reports failures as typed
//! [`EngineError`]s for the caller's user-facing messaging.

use tracing::info;
use uuid::Uuid;

use crate::{
    dto::game::GameStatusSummary,
    error::EngineError,
    services::{lifecycle, scoring},
    state::{
        SharedEngine,
        game::{Difficulty, GameSession, PlayerState},
    },
};

/// Create a single-player session. Solo games request question generation
/// immediately; there is no lobby to wait for.
pub async fn create_solo(
    engine: &SharedEngine,
    owner_id: &str,
    display_name: &str,
    difficulty: Difficulty,
    question_count: usize,
) -> Result<GameStatusSummary, EngineError> {
    let (owner_id, display_name) = validate_player(owner_id, display_name)?;
    validate_question_count(engine, question_count)?;

    let session = GameSession::new(owner_id, display_name, difficulty, question_count, 1, true);
    let session_id = engine.registry().create_session(session)?;
    info!(%session_id, ?difficulty, question_count, "solo game created");

    lifecycle::begin_generation(engine, session_id).await?;
    status_summary(engine, session_id).await
}

/// Create a multiplayer session in the waiting phase. Other players may join
/// until the owner starts the game.
pub async fn create_multiplayer(
    engine: &SharedEngine,
    owner_id: &str,
    display_name: &str,
    difficulty: Difficulty,
    question_count: usize,
    max_players: usize,
) -> Result<GameStatusSummary, EngineError> {
    let (owner_id, display_name) = validate_player(owner_id, display_name)?;
    validate_question_count(engine, question_count)?;

    if max_players < 2 {
        return Err(EngineError::InvalidInput(
            "a multiplayer game needs room for at least two players".into(),
        ));
    }
    if max_players > engine.config().max_players_limit {
        return Err(EngineError::InvalidInput(format!(
            "at most {} players are supported",
            engine.config().max_players_limit
        )));
    }

    let session = GameSession::new(
        owner_id,
        display_name,
        difficulty,
        question_count,
        max_players,
        false,
    );
    let session_id = engine.registry().create_session(session)?;
    info!(%session_id, ?difficulty, question_count, max_players, "multiplayer game created");

    status_summary(engine, session_id).await
}

/// Start a waiting multiplayer game. Only the owner may start it.
pub async fn start(
    engine: &SharedEngine,
    session_id: Uuid,
    requested_by: &str,
) -> Result<(), EngineError> {
    lifecycle::request_start(engine, session_id, requested_by).await
}

/// Join a session that is still accepting players.
pub async fn join(
    engine: &SharedEngine,
    session_id: Uuid,
    player_id: &str,
    display_name: &str,
) -> Result<(), EngineError> {
    let (player_id, display_name) = validate_player(player_id, display_name)?;
    engine
        .registry()
        .join_session(session_id, PlayerState::new(player_id, display_name))
        .await
}

/// Leave whatever game the player is in. Leaving only clears the player's
/// own state; the session continues unless nobody is left in it.
pub async fn quit(engine: &SharedEngine, player_id: &str) -> Result<(), EngineError> {
    let Some((session_id, now_empty)) = engine.registry().remove_player(player_id).await else {
        return Err(EngineError::PlayerNotInSession(player_id.to_string()));
    };

    info!(%session_id, player_id, "player left the game");
    if now_empty {
        lifecycle::abandon(engine, session_id).await;
    }
    Ok(())
}

/// Status of the game the player is currently in.
pub async fn get_status(
    engine: &SharedEngine,
    player_id: &str,
) -> Result<GameStatusSummary, EngineError> {
    let Some(session_id) = engine.registry().session_for_player(player_id) else {
        return Err(EngineError::PlayerNotInSession(player_id.to_string()));
    };
    status_summary(engine, session_id).await
}

/// Submit (or correct) an answer for the current question.
pub async fn submit_answer(
    engine: &SharedEngine,
    session_id: Uuid,
    player_id: &str,
    choice_index: usize,
) -> Result<(), EngineError> {
    scoring::record_answer(engine, session_id, player_id, choice_index).await
}

async fn status_summary(
    engine: &SharedEngine,
    session_id: Uuid,
) -> Result<GameStatusSummary, EngineError> {
    engine
        .registry()
        .with_session(session_id, |session| GameStatusSummary::from(session))
        .await
}

fn validate_player(player_id: &str, display_name: &str) -> Result<(String, String), EngineError> {
    let player_id = player_id.trim();
    if player_id.is_empty() {
        return Err(EngineError::InvalidInput(
            "player id must not be empty".into(),
        ));
    }
    let display_name = display_name.trim();
    if display_name.is_empty() {
        return Err(EngineError::InvalidInput(
            "player name must not be empty".into(),
        ));
    }
    Ok((player_id.to_string(), display_name.to_string()))
}

fn validate_question_count(engine: &SharedEngine, count: usize) -> Result<(), EngineError> {
    if !engine.config().question_count_allowed(count) {
        return Err(EngineError::InvalidInput(format!(
            "question count must be between {} and {}",
            engine.config().min_questions,
            engine.config().max_questions
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, sync::Arc};

    use super::*;
    use crate::{
        config::EngineConfig,
        dao::question_source::LocalQuestionSource,
        dto::phase::VisiblePhase,
        presenter::NullPresenter,
        state::EngineState,
    };

    fn engine() -> SharedEngine {
        EngineState::new(
            EngineConfig::default(),
            Arc::new(LocalQuestionSource::new(HashMap::new())),
            Arc::new(NullPresenter),
            None,
        )
    }

    #[tokio::test]
    async fn question_count_bounds_are_enforced_before_creation() {
        let engine = engine();

        for count in [0, 4, 21] {
            let err = create_solo(&engine, "ana", "Ana", Difficulty::Easy, count)
                .await
                .unwrap_err();
            assert!(matches!(err, EngineError::InvalidInput(_)));
        }
        assert_eq!(engine.registry().session_count(), 0);
    }

    #[tokio::test]
    async fn solo_creation_enters_starting_immediately() {
        let engine = engine();
        let summary = create_solo(&engine, "ana", "Ana", Difficulty::Easy, 5)
            .await
            .unwrap();
        assert_eq!(summary.phase, VisiblePhase::Starting);
        assert!(summary.is_solo);
        assert_eq!(summary.players.len(), 1);
    }

    #[tokio::test]
    async fn multiplayer_waits_for_owner_start() {
        let engine = engine();
        let summary =
            create_multiplayer(&engine, "ana", "Ana", Difficulty::Medium, 5, 4)
                .await
                .unwrap();
        assert_eq!(summary.phase, VisiblePhase::Waiting);

        join(&engine, summary.id, "bo", "Bo").await.unwrap();

        let err = start(&engine, summary.id, "bo").await.unwrap_err();
        assert!(matches!(err, EngineError::NotGameOwner(_, _)));

        start(&engine, summary.id, "ana").await.unwrap();
        let status = get_status(&engine, "bo").await.unwrap();
        assert_eq!(status.phase, VisiblePhase::Starting);
    }

    #[tokio::test]
    async fn quit_requires_membership() {
        let engine = engine();
        let err = quit(&engine, "ghost").await.unwrap_err();
        assert!(matches!(err, EngineError::PlayerNotInSession(_)));
    }

    #[tokio::test]
    async fn second_game_per_player_is_rejected() {
        let engine = engine();
        create_multiplayer(&engine, "ana", "Ana", Difficulty::Easy, 5, 4)
            .await
            .unwrap();
        let err = create_solo(&engine, "ana", "Ana", Difficulty::Easy, 5)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::AlreadyInGame(_)));
    }
}
