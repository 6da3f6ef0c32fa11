//! Drives each session through waiting → starting → active → finished,
//! arming and disarming the session's timers along the way.
//!
//! Every timer task does nothing but wait out its deadline and then spawn its
//! handler on a fresh task. Handlers therefore never run on a task whose
//! handle sits in a timer slot, so canceling or re-arming a slot can never
//! abort a handler that is halfway through a transition.

use std::time::Duration;

use tokio::time::{MissedTickBehavior, interval, sleep};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dao::scoreboard::{CompletedGameEntity, LeaderboardEntry},
    error::EngineError,
    services::{presenter_events, scoring},
    state::{
        SharedEngine,
        game::{Difficulty, GameSession},
        state_machine::{FinishReason, GameEvent, GamePhase},
        timers::TimerHandle,
    },
};

/// Request the transition out of `waiting`: only the session owner may start
/// the game. Solo sessions call [`begin_generation`] directly at creation.
pub async fn request_start(
    engine: &SharedEngine,
    session_id: Uuid,
    requested_by: &str,
) -> Result<(), EngineError> {
    let owner_id = engine
        .registry()
        .with_session(session_id, |session| session.owner_id.clone())
        .await?;
    if owner_id != requested_by {
        return Err(EngineError::NotGameOwner(
            requested_by.to_string(),
            session_id,
        ));
    }

    begin_generation(engine, session_id).await
}

/// Move the session into `starting`: kick off question generation and arm
/// the progress poll plus the generation timeout.
pub async fn begin_generation(
    engine: &SharedEngine,
    session_id: Uuid,
) -> Result<(), EngineError> {
    let (difficulty, count) = engine
        .registry()
        .with_session_mut(session_id, |session| {
            session.apply_event(GameEvent::StartGeneration)?;
            Ok::<_, EngineError>((session.difficulty, session.total_questions))
        })
        .await??;

    info!(%session_id, ?difficulty, count, "question generation requested");

    spawn_generation(engine, session_id, difficulty, count);
    arm_poll_timer(engine, session_id);
    arm_generation_timeout(engine, session_id);
    Ok(())
}

/// Run the question source call in the background and store the batch when
/// it lands. A failed call is logged; the generation timeout decides what
/// happens next.
fn spawn_generation(engine: &SharedEngine, session_id: Uuid, difficulty: Difficulty, count: usize) {
    let engine = engine.clone();
    let batch_future = engine.question_source().generate(difficulty, count);

    let defaults = engine.config().difficulty(difficulty);
    tokio::spawn(async move {
        match batch_future.await {
            Ok(mut batch) => {
                // Questions that don't override timing or reward fall back
                // to the difficulty table.
                for question in batch.iter_mut() {
                    if question.time_limit.is_zero() {
                        question.time_limit = defaults.time_limit;
                    }
                    if question.points == 0 {
                        question.points = defaults.points;
                    }
                }
                let delivered = batch.len();
                let stored = engine
                    .registry()
                    .with_session_mut(session_id, |session| session.install_questions(batch))
                    .await;
                match stored {
                    Ok(true) => debug!(%session_id, delivered, "question batch stored"),
                    Ok(false) => warn!(%session_id, "duplicate question batch ignored"),
                    Err(_) => debug!(%session_id, "session gone before its batch arrived"),
                }
            }
            Err(err) => {
                warn!(%session_id, error = %err, "question generation failed; awaiting timeout fallback");
            }
        }
    });
}

/// Arm the repeating progress poll. The poll stops itself as soon as it
/// detects readiness and hands the transition off.
fn arm_poll_timer(engine: &SharedEngine, session_id: Uuid) {
    let Ok(entry) = engine.registry().lookup(session_id) else {
        return;
    };
    let poll_interval = engine.config().poll_interval;
    let engine = engine.clone();

    let task = tokio::spawn(async move {
        let mut ticker = interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick of an interval completes immediately; skip it so
        // the first real check happens one interval after arming.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if poll_generation_once(&engine, session_id).await {
                let engine = engine.clone();
                tokio::spawn(async move {
                    conclude_generation(&engine, session_id, false).await;
                });
                break;
            }
        }
    });

    entry.timers().arm_poll(TimerHandle::new(task));
}

/// One progress check. Returns `true` when polling should stop, either
/// because the batch is ready or because the session is gone.
async fn poll_generation_once(engine: &SharedEngine, session_id: Uuid) -> bool {
    // The external progress check is advisory; a network failure here is
    // logged and never cancels the timeout fallback.
    match engine.question_source().poll_progress(session_id).await {
        Ok(progress) => {
            debug!(%session_id, ready = progress.ready, "generation progress polled");
        }
        Err(err) => {
            warn!(%session_id, error = %err, "generation progress poll failed");
        }
    }

    match engine
        .registry()
        .with_session(session_id, |session| {
            (session.phase(), session.questions_ready())
        })
        .await
    {
        Ok((GamePhase::Starting, ready)) => ready,
        // Phase moved on without us (timeout fallback won the race).
        Ok(_) => true,
        Err(_) => true,
    }
}

/// Arm the one-shot generation deadline that wins when the source never
/// reports readiness.
fn arm_generation_timeout(engine: &SharedEngine, session_id: Uuid) {
    let Ok(entry) = engine.registry().lookup(session_id) else {
        return;
    };
    let deadline = engine.config().generation_timeout;
    let engine = engine.clone();

    let task = tokio::spawn(async move {
        sleep(deadline).await;
        tokio::spawn(async move {
            conclude_generation(&engine, session_id, true).await;
        });
    });

    entry.timers().arm_generation_timeout(TimerHandle::new(task));
}

/// Leave `starting`: cancel both generation timers and enter active play with
/// whatever questions are available, or finish with the no-content outcome
/// when the batch is empty.
async fn conclude_generation(engine: &SharedEngine, session_id: Uuid, timed_out: bool) {
    let Ok(entry) = engine.registry().lookup(session_id) else {
        return;
    };
    entry.timers().cancel_poll();
    entry.timers().cancel_generation_timeout();

    enum Outcome {
        Play,
        Empty,
        Stale,
    }

    let outcome = {
        let mut session = entry.session().write().await;
        if session.phase() != GamePhase::Starting {
            // Poll and timeout both fired; the first one already decided.
            Outcome::Stale
        } else if session.questions.is_empty() {
            match session.apply_event(GameEvent::QuestionsExhausted) {
                Ok(_) => Outcome::Empty,
                Err(err) => {
                    warn!(%session_id, error = %err, "failed to close empty session");
                    Outcome::Stale
                }
            }
        } else {
            let event = if timed_out {
                GameEvent::GenerationTimedOut
            } else {
                GameEvent::GenerationReady
            };
            match session.apply_event(event) {
                Ok(_) => Outcome::Play,
                Err(err) => {
                    warn!(%session_id, error = %err, "failed to enter active play");
                    Outcome::Stale
                }
            }
        }
    };

    match outcome {
        Outcome::Play => {
            info!(%session_id, timed_out, "entering active play");
            // Countdown before the first question.
            schedule_question(engine, session_id, engine.config().between_questions);
        }
        Outcome::Empty => {
            info!(%session_id, "no questions generated; ending with no content");
            finalize(engine, session_id).await;
        }
        Outcome::Stale => {}
    }
}

/// Arm the question slot with a delayed opening of the next question. Also
/// serves as the countdown before the first question.
fn schedule_question(engine: &SharedEngine, session_id: Uuid, delay: Duration) {
    let Ok(entry) = engine.registry().lookup(session_id) else {
        return;
    };
    let engine = engine.clone();

    let task = tokio::spawn(async move {
        sleep(delay).await;
        tokio::spawn(async move {
            open_question(&engine, session_id).await;
        });
    });

    entry.timers().arm_question(TimerHandle::new(task));
}

/// Present the question at the cursor and arm its answer timer.
async fn open_question(engine: &SharedEngine, session_id: Uuid) {
    let Ok(entry) = engine.registry().lookup(session_id) else {
        return;
    };

    let (index, time_limit) = {
        let session = entry.session().read().await;
        if session.phase() != GamePhase::Active {
            return;
        }
        let Some(question) = session.current_question() else {
            warn!(%session_id, "no question at cursor; nothing to open");
            return;
        };

        presenter_events::present_current_question(engine, &session);
        (session.current_question_index, question.time_limit)
    };
    debug!(%session_id, index, ?time_limit, "question opened");

    let engine = engine.clone();
    let task = tokio::spawn(async move {
        sleep(time_limit).await;
        tokio::spawn(async move {
            close_question(&engine, session_id, index).await;
        });
    });

    entry.timers().arm_question(TimerHandle::new(task));
}

/// Answer-window expiry: evaluate the question, present its results, and
/// either schedule the next question or finish the game.
async fn close_question(engine: &SharedEngine, session_id: Uuid, index: usize) {
    let Ok(entry) = engine.registry().lookup(session_id) else {
        return;
    };

    let exhausted = {
        let mut session = entry.session().write().await;
        if session.phase() != GamePhase::Active || session.current_question_index != index {
            // Stale timer from a question that already closed.
            return;
        }

        if scoring::evaluate(&mut session) {
            presenter_events::present_question_result(engine, &session, index);
        }
        session.advance_cursor();
        session.questions_exhausted()
    };

    if !exhausted {
        schedule_question(engine, session_id, engine.config().between_questions);
        return;
    }

    let closed = engine
        .registry()
        .with_session_mut(session_id, |session| {
            session.apply_event(GameEvent::QuestionsExhausted)
        })
        .await;
    match closed {
        Ok(Ok(_)) => finalize(engine, session_id).await,
        Ok(Err(err)) => warn!(%session_id, error = %err, "failed to close finished game"),
        Err(_) => {}
    }
}

/// Mark the session abandoned because its last player left, then clean up.
pub async fn abandon(engine: &SharedEngine, session_id: Uuid) {
    let closed = engine
        .registry()
        .with_session_mut(session_id, |session| session.apply_event(GameEvent::Abandon))
        .await;
    match closed {
        Ok(Ok(_)) => {
            info!(%session_id, "all players left; abandoning session");
            finalize(engine, session_id).await;
        }
        Ok(Err(err)) => {
            // Already finished; teardown alone is enough.
            debug!(%session_id, error = %err, "abandon on finished session");
            engine.registry().teardown(session_id).await;
        }
        Err(_) => {}
    }
}

/// Terminal-phase work: cancel residual timers, persist completion
/// best-effort, deliver final standings and the review, and release the
/// session from the registry.
async fn finalize(engine: &SharedEngine, session_id: Uuid) {
    let Ok(entry) = engine.registry().lookup(session_id) else {
        return;
    };
    entry.timers().cancel_all();

    let snapshot = { entry.session().read().await.clone() };
    let GamePhase::Finished(reason) = snapshot.phase() else {
        warn!(%session_id, phase = ?snapshot.phase(), "finalize called before terminal phase");
        return;
    };

    if let Some(store) = engine.scoreboard() {
        let entity = completion_entity(&snapshot, reason);
        if let Err(err) = store.record_completion(entity).await {
            // The session itself is the source of truth; a failed write
            // never blocks results delivery.
            warn!(%session_id, error = %err, "failed to persist completion");
        }
    }

    presenter_events::present_final_results(engine, &snapshot);
    engine.registry().teardown(session_id).await;

    info!(%session_id, ?reason, "session released");
}

fn completion_entity(session: &GameSession, reason: FinishReason) -> CompletedGameEntity {
    CompletedGameEntity {
        session_id: session.id,
        difficulty: session.difficulty,
        questions_played: session.question_reviews.len(),
        reason,
        standings: session
            .standings()
            .into_iter()
            .map(|player| LeaderboardEntry {
                player_id: player.id,
                display_name: player.display_name,
                score: player.score,
                correct_answers: player.correct_answers,
            })
            .collect(),
    }
}
