//! Demo binary: wires the engine to the bundled local question bank and
//! plays one solo game end-to-end, printing presenter events as they arrive.

use std::{collections::HashMap, sync::Arc, time::Duration};

use rand::Rng;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use verse_trivia_engine::{
    config::EngineConfig,
    dao::{question_source::LocalQuestionSource, scoreboard::InMemoryScoreboard},
    presenter::{EventPayload, HubPresenter},
    services::game_service,
    state::{
        EngineState,
        game::{Difficulty, Question},
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    // Shorten the pacing knobs so the demo plays out in seconds.
    let mut config = EngineConfig::load();
    config.poll_interval = Duration::from_secs(1);
    config.between_questions = Duration::from_secs(1);

    let presenter = Arc::new(HubPresenter::new(16));
    let mut events = presenter.subscribe();
    let scoreboard = Arc::new(InMemoryScoreboard::new());

    let engine = EngineState::new(
        config,
        Arc::new(LocalQuestionSource::new(demo_bank())),
        presenter.clone(),
        Some(scoreboard.clone()),
    );

    let summary =
        game_service::create_solo(&engine, "demo-player", "Demo Player", Difficulty::Easy, 5)
            .await?;
    info!(session_id = %summary.id, "solo game started");

    while let Ok(event) = events.recv().await {
        println!("{}", serde_json::to_string_pretty(&event)?);

        match &event.payload {
            EventPayload::Question(question) => {
                let guess = rand::rng().random_range(0..question.options.len());
                if let Err(err) =
                    game_service::submit_answer(&engine, summary.id, "demo-player", guess).await
                {
                    warn!(error = %err, "failed to submit demo answer");
                }
            }
            EventPayload::Review { .. } => break,
            _ => {}
        }
    }

    for record in scoreboard.records() {
        info!(
            session_id = %record.session_id,
            questions_played = record.questions_played,
            reason = ?record.reason,
            "completion recorded"
        );
    }

    Ok(())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Small built-in bank so the demo works without any external source. The
/// four-second limits override the difficulty table; the zeroed points fall
/// back to it.
fn demo_bank() -> HashMap<Difficulty, Vec<Question>> {
    let easy = [
        (
            "Who built the ark?",
            ["Moses", "Noah", "Abraham", "David"],
            1,
            "Genesis 6:14",
        ),
        (
            "How many days and nights did it rain in the flood?",
            ["7", "12", "40", "100"],
            2,
            "Genesis 7:12",
        ),
        (
            "Who was swallowed by a great fish?",
            ["Jonah", "Peter", "Elijah", "Paul"],
            0,
            "Jonah 1:17",
        ),
        (
            "What did David use to defeat Goliath?",
            ["A sword", "A spear", "A sling", "A bow"],
            2,
            "1 Samuel 17:50",
        ),
        (
            "Who received the Ten Commandments?",
            ["Aaron", "Moses", "Joshua", "Samuel"],
            1,
            "Exodus 20",
        ),
        (
            "In what city was Jesus born?",
            ["Nazareth", "Jerusalem", "Bethlehem", "Capernaum"],
            2,
            "Luke 2:4",
        ),
    ];

    let questions = easy
        .into_iter()
        .map(|(text, options, correct, reference)| Question {
            text: text.into(),
            options: options.into_iter().map(Into::into).collect(),
            correct_option_index: correct,
            bible_reference: Some(reference.into()),
            points: 0,
            time_limit: Duration::from_secs(4),
        })
        .collect();

    let mut bank = HashMap::new();
    bank.insert(Difficulty::Easy, questions);
    bank
}
