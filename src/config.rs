//! Engine-level configuration: the difficulty table and the timing knobs
//! driving generation polling and question countdowns.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::state::game::Difficulty;

/// Default location on disk where the engine looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/engine.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "TRIVIA_ENGINE_CONFIG_PATH";

/// Per-difficulty gameplay parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DifficultySettings {
    /// How long players may answer each question.
    pub time_limit: Duration,
    /// Points awarded per correct answer.
    pub points: u32,
}

/// Immutable runtime configuration shared across the engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    easy: DifficultySettings,
    medium: DifficultySettings,
    hard: DifficultySettings,
    expert: DifficultySettings,
    /// Smallest question count a session may be created with.
    pub min_questions: usize,
    /// Largest question count a session may be created with.
    pub max_questions: usize,
    /// Upper bound on players accepted into a multiplayer session.
    pub max_players_limit: usize,
    /// Interval between generation progress checks.
    pub poll_interval: Duration,
    /// Deadline after which generation proceeds with whatever arrived.
    pub generation_timeout: Duration,
    /// Pause between a question's results and the next question, also used
    /// as the countdown before the first question.
    pub between_questions: Duration,
}

impl EngineConfig {
    /// Load the engine configuration from disk, falling back to the baked-in
    /// defaults when the file is absent or malformed.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(path = %path.display(), "loaded engine config");
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Look up the time limit and points for a difficulty level.
    pub fn difficulty(&self, level: Difficulty) -> DifficultySettings {
        match level {
            Difficulty::Easy => self.easy,
            Difficulty::Medium => self.medium,
            Difficulty::Hard => self.hard,
            Difficulty::Expert => self.expert,
        }
    }

    /// Whether a requested question count falls inside the configured bounds.
    pub fn question_count_allowed(&self, count: usize) -> bool {
        (self.min_questions..=self.max_questions).contains(&count)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            easy: DifficultySettings {
                time_limit: Duration::from_secs(12),
                points: 1,
            },
            medium: DifficultySettings {
                time_limit: Duration::from_secs(10),
                points: 2,
            },
            hard: DifficultySettings {
                time_limit: Duration::from_secs(8),
                points: 3,
            },
            expert: DifficultySettings {
                time_limit: Duration::from_secs(6),
                points: 5,
            },
            min_questions: 5,
            max_questions: 20,
            max_players_limit: 16,
            poll_interval: Duration::from_secs(3),
            generation_timeout: Duration::from_secs(60),
            between_questions: Duration::from_secs(5),
        }
    }
}

/// JSON representation of the configuration file.
#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    difficulties: Vec<RawDifficulty>,
    min_questions: Option<usize>,
    max_questions: Option<usize>,
    max_players_limit: Option<usize>,
    poll_interval_secs: Option<u64>,
    generation_timeout_secs: Option<u64>,
    between_questions_secs: Option<u64>,
}

/// JSON representation of one difficulty table row.
#[derive(Debug, Deserialize)]
struct RawDifficulty {
    level: Difficulty,
    time_limit_secs: u64,
    points: u32,
}

impl From<RawConfig> for EngineConfig {
    fn from(raw: RawConfig) -> Self {
        let mut config = EngineConfig::default();

        for row in raw.difficulties {
            let settings = DifficultySettings {
                time_limit: Duration::from_secs(row.time_limit_secs),
                points: row.points,
            };
            match row.level {
                Difficulty::Easy => config.easy = settings,
                Difficulty::Medium => config.medium = settings,
                Difficulty::Hard => config.hard = settings,
                Difficulty::Expert => config.expert = settings,
            }
        }

        if let Some(value) = raw.min_questions {
            config.min_questions = value;
        }
        if let Some(value) = raw.max_questions {
            config.max_questions = value;
        }
        if let Some(value) = raw.max_players_limit {
            config.max_players_limit = value;
        }
        if let Some(value) = raw.poll_interval_secs {
            config.poll_interval = Duration::from_secs(value);
        }
        if let Some(value) = raw.generation_timeout_secs {
            config.generation_timeout = Duration::from_secs(value);
        }
        if let Some(value) = raw.between_questions_secs {
            config.between_questions = Duration::from_secs(value);
        }

        config
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
