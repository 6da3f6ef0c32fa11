use std::collections::HashMap;

use futures::future::BoxFuture;
use rand::seq::SliceRandom;
use thiserror::Error;
use uuid::Uuid;

use crate::state::game::{Difficulty, Question};

/// Result alias for question source operations.
pub type SourceResult<T> = Result<T, SourceError>;

/// Error raised by question sources regardless of where questions come from.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The source could not produce or report on a batch.
    #[error("question source unavailable: {message}")]
    Unavailable {
        /// Human readable description of the failure.
        message: String,
        /// Underlying backend failure.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl SourceError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(
        message: String,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        SourceError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}

/// Progress report for an in-flight generation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationProgress {
    /// Whether the batch is ready to be consumed.
    pub ready: bool,
}

/// Abstraction over wherever trivia questions come from. Sources may answer
/// synchronously (a local bank) or asynchronously (a remote generator); the
/// engine treats both uniformly by always polling during the starting phase.
pub trait QuestionSource: Send + Sync {
    /// Produce a batch of `count` questions for the difficulty. The future
    /// resolving is what makes a session's batch ready.
    fn generate(
        &self,
        difficulty: Difficulty,
        count: usize,
    ) -> BoxFuture<'static, SourceResult<Vec<Question>>>;

    /// External progress check for asynchronous sources. Failures here are
    /// logged by the caller and never abort the generation deadline.
    fn poll_progress(&self, session_id: Uuid) -> BoxFuture<'static, SourceResult<GenerationProgress>>;
}

/// In-process question source backed by a fixed per-difficulty bank. Batches
/// are sampled without replacement, so a bank smaller than the requested
/// count yields a short batch rather than repeats.
pub struct LocalQuestionSource {
    bank: HashMap<Difficulty, Vec<Question>>,
}

impl LocalQuestionSource {
    /// Build a source over the given per-difficulty question bank.
    pub fn new(bank: HashMap<Difficulty, Vec<Question>>) -> Self {
        Self { bank }
    }

    fn sample(&self, difficulty: Difficulty, count: usize) -> Vec<Question> {
        let Some(pool) = self.bank.get(&difficulty) else {
            return Vec::new();
        };

        let mut picked: Vec<Question> = pool.clone();
        picked.shuffle(&mut rand::rng());
        picked.truncate(count);
        picked
    }
}

impl QuestionSource for LocalQuestionSource {
    fn generate(
        &self,
        difficulty: Difficulty,
        count: usize,
    ) -> BoxFuture<'static, SourceResult<Vec<Question>>> {
        let batch = self.sample(difficulty, count);
        Box::pin(async move { Ok(batch) })
    }

    fn poll_progress(
        &self,
        _session_id: Uuid,
    ) -> BoxFuture<'static, SourceResult<GenerationProgress>> {
        Box::pin(async move { Ok(GenerationProgress { ready: true }) })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn question(text: &str) -> Question {
        Question {
            text: text.into(),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_option_index: 0,
            bible_reference: None,
            points: 1,
            time_limit: Duration::from_secs(12),
        }
    }

    #[tokio::test]
    async fn samples_at_most_the_requested_count() {
        let mut bank = HashMap::new();
        bank.insert(
            Difficulty::Easy,
            (0..10).map(|i| question(&format!("q{i}"))).collect(),
        );
        let source = LocalQuestionSource::new(bank);

        let batch = source.generate(Difficulty::Easy, 5).await.unwrap();
        assert_eq!(batch.len(), 5);
    }

    #[tokio::test]
    async fn short_bank_yields_short_batch() {
        let mut bank = HashMap::new();
        bank.insert(Difficulty::Hard, vec![question("only")]);
        let source = LocalQuestionSource::new(bank);

        let batch = source.generate(Difficulty::Hard, 5).await.unwrap();
        assert_eq!(batch.len(), 1);
        assert!(source.generate(Difficulty::Easy, 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn local_source_is_always_ready() {
        let source = LocalQuestionSource::new(HashMap::new());
        let progress = source.poll_progress(Uuid::new_v4()).await.unwrap();
        assert!(progress.ready);
    }
}
