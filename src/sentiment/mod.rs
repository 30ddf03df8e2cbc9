//! Sentiment scoring.

use std::sync::Arc;

use strum::{AsRefStr, Display, EnumString};

use crate::{
    error::Error,
    extraction::NO_TEXT_PLACEHOLDER,
    utils::{truncate_bytes, BoxFuture},
};

pub mod comprehend;

/// Largest input, in UTF-8 bytes, the scoring service accepts.
pub const MAX_SENTIMENT_BYTES: usize = 5000;

/// Overall sentiment of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumString)]
#[strum(serialize_all = "UPPERCASE")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
    Mixed,
    /// The service answered without a recognizable label.
    Error,
}

/// Label plus the service's confidence that the text is positive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SentimentResult {
    label: SentimentLabel,
    positive_score: f32,
}

impl SentimentResult {
    /// Creates a result, clamping `positive_score` into `[0, 1]`.
    /// A non-finite score is treated as absent and becomes `0`.
    pub fn new(label: SentimentLabel, positive_score: f32) -> Self {
        let positive_score = if positive_score.is_finite() {
            positive_score.clamp(0.0, 1.0)
        } else {
            0.0
        };

        Self {
            label,
            positive_score,
        }
    }

    pub fn label(&self) -> SentimentLabel {
        self.label
    }

    pub fn positive_score(&self) -> f32 {
        self.positive_score
    }
}

/// A sentiment-scoring capability.
pub trait SentimentDetector: Send + Sync + 'static {
    /// Scores `text`, written in `language_code`. `text` is never empty.
    fn detect_sentiment<'a>(
        &'a self,
        language_code: &'a str,
        text: &'a str,
    ) -> BoxFuture<'a, eyre::Result<SentimentResult>>;
}

/// Scoring stage of the pipeline.
#[derive(Clone)]
pub struct SentimentClient {
    detector: Arc<dyn SentimentDetector>,
    language_code: String,
}

impl SentimentClient {
    pub fn new(detector: impl SentimentDetector, language_code: impl Into<String>) -> Self {
        Self {
            detector: Arc::new(detector),
            language_code: language_code.into(),
        }
    }

    /// Scores `text`. Empty input is replaced by the extraction placeholder,
    /// since the service rejects empty text. Input beyond
    /// [`MAX_SENTIMENT_BYTES`] is cut at a character boundary.
    pub async fn score(&self, text: &str) -> Result<SentimentResult, Error> {
        let text = if text.trim().is_empty() {
            NO_TEXT_PLACEHOLDER
        } else {
            truncate_bytes(text, MAX_SENTIMENT_BYTES)
        };

        self.detector
            .detect_sentiment(&self.language_code, text)
            .await
            .map_err(|source| Error::Sentiment { source })
    }
}
