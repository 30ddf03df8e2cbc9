//! Amazon Comprehend implementation of [`SentimentDetector`].

use aws_sdk_comprehend::types::{LanguageCode, SentimentType};

use crate::utils::BoxFuture;

use super::{SentimentDetector, SentimentLabel, SentimentResult};

#[derive(Clone)]
pub struct ComprehendDetector {
    client: aws_sdk_comprehend::Client,
}

impl ComprehendDetector {
    pub fn new(client: aws_sdk_comprehend::Client) -> Self {
        Self { client }
    }
}

impl SentimentDetector for ComprehendDetector {
    fn detect_sentiment<'a>(
        &'a self,
        language_code: &'a str,
        text: &'a str,
    ) -> BoxFuture<'a, eyre::Result<SentimentResult>> {
        Box::pin(async move {
            let output = self
                .client
                .detect_sentiment()
                .language_code(LanguageCode::from(language_code))
                .text(text)
                .send()
                .await?;

            let label = label_for(output.sentiment.as_ref());
            let positive = output
                .sentiment_score
                .and_then(|score| score.positive)
                .unwrap_or(0.0);

            Ok(SentimentResult::new(label, positive))
        })
    }
}

/// Missing or unrecognized sentiment maps to [`SentimentLabel::Error`].
fn label_for(sentiment: Option<&SentimentType>) -> SentimentLabel {
    match sentiment {
        Some(SentimentType::Positive) => SentimentLabel::Positive,
        Some(SentimentType::Negative) => SentimentLabel::Negative,
        Some(SentimentType::Neutral) => SentimentLabel::Neutral,
        Some(SentimentType::Mixed) => SentimentLabel::Mixed,
        _ => SentimentLabel::Error,
    }
}
