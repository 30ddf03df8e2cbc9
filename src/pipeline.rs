//! Processing of a single queue message.
//!
//! A message moves through `RECEIVED -> DECODED -> EXTRACTED -> SCORED ->
//! PERSISTED`. Stages run strictly in order and the first failure stops the
//! run. Nothing is retried here: a failed message is retried by leaving it on
//! the queue, and a redelivery starts again from the top.

use std::fmt;

use chrono::Utc;
use snafu::ResultExt;
use strum::Display;

use crate::{
    error::{DecodeSnafu, Error},
    extraction::ExtractionClient,
    message::QueueMessage,
    notification,
    sentiment::SentimentClient,
    store::{JobRecord, JobStatus, ResultWriter},
};

/// States a message passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Received,
    Decoded,
    Extracted,
    Scored,
    Persisted,
}

/// A pipeline run that stopped before reaching [`Stage::Persisted`].
#[derive(Debug)]
pub struct Failure {
    /// The state that could not be reached.
    pub stage: Stage,
    pub cause: Error,
}

impl Failure {
    fn at(stage: Stage) -> impl FnOnce(Error) -> Self {
        move |cause| Self { stage, cause }
    }

    /// Whether a later delivery of the same message might succeed.
    pub fn is_transient(&self) -> bool {
        self.cause.is_transient()
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed before {}: {}", self.stage, self.cause)
    }
}

impl std::error::Error for Failure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

/// Result of one pipeline run: the stored record, or where and why it stopped.
pub type Outcome = Result<JobRecord, Failure>;

/// Decode, extract, score and persist, in that order.
#[derive(Clone, bon::Builder)]
pub struct Pipeline {
    extraction: ExtractionClient,
    sentiment: SentimentClient,
    writer: ResultWriter,
}

impl Pipeline {
    /// Runs every stage for `message`.
    #[tracing::instrument(skip_all, fields(message_id = %message.message_id))]
    pub async fn process(&self, message: &QueueMessage) -> Outcome {
        let job_id = message.job_id();
        let timestamp = Utc::now();

        let locator = notification::decode(&message.body)
            .context(DecodeSnafu)
            .map_err(Failure::at(Stage::Decoded))?;

        tracing::debug!(%locator, %job_id, "Decoded notification");

        let extraction = self
            .extraction
            .extract(&locator)
            .await
            .map_err(Failure::at(Stage::Extracted))?;

        tracing::debug!(
            lines = extraction.line_count(),
            truncated = extraction.is_truncated(),
            placeholder = extraction.is_placeholder(),
            "Extracted text"
        );

        let sentiment = self
            .sentiment
            .score(extraction.text())
            .await
            .map_err(Failure::at(Stage::Scored))?;

        tracing::debug!(
            sentiment = %sentiment.label(),
            positive = sentiment.positive_score(),
            "Scored sentiment"
        );

        let record = JobRecord {
            job_id,
            timestamp,
            status: JobStatus::Processed,
            locator,
            sentiment: sentiment.label(),
            sentiment_score_positive: sentiment.positive_score(),
            extracted_text: extraction.into_text(),
        };

        self.writer
            .write(&record)
            .await
            .map_err(Failure::at(Stage::Persisted))?;

        tracing::info!(
            job_id = %record.job_id,
            locator = %record.locator,
            sentiment = %record.sentiment,
            "Processed document"
        );

        Ok(record)
    }
}
