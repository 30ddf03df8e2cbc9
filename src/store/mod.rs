//! Result records and the keyed store they are written to.
//!
//! Records are keyed by job id, which is derived from the queue message id.
//! Writes are whole-record upserts: writing the same record twice leaves the
//! store unchanged, and a later write for the same job id replaces the
//! earlier one.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use strum::{AsRefStr, Display};

use crate::{
    error::Error, notification::ObjectLocator, sentiment::SentimentLabel, utils::BoxFuture,
};

pub mod dynamodb;
pub mod memory;

/// Processing status of a stored job. Only completed jobs are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "UPPERCASE")]
pub enum JobStatus {
    Processed,
}

/// The persisted outcome of processing one document.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRecord {
    pub job_id: String,
    pub timestamp: DateTime<Utc>,
    pub status: JobStatus,
    pub locator: ObjectLocator,
    pub sentiment: SentimentLabel,
    pub sentiment_score_positive: f32,
    pub extracted_text: String,
}

impl JobRecord {
    /// Timestamp as stored: RFC 3339, UTC, millisecond precision.
    pub fn timestamp_string(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

/// A keyed store for job records.
pub trait ResultStore: Send + Sync + 'static {
    /// Writes `record`, replacing any record with the same job id.
    fn put<'a>(&'a self, record: &'a JobRecord) -> BoxFuture<'a, eyre::Result<()>>;
}

/// Persistence stage of the pipeline.
#[derive(Clone)]
pub struct ResultWriter {
    store: Arc<dyn ResultStore>,
}

impl ResultWriter {
    pub fn new(store: impl ResultStore) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    pub async fn write(&self, record: &JobRecord) -> Result<(), Error> {
        self.store
            .put(record)
            .await
            .map_err(|source| Error::Persistence {
                job_id: record.job_id.clone(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_timestamp_format() {
        let record = JobRecord {
            job_id: "job-1".to_owned(),
            timestamp: Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap(),
            status: JobStatus::Processed,
            locator: ObjectLocator::new("docs", "a.pdf"),
            sentiment: SentimentLabel::Neutral,
            sentiment_score_positive: 0.1,
            extracted_text: "hello".to_owned(),
        };

        assert_eq!(record.timestamp_string(), "2024-03-09T14:05:07.000Z");
        assert_eq!(record.status.as_ref(), "PROCESSED");
    }
}
