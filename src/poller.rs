//! The poll loop: receive, process, and decide whether to acknowledge.
//!
//! All acknowledgment policy lives in [`disposition`]. A message is deleted
//! when it was processed, when it can never be processed (decode failure),
//! or when it has hit the configured receive cap. Anything else stays on the
//! queue and comes back after its visibility timeout.

use std::{sync::Arc, time::Duration};

use eyre::WrapErr;
use tokio::{
    sync::Semaphore,
    task::{JoinError, JoinSet},
};
use tokio_util::sync::CancellationToken;

use crate::{
    error::Error,
    message::QueueMessage,
    pipeline::{Outcome, Pipeline},
    queue::MessageQueue,
};

/// Pause after a receive-level failure.
pub const DEFAULT_ERROR_BACKOFF: Duration = Duration::from_secs(10);

/// What happens to a message once its pipeline run is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Processed; delete it.
    Acknowledge,
    /// Unprocessable; delete it without a result.
    Discard,
    /// Leave it for redelivery.
    Retain,
}

impl Disposition {
    pub fn deletes(self) -> bool {
        !matches!(self, Self::Retain)
    }
}

/// Maps a pipeline outcome to an acknowledgment decision.
///
/// `receive_count` is how often the queue has delivered the message and
/// `max_receive_count` the optional cap on transient retries.
pub fn disposition(
    outcome: &Outcome,
    receive_count: Option<u32>,
    max_receive_count: Option<u32>,
) -> Disposition {
    match outcome {
        Ok(_) => Disposition::Acknowledge,
        Err(failure) if !failure.is_transient() => Disposition::Discard,
        Err(_) => match (receive_count, max_receive_count) {
            (Some(count), Some(max)) if count >= max => Disposition::Discard,
            _ => Disposition::Retain,
        },
    }
}

/// Runs `message` through `pipeline` and acknowledges it if the outcome
/// calls for it. Delete failures are logged; the message then comes back
/// and is reprocessed into the same job id.
pub async fn handle_message(
    queue: &dyn MessageQueue,
    pipeline: &Pipeline,
    message: QueueMessage,
    max_receive_count: Option<u32>,
) -> Disposition {
    tracing::info!(message_id = %message.message_id, "Received message");

    let outcome = pipeline.process(&message).await;
    let receive_count = message.receive_count();
    let disposition = disposition(&outcome, receive_count, max_receive_count);

    match (&outcome, disposition) {
        (Ok(record), _) => {
            tracing::info!(
                message_id = %message.message_id,
                job_id = %record.job_id,
                "Acknowledging processed message"
            );
        }
        (Err(failure), Disposition::Retain) => {
            tracing::warn!(
                message_id = %message.message_id,
                stage = %failure.stage,
                receive_count,
                error = %failure.cause,
                "Processing failed, leaving message for redelivery"
            );
        }
        (Err(failure), _) if failure.is_transient() => {
            tracing::error!(
                message_id = %message.message_id,
                stage = %failure.stage,
                receive_count,
                error = %failure.cause,
                "Receive cap reached, dropping message"
            );
        }
        (Err(failure), _) => {
            tracing::warn!(
                message_id = %message.message_id,
                error = %failure.cause,
                body = %message.body,
                "Dropping undecodable message"
            );
        }
    }

    if disposition.deletes() {
        if let Err(source) = queue.delete(&message.receipt_handle).await {
            let err = Error::Acknowledge {
                message_id: message.message_id.clone(),
                source,
            };
            tracing::error!(error = %err, "Failed to acknowledge message");
        }
    }

    disposition
}

/// Drains a [`MessageQueue`] until cancelled.
///
/// At most `concurrency` messages are in flight; each in-flight message runs
/// in its own task with its own receipt handle. With the default of one, the
/// loop receives, processes and acknowledges strictly one message at a time.
#[derive(bon::Builder)]
pub struct Poller {
    queue: Arc<dyn MessageQueue>,
    pipeline: Arc<Pipeline>,
    #[builder(default)]
    cancel: CancellationToken,
    #[builder(default = 1)]
    concurrency: usize,
    #[builder(default = DEFAULT_ERROR_BACKOFF)]
    error_backoff: Duration,
    max_receive_count: Option<u32>,
}

impl Poller {
    /// Polls until cancelled, then waits for in-flight messages to finish.
    ///
    /// Returns an error only if a message task panicked. A panic stops
    /// polling, but messages already in flight still run to completion.
    pub async fn run(&self) -> eyre::Result<()> {
        let permits = Arc::new(Semaphore::new(self.concurrency.max(1)));
        let mut in_flight = JoinSet::new();

        tracing::info!(concurrency = self.concurrency, "Polling for messages");

        let mut panicked = None;

        loop {
            while let Some(joined) = in_flight.try_join_next() {
                self.record_panic(joined, &mut panicked);
            }

            let permit = tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                permit = Arc::clone(&permits).acquire_owned() => permit?,
            };

            let received = tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                received = self.queue.receive() => received,
            };

            match received {
                Ok(Some(message)) => {
                    let queue = Arc::clone(&self.queue);
                    let pipeline = Arc::clone(&self.pipeline);
                    let max_receive_count = self.max_receive_count;

                    in_flight.spawn(async move {
                        let _permit = permit;
                        handle_message(queue.as_ref(), &pipeline, message, max_receive_count).await
                    });
                }
                Ok(None) => {
                    tracing::debug!("No messages received");
                }
                Err(source) => {
                    drop(permit);
                    let err = Error::Transport { source };
                    tracing::error!(
                        error = %err,
                        backoff = ?self.error_backoff,
                        "Polling failed, backing off"
                    );

                    tokio::select! {
                        biased;
                        () = self.cancel.cancelled() => break,
                        () = tokio::time::sleep(self.error_backoff) => {}
                    }
                }
            }
        }

        tracing::info!(in_flight = in_flight.len(), "Stopping, waiting for in-flight messages");

        while let Some(joined) = in_flight.join_next().await {
            self.record_panic(joined, &mut panicked);
        }

        if let Some(err) = panicked {
            return Err(err).wrap_err("Message task failed");
        }

        tracing::info!("Poller stopped");
        Ok(())
    }

    /// Keeps the first task failure and stops polling. Sibling tasks are left
    /// to finish; the failure is reported once they have.
    fn record_panic(
        &self,
        joined: Result<Disposition, JoinError>,
        panicked: &mut Option<JoinError>,
    ) {
        if let Err(err) = joined {
            tracing::error!(error = %err, "Message task failed, shutting down");
            self.cancel.cancel();
            panicked.get_or_insert(err);
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::{
        error::DecodeError,
        notification::ObjectLocator,
        pipeline::{Failure, Stage},
        sentiment::SentimentLabel,
        store::{JobRecord, JobStatus},
    };

    fn success() -> Outcome {
        Ok(JobRecord {
            job_id: "job-1".to_owned(),
            timestamp: Utc::now(),
            status: JobStatus::Processed,
            locator: ObjectLocator::new("docs", "a.pdf"),
            sentiment: SentimentLabel::Neutral,
            sentiment_score_positive: 0.2,
            extracted_text: "text".to_owned(),
        })
    }

    fn decode_failure() -> Outcome {
        Err(Failure {
            stage: Stage::Decoded,
            cause: Error::Decode {
                source: DecodeError::NoRecords,
            },
        })
    }

    fn transient_failures() -> Vec<Outcome> {
        vec![
            Err(Failure {
                stage: Stage::Extracted,
                cause: Error::Extraction {
                    locator: ObjectLocator::new("docs", "a.pdf"),
                    source: eyre::eyre!("access denied"),
                },
            }),
            Err(Failure {
                stage: Stage::Scored,
                cause: Error::Sentiment {
                    source: eyre::eyre!("throttled"),
                },
            }),
            Err(Failure {
                stage: Stage::Persisted,
                cause: Error::Persistence {
                    job_id: "job-1".to_owned(),
                    source: eyre::eyre!("provisioned throughput exceeded"),
                },
            }),
        ]
    }

    #[test]
    fn test_success_and_decode_failure_delete() {
        assert_eq!(disposition(&success(), None, None), Disposition::Acknowledge);
        assert_eq!(disposition(&decode_failure(), None, None), Disposition::Discard);
        assert_eq!(
            disposition(&decode_failure(), Some(1), Some(5)),
            Disposition::Discard
        );
    }

    #[test]
    fn test_transient_failures_are_retained() {
        for outcome in transient_failures() {
            assert_eq!(disposition(&outcome, None, None), Disposition::Retain);
            assert_eq!(disposition(&outcome, Some(40), None), Disposition::Retain);
            assert_eq!(disposition(&outcome, Some(4), Some(5)), Disposition::Retain);
            assert_eq!(disposition(&outcome, None, Some(5)), Disposition::Retain);
        }
    }

    #[test]
    fn test_receive_cap_discards_transient_failures() {
        for outcome in transient_failures() {
            assert_eq!(disposition(&outcome, Some(5), Some(5)), Disposition::Discard);
            assert_eq!(disposition(&outcome, Some(9), Some(5)), Disposition::Discard);
        }
    }

    #[test]
    fn test_deletes() {
        assert!(Disposition::Acknowledge.deletes());
        assert!(Disposition::Discard.deletes());
        assert!(!Disposition::Retain.deletes());
    }
}
