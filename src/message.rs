//! Messages received from the work queue.
//!
//! A [`QueueMessage`] is read once per receive and never mutated. Its receipt
//! handle belongs to that one delivery: it is what acknowledges (deletes) the
//! message, and it is carried alongside the message until the acknowledgment
//! decision is made.

use std::collections::HashMap;

use aws_sdk_sqs::types::{Message as SqsMessage, MessageSystemAttributeName};
use snafu::OptionExt;

use crate::error::{Error, IncompleteMessageSnafu};

/// A single delivery of a queue message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    /// Queue-assigned message identifier, stable across redeliveries.
    pub message_id: String,
    /// Handle for acknowledging this delivery.
    pub receipt_handle: String,
    /// Raw notification body.
    pub body: String,
    /// System attributes returned with the delivery.
    pub attributes: HashMap<String, String>,
}

impl QueueMessage {
    pub fn new(
        message_id: impl Into<String>,
        receipt_handle: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            message_id: message_id.into(),
            receipt_handle: receipt_handle.into(),
            body: body.into(),
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Result record key for this message. Redeliveries map to the same key.
    pub fn job_id(&self) -> String {
        format!("job-{}", self.message_id)
    }

    /// How many times the queue has handed this message out, if reported.
    pub fn receive_count(&self) -> Option<u32> {
        self.attributes
            .get(MessageSystemAttributeName::ApproximateReceiveCount.as_str())
            .and_then(|count| count.parse().ok())
    }
}

/// A delivery without an id or receipt handle can be neither keyed nor
/// acknowledged, so it is rejected outright.
impl TryFrom<SqsMessage> for QueueMessage {
    type Error = Error;

    fn try_from(msg: SqsMessage) -> Result<Self, Self::Error> {
        let message_id = msg
            .message_id
            .filter(|id| !id.is_empty())
            .context(IncompleteMessageSnafu { field: "message id" })?;

        let receipt_handle = msg
            .receipt_handle
            .filter(|handle| !handle.is_empty())
            .context(IncompleteMessageSnafu {
                field: "receipt handle",
            })?;

        let attributes = msg
            .attributes
            .unwrap_or_default()
            .into_iter()
            .map(|(name, value)| (name.as_str().to_owned(), value))
            .collect();

        Ok(Self {
            message_id,
            receipt_handle,
            body: msg.body.unwrap_or_default(),
            attributes,
        })
    }
}
