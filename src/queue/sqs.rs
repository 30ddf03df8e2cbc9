use aws_sdk_sqs::{types::MessageSystemAttributeName, Client as SqsClient};

use crate::{config::Config, message::QueueMessage, utils::BoxFuture};

use super::MessageQueue;

/// Attribute wildcard for message attributes.
const ALL_ATTRIBUTES: &str = "All";

/// Amazon SQS implementation of [`MessageQueue`].
#[derive(Clone)]
pub struct SqsQueue {
    client: SqsClient,
    queue_url: String,
    wait_time_seconds: i32,
    visibility_timeout: Option<i32>,
}

impl SqsQueue {
    /// Create a queue handle for `config.queue_url`.
    pub fn new(client: SqsClient, config: &Config) -> Self {
        Self {
            client,
            queue_url: config.queue_url.to_string(),
            wait_time_seconds: config.wait_time_seconds,
            visibility_timeout: config.visibility_timeout,
        }
    }
}

impl MessageQueue for SqsQueue {
    fn receive(&self) -> BoxFuture<'_, eyre::Result<Option<QueueMessage>>> {
        Box::pin(async move {
            tracing::debug!(queue_url = %self.queue_url, "Polling for messages");

            let output = self
                .client
                .receive_message()
                .queue_url(&self.queue_url)
                .max_number_of_messages(1)
                .wait_time_seconds(self.wait_time_seconds)
                .set_visibility_timeout(self.visibility_timeout)
                .message_system_attribute_names(MessageSystemAttributeName::All)
                .message_attribute_names(ALL_ATTRIBUTES)
                .send()
                .await?;

            let Some(message) = output.messages.unwrap_or_default().into_iter().next() else {
                return Ok(None);
            };

            match QueueMessage::try_from(message) {
                Ok(message) => Ok(Some(message)),
                Err(err) => {
                    tracing::warn!(error = %err, "Skipping unusable message");
                    Ok(None)
                }
            }
        })
    }

    fn delete<'a>(&'a self, receipt_handle: &'a str) -> BoxFuture<'a, eyre::Result<()>> {
        Box::pin(async move {
            self.client
                .delete_message()
                .queue_url(&self.queue_url)
                .receipt_handle(receipt_handle)
                .send()
                .await?;

            Ok(())
        })
    }
}
