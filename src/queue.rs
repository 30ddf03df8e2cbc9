//! The work queue the poll loop drains.

use crate::{message::QueueMessage, utils::BoxFuture};

pub mod sqs;

/// A queue with at-least-once delivery and per-delivery acknowledgment.
///
/// A received message stays hidden from other consumers until it is deleted
/// or its visibility timeout lapses, after which it is delivered again.
pub trait MessageQueue: Send + Sync + 'static {
    /// Waits (long-polls) for at most one message.
    fn receive(&self) -> BoxFuture<'_, eyre::Result<Option<QueueMessage>>>;

    /// Acknowledges the delivery identified by `receipt_handle`.
    fn delete<'a>(&'a self, receipt_handle: &'a str) -> BoxFuture<'a, eyre::Result<()>>;
}
