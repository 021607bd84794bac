//! MessageChannel port - durable multi-queue broker with manual acknowledgment.
//!
//! # Contract
//! - Queues are durable and shared: every consumer of one queue competes for
//!   its messages, and each message is delivered to exactly one consumer at a
//!   time.
//! - A received message stays in flight until its `Delivery` is acked or
//!   rejected. In-flight messages of a consumer that goes away are redelivered.
//! - `reject(requeue = false)` drops the message for good (there is no
//!   dead-letter route). `reject(requeue = true)` hands it back to the broker
//!   for another delivery.

use async_trait::async_trait;

use crate::domain::QueueName;
use crate::error::ChannelError;

/// One delivered message. Consumed by `ack` or `reject`, so a delivery is
/// resolved at most once.
#[async_trait]
pub trait Delivery: Send {
    fn queue(&self) -> QueueName;

    fn body(&self) -> &[u8];

    /// True when the broker has delivered this message before.
    fn redelivered(&self) -> bool;

    /// Broker-specific delivery identifier, for logs.
    fn tag(&self) -> String;

    async fn ack(self: Box<Self>) -> Result<(), ChannelError>;

    async fn reject(self: Box<Self>, requeue: bool) -> Result<(), ChannelError>;
}

/// Connection to the broker owned by one process.
#[async_trait]
pub trait MessageChannel: Send + Sync {
    /// Declare a durable queue. Idempotent.
    async fn declare(&self, queue: QueueName) -> Result<(), ChannelError>;

    async fn publish(&self, queue: QueueName, body: &[u8]) -> Result<(), ChannelError>;

    /// Wait for the next message on any of `queues`.
    ///
    /// Returns `Ok(None)` when the adapter's poll window elapses without a
    /// message, so callers get a chance to observe shutdown. Dropping the
    /// returned future before it resolves must not lose a message.
    async fn receive(
        &self,
        queues: &[QueueName],
    ) -> Result<Option<Box<dyn Delivery>>, ChannelError>;
}
