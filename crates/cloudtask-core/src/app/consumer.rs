//! Consumer loop shared by the worker and the results processor.
//!
//! # Flow
//! 1. Stop if shutdown was requested
//! 2. Wait for a delivery (racing the shutdown signal)
//! 3. Hand it to the `DeliveryHandler`, which acks or rejects it
//! 4. Only then go back to 1
//!
//! Shutdown is observed between iterations and while waiting in step 2, never
//! during step 3: a message that has been received always finishes its
//! ack/reject cycle before the loop exits.

use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::domain::QueueName;
use crate::ports::{Delivery, MessageChannel};

/// Pause after a failed receive before trying again.
pub const RECEIVE_RETRY_DELAY: Duration = Duration::from_secs(1);

/// How a delivery was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Acked,
    /// Rejected without requeue; the message is gone.
    Dropped,
    /// Rejected with requeue; the broker will deliver it again.
    Requeued,
    /// The ack/reject call itself failed; the broker still owns the message
    /// and redelivers it once this consumer's claim lapses.
    Unresolved,
}

/// Processes one delivery and resolves it.
#[async_trait]
pub trait DeliveryHandler: Send + Sync {
    async fn handle(&self, delivery: Box<dyn Delivery>) -> Disposition;
}

/// Run the consumption loop until `shutdown` is cancelled.
///
/// Receive errors are logged and retried after `RECEIVE_RETRY_DELAY`; they
/// never end the loop. Returns the number of deliveries handled.
pub async fn consume<H>(
    channel: &dyn MessageChannel,
    queues: &[QueueName],
    handler: &H,
    shutdown: &CancellationToken,
) -> u64
where
    H: DeliveryHandler + ?Sized,
{
    info!(queues = ?queues, "consumer started");
    let mut handled = 0u64;

    loop {
        if shutdown.is_cancelled() {
            break;
        }

        let received = tokio::select! {
            _ = shutdown.cancelled() => break,
            received = channel.receive(queues) => received,
        };

        match received {
            Ok(Some(delivery)) => {
                handler.handle(delivery).await;
                handled += 1;
            }
            Ok(None) => {}
            Err(err) => {
                warn!(error = %err, "receive failed; retrying");
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(RECEIVE_RETRY_DELAY) => {}
                }
            }
        }
    }

    info!(handled, "consumer stopped");
    handled
}

/// Log the outcome of an ack/reject call and map it to a `Disposition`.
pub(crate) fn settled<E: std::fmt::Display>(
    result: Result<(), E>,
    disposition: Disposition,
    tag: &str,
) -> Disposition {
    match result {
        Ok(()) => disposition,
        Err(err) => {
            warn!(tag, error = %err, ?disposition, "could not resolve delivery; broker will redeliver");
            Disposition::Unresolved
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::InMemoryBroker;
    use std::sync::Mutex;

    struct Recorder {
        seen: Mutex<Vec<Vec<u8>>>,
    }

    #[async_trait]
    impl DeliveryHandler for Recorder {
        async fn handle(&self, delivery: Box<dyn Delivery>) -> Disposition {
            self.seen.lock().unwrap().push(delivery.body().to_vec());
            settled(delivery.ack().await, Disposition::Acked, "t")
        }
    }

    #[tokio::test(start_paused = true)]
    async fn handles_until_cancelled() {
        let broker = InMemoryBroker::new();
        let channel = broker.channel();
        channel.declare(QueueName::JobsCreated).await.unwrap();
        channel.publish(QueueName::JobsCreated, b"a").await.unwrap();
        channel.publish(QueueName::JobsCreated, b"b").await.unwrap();

        let recorder = Recorder {
            seen: Mutex::new(Vec::new()),
        };
        let shutdown = CancellationToken::new();
        let stopper = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            stopper.cancel();
        });

        let handled = consume(&channel, &[QueueName::JobsCreated], &recorder, &shutdown).await;
        assert_eq!(handled, 2);
        assert_eq!(*recorder.seen.lock().unwrap(), vec![b"a".to_vec(), b"b".to_vec()]);
        assert_eq!(broker.in_flight_len(), 0);
    }

    #[tokio::test]
    async fn already_cancelled_consumes_nothing() {
        let broker = InMemoryBroker::new();
        let channel = broker.channel();
        channel.declare(QueueName::JobsCreated).await.unwrap();
        channel.publish(QueueName::JobsCreated, b"a").await.unwrap();

        let recorder = Recorder {
            seen: Mutex::new(Vec::new()),
        };
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let handled = consume(&channel, &[QueueName::JobsCreated], &recorder, &shutdown).await;
        assert_eq!(handled, 0);
        assert_eq!(broker.ready_len(QueueName::JobsCreated), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn receive_errors_do_not_end_the_loop() {
        let broker = InMemoryBroker::new();
        // Never declared: every receive fails.
        let channel = broker.channel();
        let recorder = Recorder {
            seen: Mutex::new(Vec::new()),
        };
        let shutdown = CancellationToken::new();
        let stopper = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(RECEIVE_RETRY_DELAY * 3).await;
            stopper.cancel();
        });

        let handled = consume(&channel, &[QueueName::JobsCreated], &recorder, &shutdown).await;
        assert_eq!(handled, 0);
    }
}
