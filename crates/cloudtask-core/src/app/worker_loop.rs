//! Worker - consumes `jobs.created` and executes jobs.
//!
//! # Per-message flow
//! 1. Decode the `JobMessage`; a malformed body is rejected without requeue
//! 2. Publish `RUNNING` to `jobs.started`
//! 3. Dispatch to the registered handler
//! 4. Publish `COMPLETED`/`FAILED` to `jobs.completed`
//! 5. Ack
//!
//! Status publishes are best-effort: a failed publish is logged and counted,
//! and the job still runs and the inbound message is still acked. Job-level
//! failures (unknown type, bad payload, handler error) are outcomes, not
//! processing errors, so they never cause a requeue.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use super::consumer::{DeliveryHandler, Disposition, consume, settled};
use crate::domain::{JobMessage, JobOutcome, QueueName, StatusUpdate};
use crate::error::ChannelError;
use crate::ports::{Delivery, MessageChannel, PipelineObserver};
use crate::typed::HandlerRegistry;

pub struct Worker {
    channel: Arc<dyn MessageChannel>,
    registry: Arc<HandlerRegistry>,
    observer: Arc<dyn PipelineObserver>,
}

impl Worker {
    /// Queues the worker consumes from.
    pub const QUEUES: [QueueName; 1] = [QueueName::JobsCreated];

    pub(crate) fn new(
        channel: Arc<dyn MessageChannel>,
        registry: Arc<HandlerRegistry>,
        observer: Arc<dyn PipelineObserver>,
    ) -> Self {
        Self {
            channel,
            registry,
            observer,
        }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Declare the queue the worker reads and the two it writes.
    pub async fn declare_queues(&self) -> Result<(), ChannelError> {
        for queue in QueueName::ALL {
            self.channel.declare(queue).await?;
        }
        Ok(())
    }

    /// Declare queues, then consume until `shutdown` is cancelled.
    ///
    /// Only the declaration can fail; once consuming, errors are logged and
    /// retried. Returns the number of deliveries handled.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<u64, ChannelError> {
        self.declare_queues().await?;
        info!(job_types = ?self.registry.registered_types(), "worker ready");
        Ok(consume(self.channel.as_ref(), &Self::QUEUES, self, &shutdown).await)
    }

    async fn publish_status(&self, update: &StatusUpdate) {
        let queue = update.queue();
        let result = match update.to_vec() {
            Ok(body) => self.channel.publish(queue, &body).await,
            Err(e) => Err(ChannelError::Protocol(e.to_string())),
        };
        if let Err(err) = result {
            warn!(
                job_id = %update.job_id,
                status = %update.status,
                %queue,
                error = %err,
                "failed to publish status update"
            );
            self.observer.publish_failed(queue);
        }
    }
}

#[async_trait]
impl DeliveryHandler for Worker {
    #[instrument(name = "job", skip_all, fields(tag = %delivery.tag(), redelivered = delivery.redelivered()))]
    async fn handle(&self, delivery: Box<dyn Delivery>) -> Disposition {
        let queue = delivery.queue();
        let tag = delivery.tag();
        self.observer.message_received(queue, delivery.redelivered());

        let message = match JobMessage::from_slice(delivery.body()) {
            Ok(message) => message,
            Err(err) => {
                error!(error = %err, "malformed job message; dropping");
                self.observer.message_dropped(queue);
                return settled(delivery.reject(false).await, Disposition::Dropped, &tag);
            }
        };

        info!(job_id = %message.job_id, job_type = %message.job_type, "job received");
        self.publish_status(&StatusUpdate::running(message.job_id.clone()))
            .await;

        let started = Instant::now();
        let outcome = self.registry.dispatch(&message).await;
        let elapsed = started.elapsed();
        self.observer
            .job_finished(&message.job_type, outcome.status(), elapsed);

        match &outcome {
            JobOutcome::Completed(result) => {
                info!(job_id = %message.job_id, ?elapsed, %result, "job completed")
            }
            JobOutcome::Failed(failure) => warn!(
                job_id = %message.job_id,
                ?elapsed,
                kind = ?failure.kind(),
                reason = %failure,
                "job failed"
            ),
        }

        self.publish_status(&outcome.into_status_update(message.job_id))
            .await;

        settled(delivery.ack().await, Disposition::Acked, &tag)
    }
}
