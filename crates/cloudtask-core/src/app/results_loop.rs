//! ResultsProcessor - writes job status updates to the job store.
//!
//! Consumes `jobs.started` and `jobs.completed`. Each update is a plain
//! overwrite keyed by job id, so redelivered duplicates are harmless. An
//! update is acked only after the store accepted it; any store error rejects
//! it with requeue. A malformed update is rejected without requeue.

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use super::consumer::{DeliveryHandler, Disposition, consume, settled};
use crate::domain::{QueueName, StatusUpdate};
use crate::error::ChannelError;
use crate::ports::{Delivery, JobStore, MessageChannel, NoopObserver, PipelineObserver};

pub struct ResultsProcessor {
    channel: Arc<dyn MessageChannel>,
    store: Arc<dyn JobStore>,
    observer: Arc<dyn PipelineObserver>,
}

impl ResultsProcessor {
    /// Queues the processor consumes from, in receive priority order.
    pub const QUEUES: [QueueName; 2] = [QueueName::JobsStarted, QueueName::JobsCompleted];

    pub fn new(channel: Arc<dyn MessageChannel>, store: Arc<dyn JobStore>) -> Self {
        Self {
            channel,
            store,
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub async fn declare_queues(&self) -> Result<(), ChannelError> {
        for queue in Self::QUEUES {
            self.channel.declare(queue).await?;
        }
        Ok(())
    }

    /// Declare queues, then consume until `shutdown` is cancelled.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<u64, ChannelError> {
        self.declare_queues().await?;
        info!("results processor ready");
        Ok(consume(self.channel.as_ref(), &Self::QUEUES, self, &shutdown).await)
    }
}

#[async_trait]
impl DeliveryHandler for ResultsProcessor {
    #[instrument(name = "status", skip_all, fields(queue = %delivery.queue(), tag = %delivery.tag()))]
    async fn handle(&self, delivery: Box<dyn Delivery>) -> Disposition {
        let queue = delivery.queue();
        let tag = delivery.tag();
        self.observer.message_received(queue, delivery.redelivered());

        let update = match StatusUpdate::from_slice(delivery.body()) {
            Ok(update) => update,
            Err(err) => {
                error!(error = %err, "malformed status update; dropping");
                self.observer.message_dropped(queue);
                return settled(delivery.reject(false).await, Disposition::Dropped, &tag);
            }
        };

        match self.store.update_status(&update.job_id, update.status).await {
            Ok(rows) => {
                self.observer.status_applied(update.status, rows);
                if rows == 0 {
                    warn!(
                        job_id = %update.job_id,
                        status = %update.status,
                        "status update matched no job row"
                    );
                } else {
                    info!(job_id = %update.job_id, status = %update.status, "job status updated");
                }
                settled(delivery.ack().await, Disposition::Acked, &tag)
            }
            Err(err) => {
                warn!(
                    job_id = %update.job_id,
                    status = %update.status,
                    error = %err,
                    "job store update failed; requeueing"
                );
                self.observer.status_requeued();
                settled(delivery.reject(true).await, Disposition::Requeued, &tag)
            }
        }
    }
}
