//! InMemoryBroker - in-process message channel for development and tests.
//!
//! Models the broker contract closely enough to exercise the pipeline's
//! reliability behavior:
//! - one ready deque per declared queue, shared by every channel
//!   (competing consumers)
//! - per-channel in-flight set; `ack` removes, `reject(true)` puts the message
//!   back at the head of its queue flagged as redelivered, `reject(false)` drops
//! - closing or dropping a channel requeues everything it still has in flight
//!
//! State lives behind a `std::sync::Mutex` that is never held across an
//! `.await`, so `Drop` can requeue synchronously.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::domain::QueueName;
use crate::error::ChannelError;
use crate::ports::{Delivery, MessageChannel};

/// How long `receive` waits before returning `Ok(None)`.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
struct StoredMessage {
    body: Vec<u8>,
    redelivered: bool,
}

#[derive(Debug)]
struct InFlight {
    channel_id: u64,
    queue: QueueName,
    message: StoredMessage,
}

#[derive(Debug, Default)]
struct BrokerState {
    queues: HashMap<QueueName, VecDeque<StoredMessage>>,
    in_flight: HashMap<u64, InFlight>,
    next_tag: u64,
    next_channel_id: u64,
}

impl BrokerState {
    fn queue_mut(&mut self, queue: QueueName) -> Result<&mut VecDeque<StoredMessage>, ChannelError> {
        self.queues
            .get_mut(&queue)
            .ok_or(ChannelError::QueueNotDeclared(queue))
    }

    /// Move the first ready message of `queues` (in the given order) in flight.
    fn take(
        &mut self,
        channel_id: u64,
        queues: &[QueueName],
    ) -> Result<Option<(u64, QueueName, StoredMessage)>, ChannelError> {
        for &queue in queues {
            if let Some(message) = self.queue_mut(queue)?.pop_front() {
                self.next_tag += 1;
                let tag = self.next_tag;
                self.in_flight.insert(
                    tag,
                    InFlight {
                        channel_id,
                        queue,
                        message: message.clone(),
                    },
                );
                return Ok(Some((tag, queue, message)));
            }
        }
        Ok(None)
    }

    /// Put an in-flight message back at the head of its queue.
    fn requeue(&mut self, in_flight: InFlight) {
        let mut message = in_flight.message;
        message.redelivered = true;
        self.queues
            .entry(in_flight.queue)
            .or_default()
            .push_front(message);
    }
}

#[derive(Debug, Clone)]
struct Shared {
    state: Arc<Mutex<BrokerState>>,
    notify: Arc<Notify>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, BrokerState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// The broker itself. Cheap to clone; clones share state.
#[derive(Debug, Clone)]
pub struct InMemoryBroker {
    shared: Shared,
    poll_interval: Duration,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::with_poll_interval(DEFAULT_POLL_INTERVAL)
    }

    pub fn with_poll_interval(poll_interval: Duration) -> Self {
        Self {
            shared: Shared {
                state: Arc::new(Mutex::new(BrokerState::default())),
                notify: Arc::new(Notify::new()),
            },
            poll_interval,
        }
    }

    /// Open a new channel (one consumer connection).
    pub fn channel(&self) -> InMemoryChannel {
        let id = {
            let mut state = self.shared.lock();
            state.next_channel_id += 1;
            state.next_channel_id
        };
        InMemoryChannel {
            id,
            shared: self.shared.clone(),
            poll_interval: self.poll_interval,
        }
    }

    /// Bodies waiting in `queue`, head first.
    pub fn ready(&self, queue: QueueName) -> Vec<Vec<u8>> {
        self.shared
            .lock()
            .queues
            .get(&queue)
            .map(|q| q.iter().map(|m| m.body.clone()).collect())
            .unwrap_or_default()
    }

    pub fn ready_len(&self, queue: QueueName) -> usize {
        self.shared.lock().queues.get(&queue).map_or(0, VecDeque::len)
    }

    /// Number of delivered but unresolved messages across all channels.
    pub fn in_flight_len(&self) -> usize {
        self.shared.lock().in_flight.len()
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

/// A consumer connection to an `InMemoryBroker`.
#[derive(Debug)]
pub struct InMemoryChannel {
    id: u64,
    shared: Shared,
    poll_interval: Duration,
}

impl InMemoryChannel {
    /// Close the channel, requeueing whatever it still has in flight.
    pub fn close(self) {
        // Drop does the work.
    }

    fn requeue_in_flight(&self) {
        let requeued = {
            let mut state = self.shared.lock();
            let mut tags: Vec<u64> = state
                .in_flight
                .iter()
                .filter(|(_, f)| f.channel_id == self.id)
                .map(|(tag, _)| *tag)
                .collect();
            tags.sort_unstable();
            // Newest first, so the oldest ends up at the head.
            for tag in tags.iter().rev() {
                if let Some(in_flight) = state.in_flight.remove(tag) {
                    state.requeue(in_flight);
                }
            }
            !tags.is_empty()
        };
        if requeued {
            self.shared.notify.notify_waiters();
        }
    }
}

impl Drop for InMemoryChannel {
    fn drop(&mut self) {
        self.requeue_in_flight();
    }
}

#[async_trait]
impl MessageChannel for InMemoryChannel {
    async fn declare(&self, queue: QueueName) -> Result<(), ChannelError> {
        self.shared.lock().queues.entry(queue).or_default();
        Ok(())
    }

    async fn publish(&self, queue: QueueName, body: &[u8]) -> Result<(), ChannelError> {
        {
            let mut state = self.shared.lock();
            state.queue_mut(queue)?.push_back(StoredMessage {
                body: body.to_vec(),
                redelivered: false,
            });
        }
        self.shared.notify.notify_waiters();
        Ok(())
    }

    async fn receive(
        &self,
        queues: &[QueueName],
    ) -> Result<Option<Box<dyn Delivery>>, ChannelError> {
        let deadline = Instant::now() + self.poll_interval;
        loop {
            // Register interest before looking, so a publish in between is not missed.
            let notified = self.shared.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let taken = self.shared.lock().take(self.id, queues)?;
            if let Some((tag, queue, message)) = taken {
                return Ok(Some(Box::new(InMemoryDelivery {
                    tag,
                    queue,
                    body: message.body,
                    redelivered: message.redelivered,
                    shared: self.shared.clone(),
                })));
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(None);
            }
        }
    }
}

/// Delivery handed out by `InMemoryChannel::receive`.
struct InMemoryDelivery {
    tag: u64,
    queue: QueueName,
    body: Vec<u8>,
    redelivered: bool,
    shared: Shared,
}

impl InMemoryDelivery {
    fn settle(&self) -> Result<InFlight, ChannelError> {
        self.shared
            .lock()
            .in_flight
            .remove(&self.tag)
            .ok_or_else(|| ChannelError::UnknownDelivery(self.tag.to_string()))
    }
}

#[async_trait]
impl Delivery for InMemoryDelivery {
    fn queue(&self) -> QueueName {
        self.queue
    }

    fn body(&self) -> &[u8] {
        &self.body
    }

    fn redelivered(&self) -> bool {
        self.redelivered
    }

    fn tag(&self) -> String {
        self.tag.to_string()
    }

    async fn ack(self: Box<Self>) -> Result<(), ChannelError> {
        self.settle().map(|_| ())
    }

    async fn reject(self: Box<Self>, requeue: bool) -> Result<(), ChannelError> {
        let in_flight = self.settle()?;
        if requeue {
            self.shared.lock().requeue(in_flight);
            self.shared.notify.notify_waiters();
        }
        Ok(())
    }
}
