//! RedisStreamsChannel - the production message channel, on Redis Streams.
//!
//! ## Mapping
//! - **Queue**: one stream per queue name (`jobs.created`, ...)
//! - **Declare**: `XGROUP CREATE <queue> <group> 0 MKSTREAM`; every instance of
//!   a role joins the same group, which gives competing consumers
//! - **Publish**: `XADD <queue> * body <json>`
//! - **Receive**: this consumer's own pending entries first (left over from a
//!   previous run under the same name), then entries idle longer than
//!   `claim_idle` in other consumers' pending lists (`XAUTOCLAIM`), then new
//!   entries with a blocking `XREADGROUP`. `COUNT 1` applies per stream, so a
//!   read over several queues can return one entry from each; the extras wait
//!   in a local backlog and are handed out first on the next receive
//! - **In flight**: while a delivery is outstanding its claim is refreshed with
//!   `XCLAIM ... 0 <id> JUSTID` every `claim_idle / 3`, so a job that runs
//!   longer than `claim_idle` is not taken over by another consumer
//! - **Ack**: `XACK` + `XDEL`
//! - **Reject**: without requeue, `XACK` + `XDEL`; with requeue, the body is
//!   re-appended (flagged redelivered) and the original acked, in one `MULTI`
//!
//! Consumer names should be stable across restarts (`CONSUMER_NAME`): a
//! restarted consumer then resumes its own pending entries at once, and
//! `release` removes the consumer from the group on clean shutdown.
//!
//! Durability across broker restarts depends on the Redis persistence
//! configuration (AOF), not on anything here.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::Value;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, instrument, warn};

use crate::domain::QueueName;
use crate::error::ChannelError;
use crate::ports::{Delivery, MessageChannel};

pub const DEFAULT_GROUP: &str = "cloudtask";
pub const DEFAULT_BLOCK: Duration = Duration::from_millis(1000);
pub const DEFAULT_CLAIM_IDLE: Duration = Duration::from_secs(60);
/// Smallest `claim_idle` accepted by `connect`.
pub const MIN_CLAIM_IDLE: Duration = Duration::from_secs(3);

const BODY_FIELD: &str = "body";
const REDELIVERED_FIELD: &str = "redelivered";

#[derive(Debug, Clone)]
pub struct RedisChannelConfig {
    /// Consumer group shared by all instances of one role.
    pub group: String,
    /// Unique name of this consumer inside the group.
    pub consumer: String,
    /// How long one `XREADGROUP` blocks waiting for new entries.
    pub block: Duration,
    /// Pending entries idle this long are taken over from their consumer.
    pub claim_idle: Duration,
}

impl RedisChannelConfig {
    pub fn new(consumer: impl Into<String>) -> Self {
        Self {
            group: DEFAULT_GROUP.to_string(),
            consumer: consumer.into(),
            block: DEFAULT_BLOCK,
            claim_idle: DEFAULT_CLAIM_IDLE,
        }
    }

    /// How often an in-flight delivery refreshes its claim.
    pub fn keepalive_interval(&self) -> Duration {
        self.claim_idle / 3
    }

    pub fn validate(&self) -> Result<(), ChannelError> {
        if self.claim_idle < MIN_CLAIM_IDLE {
            return Err(ChannelError::InvalidConfig(format!(
                "claim_idle must be at least {MIN_CLAIM_IDLE:?}, got {:?}",
                self.claim_idle
            )));
        }
        if self.consumer.is_empty() {
            return Err(ChannelError::InvalidConfig(
                "consumer name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

type Entry = (QueueName, StreamEntry);
type RefreshFuture = Pin<Box<dyn Future<Output = Result<(), ChannelError>> + Send>>;

pub struct RedisStreamsChannel {
    conn: MultiplexedConnection,
    config: RedisChannelConfig,
    /// New entries read alongside the one handed out.
    backlog: Mutex<VecDeque<Entry>>,
}

impl RedisStreamsChannel {
    /// Connect and verify the connection with `PING`.
    #[instrument(skip(url, config), fields(consumer = %config.consumer), err)]
    pub async fn connect(url: &str, config: RedisChannelConfig) -> Result<Self, ChannelError> {
        config.validate()?;
        let client =
            redis::Client::open(url).map_err(|e| ChannelError::Connection(e.to_string()))?;
        let mut conn = client.get_multiplexed_tokio_connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(Self {
            conn,
            config,
            backlog: Mutex::new(VecDeque::new()),
        })
    }

    fn backlog(&self) -> MutexGuard<'_, VecDeque<Entry>> {
        self.backlog.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Remove this consumer from the group on every queue where it holds no
    /// pending entries. Queues where it still does keep the consumer, so
    /// those entries stay claimable.
    #[instrument(skip(self), fields(consumer = %self.config.consumer), err)]
    pub async fn release(&self, queues: &[QueueName]) -> Result<(), ChannelError> {
        for &queue in queues {
            let mut conn = self.conn.clone();
            let pending: Value = redis::cmd("XPENDING")
                .arg(queue.as_str())
                .arg(&self.config.group)
                .arg("-")
                .arg("+")
                .arg(1)
                .arg(&self.config.consumer)
                .query_async(&mut conn)
                .await?;
            if !pending_is_empty(&pending)? {
                warn!(%queue, "consumer still has pending entries; keeping it in the group");
                continue;
            }
            let _: u64 = redis::cmd("XGROUP")
                .arg("DELCONSUMER")
                .arg(queue.as_str())
                .arg(&self.config.group)
                .arg(&self.config.consumer)
                .query_async(&mut conn)
                .await?;
            info!(%queue, "consumer left the group");
        }
        Ok(())
    }

    async fn read_group(
        &self,
        queues: &[QueueName],
        start: &str,
        block: Option<Duration>,
    ) -> Result<Vec<Entry>, ChannelError> {
        let mut cmd = redis::cmd("XREADGROUP");
        cmd.arg("GROUP")
            .arg(&self.config.group)
            .arg(&self.config.consumer)
            .arg("COUNT")
            .arg(1);
        if let Some(block) = block {
            cmd.arg("BLOCK").arg(block.as_millis() as u64);
        }
        cmd.arg("STREAMS");
        for queue in queues {
            cmd.arg(queue.as_str());
        }
        for _ in queues {
            cmd.arg(start);
        }

        let mut conn = self.conn.clone();
        let reply: Value = cmd.query_async(&mut conn).await?;
        parse_read_reply(&reply)
    }

    async fn claim_abandoned(&self, queue: QueueName) -> Result<Option<StreamEntry>, ChannelError> {
        let mut conn = self.conn.clone();
        let reply: Value = redis::cmd("XAUTOCLAIM")
            .arg(queue.as_str())
            .arg(&self.config.group)
            .arg(&self.config.consumer)
            .arg(self.config.claim_idle.as_millis() as u64)
            .arg("0-0")
            .arg("COUNT")
            .arg(1)
            .query_async(&mut conn)
            .await?;
        parse_autoclaim_reply(&reply)
    }

    /// Wrap an entry as a delivery. Entries deleted while pending carry no
    /// body; those are acked away and skipped.
    async fn into_delivery(
        &self,
        queue: QueueName,
        entry: StreamEntry,
        redelivered: bool,
    ) -> Result<Option<Box<dyn Delivery>>, ChannelError> {
        let Some(body) = entry.body else {
            debug!(queue = %queue, id = %entry.id, "skipping deleted pending entry");
            let mut conn = self.conn.clone();
            let _: u64 = redis::cmd("XACK")
                .arg(queue.as_str())
                .arg(&self.config.group)
                .arg(&entry.id)
                .query_async(&mut conn)
                .await?;
            return Ok(None);
        };
        let stop = CancellationToken::new();
        tokio::spawn(keep_claimed(
            self.config.keepalive_interval(),
            stop.clone(),
            self.claim_refresher(queue, entry.id.clone()),
        ));
        Ok(Some(Box::new(RedisDelivery {
            conn: self.conn.clone(),
            group: self.config.group.clone(),
            queue,
            id: entry.id,
            body,
            redelivered: redelivered || entry.redelivered,
            _keepalive: stop.drop_guard(),
        })))
    }

    /// `XCLAIM` of one entry back to this consumer with zero min-idle, which
    /// resets its idle time without bumping the delivery count.
    fn claim_refresher(
        &self,
        queue: QueueName,
        id: String,
    ) -> impl FnMut() -> RefreshFuture + Send + 'static {
        let conn = self.conn.clone();
        let group = self.config.group.clone();
        let consumer = self.config.consumer.clone();
        move || {
            let mut conn = conn.clone();
            let mut cmd = redis::cmd("XCLAIM");
            cmd.arg(queue.as_str())
                .arg(&group)
                .arg(&consumer)
                .arg(0)
                .arg(&id)
                .arg("JUSTID");
            let refresh: RefreshFuture = Box::pin(async move {
                let _: Value = cmd.query_async(&mut conn).await?;
                Ok(())
            });
            refresh
        }
    }
}

#[async_trait]
impl MessageChannel for RedisStreamsChannel {
    #[instrument(skip(self), err)]
    async fn declare(&self, queue: QueueName) -> Result<(), ChannelError> {
        let mut conn = self.conn.clone();
        let created: redis::RedisResult<()> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(queue.as_str())
            .arg(&self.config.group)
            .arg("0")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;
        match created {
            Ok(()) => Ok(()),
            Err(e) if e.code() == Some("BUSYGROUP") => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn publish(&self, queue: QueueName, body: &[u8]) -> Result<(), ChannelError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("XADD")
            .arg(queue.as_str())
            .arg("*")
            .arg(BODY_FIELD)
            .arg(body)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn receive(
        &self,
        queues: &[QueueName],
    ) -> Result<Option<Box<dyn Delivery>>, ChannelError> {
        let parked = self.backlog().pop_front();
        if let Some((queue, entry)) = parked {
            return self.into_delivery(queue, entry, false).await;
        }

        // Own pending entries; any not handed out now come back on the next read.
        let pending = self.read_group(queues, "0", None).await?;
        if let Some((queue, entry)) = pending.into_iter().next() {
            return self.into_delivery(queue, entry, true).await;
        }

        for &queue in queues {
            if let Some(entry) = self.claim_abandoned(queue).await? {
                warn!(queue = %queue, id = %entry.id, "claimed entry abandoned by another consumer");
                return self.into_delivery(queue, entry, true).await;
            }
        }

        let fresh = self.read_group(queues, ">", Some(self.config.block)).await?;
        let first = take_first(fresh, &mut self.backlog());
        match first {
            Some((queue, entry)) => self.into_delivery(queue, entry, false).await,
            None => Ok(None),
        }
    }
}

struct RedisDelivery {
    conn: MultiplexedConnection,
    group: String,
    queue: QueueName,
    id: String,
    body: Vec<u8>,
    redelivered: bool,
    /// Stops the claim refresh when the delivery is resolved or dropped.
    _keepalive: DropGuard,
}

/// Call `refresh` every `period` until `stop` is cancelled. Failures are
/// logged and retried on the next tick.
async fn keep_claimed<F, Fut>(period: Duration, stop: CancellationToken, mut refresh: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), ChannelError>>,
{
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = stop.cancelled() => return,
            _ = ticker.tick() => {
                if let Err(err) = refresh().await {
                    warn!(error = %err, "could not refresh claim on in-flight entry");
                }
            }
        }
    }
}

/// Hand out the first entry of a read and park the rest.
fn take_first(entries: Vec<Entry>, backlog: &mut VecDeque<Entry>) -> Option<Entry> {
    let mut entries = entries.into_iter();
    let first = entries.next();
    backlog.extend(entries);
    first
}

#[async_trait]
impl Delivery for RedisDelivery {
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
        self.id.clone()
    }

    async fn ack(self: Box<Self>) -> Result<(), ChannelError> {
        let mut conn = self.conn.clone();
        redis::pipe()
            .atomic()
            .cmd("XACK")
            .arg(self.queue.as_str())
            .arg(&self.group)
            .arg(&self.id)
            .ignore()
            .cmd("XDEL")
            .arg(self.queue.as_str())
            .arg(&self.id)
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn reject(self: Box<Self>, requeue: bool) -> Result<(), ChannelError> {
        let mut conn = self.conn.clone();
        let mut pipe = redis::pipe();
        pipe.atomic();
        if requeue {
            pipe.cmd("XADD")
                .arg(self.queue.as_str())
                .arg("*")
                .arg(BODY_FIELD)
                .arg(&self.body)
                .arg(REDELIVERED_FIELD)
                .arg("1")
                .ignore();
        }
        pipe.cmd("XACK")
            .arg(self.queue.as_str())
            .arg(&self.group)
            .arg(&self.id)
            .ignore()
            .cmd("XDEL")
            .arg(self.queue.as_str())
            .arg(&self.id)
            .ignore();
        pipe.query_async::<_, ()>(&mut conn).await?;
        Ok(())
    }
}

/// A stream entry as read from Redis.
#[derive(Debug, Clone, PartialEq, Eq)]
struct StreamEntry {
    id: String,
    /// `None` when the entry was deleted while still pending.
    body: Option<Vec<u8>>,
    redelivered: bool,
}

fn bytes(value: &Value) -> Option<Vec<u8>> {
    match value {
        Value::Data(data) => Some(data.clone()),
        Value::Status(s) => Some(s.clone().into_bytes()),
        _ => None,
    }
}

fn text(value: &Value) -> Option<String> {
    bytes(value).map(|b| String::from_utf8_lossy(&b).into_owned())
}

fn protocol(what: &str) -> ChannelError {
    ChannelError::Protocol(what.to_string())
}

/// `[id, [field, value, ...]]`, or nil for an entry deleted under XAUTOCLAIM.
fn parse_entry(value: &Value) -> Result<Option<StreamEntry>, ChannelError> {
    let parts = match value {
        Value::Nil => return Ok(None),
        Value::Bulk(parts) if parts.len() == 2 => parts,
        _ => return Err(protocol("stream entry is not [id, fields]")),
    };
    let id = text(&parts[0]).ok_or_else(|| protocol("stream entry id is not a string"))?;

    let mut body = None;
    let mut redelivered = false;
    match &parts[1] {
        Value::Nil => {}
        Value::Bulk(fields) => {
            for pair in fields.chunks(2) {
                let [key, value] = pair else { continue };
                match text(key).as_deref() {
                    Some(BODY_FIELD) => body = bytes(value),
                    Some(REDELIVERED_FIELD) => redelivered = text(value).as_deref() == Some("1"),
                    _ => {}
                }
            }
        }
        _ => return Err(protocol("stream entry fields are not an array")),
    }
    Ok(Some(StreamEntry {
        id,
        body,
        redelivered,
    }))
}

/// `XREADGROUP` reply: nil, or `[[stream, [entry, ...]], ...]`. Entries come
/// back in reply order, which follows the order the streams were named in.
fn parse_read_reply(reply: &Value) -> Result<Vec<Entry>, ChannelError> {
    let mut out = Vec::new();
    let streams = match reply {
        Value::Nil => return Ok(out),
        Value::Bulk(streams) => streams,
        _ => return Err(protocol("XREADGROUP reply is not an array")),
    };
    for stream in streams {
        let Value::Bulk(parts) = stream else {
            return Err(protocol("XREADGROUP stream is not [key, entries]"));
        };
        let [key, entries] = parts.as_slice() else {
            return Err(protocol("XREADGROUP stream is not [key, entries]"));
        };
        let name = text(key).ok_or_else(|| protocol("stream key is not a string"))?;
        let queue = QueueName::parse(&name)
            .ok_or_else(|| ChannelError::Protocol(format!("unexpected stream {name}")))?;
        let Value::Bulk(entries) = entries else {
            continue;
        };
        for entry in entries {
            if let Some(entry) = parse_entry(entry)? {
                out.push((queue, entry));
            }
        }
    }
    Ok(out)
}

/// Extended `XPENDING` reply: an array of `[id, consumer, idle, count]`.
fn pending_is_empty(reply: &Value) -> Result<bool, ChannelError> {
    match reply {
        Value::Nil => Ok(true),
        Value::Bulk(entries) => Ok(entries.is_empty()),
        _ => Err(protocol("XPENDING reply is not an array")),
    }
}

/// `XAUTOCLAIM` reply: `[cursor, [entry, ...]]` (plus deleted ids on Redis 7).
fn parse_autoclaim_reply(reply: &Value) -> Result<Option<StreamEntry>, ChannelError> {
    let Value::Bulk(parts) = reply else {
        return Err(protocol("XAUTOCLAIM reply is not an array"));
    };
    match parts.get(1) {
        Some(Value::Bulk(entries)) => {
            for entry in entries {
                if let Some(entry) = parse_entry(entry)? {
                    return Ok(Some(entry));
                }
            }
            Ok(None)
        }
        _ => Err(protocol("XAUTOCLAIM reply has no entry list")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(s: &str) -> Value {
        Value::Data(s.as_bytes().to_vec())
    }

    fn entry(id: &str, fields: &[(&str, &str)]) -> Value {
        let mut flat = Vec::new();
        for (k, v) in fields {
            flat.push(data(k));
            flat.push(data(v));
        }
        Value::Bulk(vec![data(id), Value::Bulk(flat)])
    }

    #[test]
    fn read_reply_nil_is_empty() {
        assert!(parse_read_reply(&Value::Nil).unwrap().is_empty());
    }

    #[test]
    fn read_reply_tags_entries_with_their_queue() {
        let reply = Value::Bulk(vec![
            Value::Bulk(vec![data("jobs.started"), Value::Bulk(vec![])]),
            Value::Bulk(vec![
                data("jobs.completed"),
                Value::Bulk(vec![entry("1-0", &[("body", "{}")])]),
            ]),
        ]);
        let entries = parse_read_reply(&reply).unwrap();
        assert_eq!(entries.len(), 1);
        let (queue, entry) = &entries[0];
        assert_eq!(*queue, QueueName::JobsCompleted);
        assert_eq!(entry.id, "1-0");
        assert_eq!(entry.body.as_deref(), Some(&b"{}"[..]));
        assert!(!entry.redelivered);
    }

    #[test]
    fn redelivered_flag_is_read() {
        let reply = Value::Bulk(vec![Value::Bulk(vec![
            data("jobs.created"),
            Value::Bulk(vec![entry("2-0", &[("body", "x"), ("redelivered", "1")])]),
        ])]);
        let entries = parse_read_reply(&reply).unwrap();
        assert!(entries[0].1.redelivered);
    }

    #[test]
    fn deleted_pending_entry_has_no_body() {
        let value = Value::Bulk(vec![data("3-0"), Value::Nil]);
        let entry = parse_entry(&value).unwrap().unwrap();
        assert_eq!(entry.body, None);
    }

    #[test]
    fn unknown_stream_is_protocol_error() {
        let reply = Value::Bulk(vec![Value::Bulk(vec![
            data("other"),
            Value::Bulk(vec![entry("1-0", &[("body", "x")])]),
        ])]);
        assert!(matches!(
            parse_read_reply(&reply),
            Err(ChannelError::Protocol(_))
        ));
    }

    #[test]
    fn autoclaim_reply_with_and_without_entries() {
        let empty = Value::Bulk(vec![data("0-0"), Value::Bulk(vec![]), Value::Bulk(vec![])]);
        assert_eq!(parse_autoclaim_reply(&empty).unwrap(), None);

        let one = Value::Bulk(vec![
            data("0-0"),
            Value::Bulk(vec![Value::Nil, entry("4-0", &[("body", "y")])]),
        ]);
        let entry = parse_autoclaim_reply(&one).unwrap().unwrap();
        assert_eq!(entry.id, "4-0");
    }

    #[test]
    fn read_over_two_streams_keeps_the_second_entry() {
        let reply = Value::Bulk(vec![
            Value::Bulk(vec![
                data("jobs.started"),
                Value::Bulk(vec![entry("5-0", &[("body", "a")])]),
            ]),
            Value::Bulk(vec![
                data("jobs.completed"),
                Value::Bulk(vec![entry("6-0", &[("body", "b")])]),
            ]),
        ]);
        let mut backlog = VecDeque::new();

        let first = take_first(parse_read_reply(&reply).unwrap(), &mut backlog).unwrap();
        assert_eq!(first.0, QueueName::JobsStarted);
        assert_eq!(first.1.id, "5-0");

        assert_eq!(backlog.len(), 1);
        let (queue, parked) = backlog.pop_front().unwrap();
        assert_eq!(queue, QueueName::JobsCompleted);
        assert_eq!(parked.id, "6-0");
        assert!(!parked.redelivered);
    }

    #[test]
    fn take_first_of_nothing_parks_nothing() {
        let mut backlog = VecDeque::new();
        assert!(take_first(Vec::new(), &mut backlog).is_none());
        assert!(backlog.is_empty());
    }

    #[test]
    fn pending_reply_emptiness() {
        assert!(pending_is_empty(&Value::Bulk(vec![])).unwrap());
        assert!(pending_is_empty(&Value::Nil).unwrap());
        let one = Value::Bulk(vec![Value::Bulk(vec![
            data("1-0"),
            data("worker-a"),
            Value::Int(1200),
            Value::Int(1),
        ])]);
        assert!(!pending_is_empty(&one).unwrap());
        assert!(pending_is_empty(&Value::Int(0)).is_err());
    }

    #[test]
    fn keepalive_runs_well_inside_claim_idle() {
        let config = RedisChannelConfig::new("worker-a");
        assert!(config.validate().is_ok());
        assert_eq!(config.keepalive_interval(), Duration::from_secs(20));
        assert!(config.keepalive_interval() * 2 < config.claim_idle);
    }

    #[test]
    fn claim_idle_below_minimum_is_rejected() {
        let config = RedisChannelConfig {
            claim_idle: Duration::from_secs(1),
            ..RedisChannelConfig::new("worker-a")
        };
        assert!(matches!(
            config.validate(),
            Err(ChannelError::InvalidConfig(_))
        ));
        assert!(RedisChannelConfig::new("").validate().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn claim_is_refreshed_until_stopped() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicU32, Ordering};

        let refreshes = Arc::new(AtomicU32::new(0));
        let stop = CancellationToken::new();
        let task = tokio::spawn(keep_claimed(Duration::from_secs(20), stop.clone(), {
            let refreshes = refreshes.clone();
            move || {
                refreshes.fetch_add(1, Ordering::SeqCst);
                async { Ok::<(), ChannelError>(()) }
            }
        }));

        // A 300s job spans fifteen refresh periods.
        tokio::time::sleep(Duration::from_secs(301)).await;
        assert_eq!(refreshes.load(Ordering::SeqCst), 15);

        stop.cancel();
        task.await.unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(refreshes.load(Ordering::SeqCst), 15);
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_errors_do_not_stop_the_keepalive() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicU32, Ordering};

        let attempts = Arc::new(AtomicU32::new(0));
        let stop = CancellationToken::new();
        tokio::spawn(keep_claimed(Duration::from_secs(1), stop.clone(), {
            let attempts = attempts.clone();
            move || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(ChannelError::Connection("reset".to_string())) }
            }
        }));

        tokio::time::sleep(Duration::from_millis(3500)).await;
        stop.cancel();
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }
}
