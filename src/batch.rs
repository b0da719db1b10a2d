//! Outbound message batching.
//!
//! XMPP servers rate-limit aggressive senders, so outbound traffic never
//! goes straight to the client session. Lines are queued per recipient and
//! a pump task flushes the whole queue at most once per configured
//! interval, either newline-joining each recipient's backlog into one
//! stanza (default) or emitting one stanza per line.
//!
//! Per-recipient enqueue order is preserved within a flush; delivery order
//! across recipients is unspecified.

use crate::config::BatchConfig;
use crate::transport::ChatTransport;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tracing::{debug, warn};

/// Outbound lines collected while the engine state lock is held, then
/// handed to the batcher once the lock is released. Keeps the state mutex
/// and the batcher mutex from ever being held together.
#[derive(Debug, Default)]
pub struct Outbox {
    lines: Vec<(String, String)>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one line for `to`.
    pub fn push(&mut self, to: &str, line: impl Into<String>) {
        self.lines.push((to.to_string(), line.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Consume the outbox, yielding `(to, line)` pairs in push order.
    pub fn drain(self) -> Vec<(String, String)> {
        self.lines
    }
}

/// Rate-limited per-recipient message pump.
pub struct OutboundBatcher {
    inner: Arc<Inner>,
}

struct Inner {
    transport: Arc<dyn ChatTransport>,
    interval: Duration,
    separate_messages: bool,
    queue: Mutex<QueueState>,
    /// Woken when lines are enqueued.
    wakeup: Notify,
    /// Woken when a flush completes.
    drained: Notify,
}

#[derive(Default)]
struct QueueState {
    /// Pending lines per bare JID, in enqueue order.
    pending: HashMap<String, Vec<String>>,
    /// When the last flush burst finished.
    last_flush: Option<Instant>,
    /// True while a detached snapshot is being sent.
    in_flight: bool,
}

impl OutboundBatcher {
    /// Create the batcher and start its pump task. The pump runs for the
    /// process lifetime.
    pub fn start(transport: Arc<dyn ChatTransport>, config: &BatchConfig) -> Self {
        let inner = Arc::new(Inner {
            transport,
            interval: config.interval(),
            separate_messages: config.separate_messages,
            queue: Mutex::new(QueueState::default()),
            wakeup: Notify::new(),
            drained: Notify::new(),
        });
        tokio::spawn(pump(Arc::clone(&inner)));
        Self { inner }
    }

    /// Queue one line for a recipient. Never blocks.
    pub fn enqueue(&self, to: &str, line: impl Into<String>) {
        {
            let mut queue = self.inner.lock_queue();
            queue.pending.entry(to.to_string()).or_default().push(line.into());
        }
        self.inner.wakeup.notify_one();
    }

    /// Drain a collected [`Outbox`] into the queue.
    pub fn enqueue_outbox(&self, outbox: Outbox) {
        if outbox.is_empty() {
            return;
        }
        {
            let mut queue = self.inner.lock_queue();
            for (to, line) in outbox.drain() {
                queue.pending.entry(to).or_default().push(line);
            }
        }
        self.inner.wakeup.notify_one();
    }

    /// Wait until nothing is queued and no flush is in flight.
    ///
    /// Test hook: lets scenarios assert on delivered traffic without racing
    /// the pump.
    pub async fn wait_until_drained(&self) {
        loop {
            let notified = self.inner.drained.notified();
            {
                let queue = self.inner.lock_queue();
                if queue.pending.is_empty() && !queue.in_flight {
                    return;
                }
            }
            notified.await;
        }
    }
}

impl Inner {
    fn lock_queue(&self) -> MutexGuard<'_, QueueState> {
        // Poisoning means a panic mid-flush; the exception policy crashes
        // the process anyway.
        self.queue.lock().expect("batcher queue mutex poisoned")
    }
}

async fn pump(inner: Arc<Inner>) {
    loop {
        // Wait until something is queued. The predicate is re-checked under
        // the lock after every wake.
        loop {
            {
                let queue = inner.lock_queue();
                if !queue.pending.is_empty() {
                    break;
                }
            }
            inner.wakeup.notified().await;
        }

        // Pace: at most one send burst per interval.
        let wait = {
            let queue = inner.lock_queue();
            queue
                .last_flush
                .map_or(Duration::ZERO, |at| inner.interval.saturating_sub(at.elapsed()))
        };
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }

        // Detach the queue so lines enqueued during the send land in the
        // next burst.
        let snapshot = {
            let mut queue = inner.lock_queue();
            queue.in_flight = true;
            std::mem::take(&mut queue.pending)
        };

        for (to, lines) in snapshot {
            if lines.is_empty() {
                continue;
            }
            debug!(to = %to, lines = lines.len(), "Flushing outbound batch");
            if inner.separate_messages {
                for line in &lines {
                    if let Err(e) = inner.transport.send_chat(&to, line).await {
                        warn!(to = %to, error = %e, "Dropping outbound message");
                    }
                }
            } else {
                let body = lines.join("\n");
                if let Err(e) = inner.transport.send_chat(&to, &body).await {
                    warn!(to = %to, error = %e, "Dropping outbound batch");
                }
            }
        }

        {
            let mut queue = inner.lock_queue();
            queue.last_flush = Some(Instant::now());
            queue.in_flight = false;
        }
        inner.drained.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use async_trait::async_trait;

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<(String, String)>>,
        fail: std::sync::atomic::AtomicBool,
    }

    impl RecordingTransport {
        fn sent(&self) -> Vec<(String, String)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatTransport for RecordingTransport {
        async fn send_chat(&self, to: &str, body: &str) -> Result<(), TransportError> {
            if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(TransportError::Send("wire down".into()));
            }
            self.sent.lock().unwrap().push((to.to_string(), body.to_string()));
            Ok(())
        }
    }

    fn zero_interval() -> BatchConfig {
        BatchConfig {
            interval_ms: 0,
            separate_messages: false,
        }
    }

    #[tokio::test]
    async fn merges_backlog_per_recipient_in_fifo_order() {
        let transport = Arc::new(RecordingTransport::default());
        let batcher = OutboundBatcher::start(transport.clone(), &zero_interval());

        batcher.enqueue("foo@example.com", "one");
        batcher.enqueue("foo@example.com", "two");
        batcher.enqueue("foo@example.com", "three");
        batcher.wait_until_drained().await;

        assert_eq!(
            transport.sent(),
            vec![("foo@example.com".to_string(), "one\ntwo\nthree".to_string())]
        );
    }

    #[tokio::test]
    async fn separate_mode_emits_one_stanza_per_line() {
        let transport = Arc::new(RecordingTransport::default());
        let config = BatchConfig {
            interval_ms: 0,
            separate_messages: true,
        };
        let batcher = OutboundBatcher::start(transport.clone(), &config);

        batcher.enqueue("foo@example.com", "one");
        batcher.enqueue("foo@example.com", "two");
        batcher.wait_until_drained().await;

        let bodies: Vec<String> = transport.sent().into_iter().map(|(_, b)| b).collect();
        assert_eq!(bodies, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn recipients_get_independent_batches() {
        let transport = Arc::new(RecordingTransport::default());
        let batcher = OutboundBatcher::start(transport.clone(), &zero_interval());

        batcher.enqueue("foo@example.com", "for foo");
        batcher.enqueue("bar@example.com", "for bar");
        batcher.wait_until_drained().await;

        let mut sent = transport.sent();
        sent.sort();
        assert_eq!(
            sent,
            vec![
                ("bar@example.com".to_string(), "for bar".to_string()),
                ("foo@example.com".to_string(), "for foo".to_string()),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn paces_consecutive_flushes_by_interval() {
        let transport = Arc::new(RecordingTransport::default());
        let config = BatchConfig {
            interval_ms: 5_000,
            separate_messages: false,
        };
        let batcher = OutboundBatcher::start(transport.clone(), &config);

        batcher.enqueue("foo@example.com", "first");
        batcher.wait_until_drained().await;
        let first_done = tokio::time::Instant::now();

        batcher.enqueue("foo@example.com", "second");
        batcher.wait_until_drained().await;

        assert!(tokio::time::Instant::now() - first_done >= Duration::from_secs(5));
        assert_eq!(transport.sent().len(), 2);
    }

    #[tokio::test]
    async fn send_failure_is_dropped_not_retried() {
        let transport = Arc::new(RecordingTransport::default());
        let batcher = OutboundBatcher::start(transport.clone(), &zero_interval());

        transport.fail.store(true, std::sync::atomic::Ordering::SeqCst);
        batcher.enqueue("foo@example.com", "lost");
        batcher.wait_until_drained().await;
        assert!(transport.sent().is_empty());

        // The pump survives and later sends go through.
        transport.fail.store(false, std::sync::atomic::Ordering::SeqCst);
        batcher.enqueue("foo@example.com", "delivered");
        batcher.wait_until_drained().await;
        assert_eq!(
            transport.sent(),
            vec![("foo@example.com".to_string(), "delivered".to_string())]
        );
    }

    #[tokio::test]
    async fn outbox_lines_flow_through_the_queue() {
        let transport = Arc::new(RecordingTransport::default());
        let batcher = OutboundBatcher::start(transport.clone(), &zero_interval());

        let mut outbox = Outbox::new();
        outbox.push("foo@example.com", "a");
        outbox.push("foo@example.com", "b");
        batcher.enqueue_outbox(outbox);
        batcher.wait_until_drained().await;

        assert_eq!(
            transport.sent(),
            vec![("foo@example.com".to_string(), "a\nb".to_string())]
        );
    }
}
