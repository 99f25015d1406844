//! Pending request store.
//!
//! Every accepted request parks a oneshot sender here under a fresh
//! correlation id. The response listener completes it; the connection
//! handler expires it when its wait runs out. An id is answered at most once.

use dashmap::DashMap;
use serde::Serialize;
use shared_types::{CorrelationId, DispatchKey, ReplyEnvelope};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, trace, warn};

/// Reply handed to the connection that registered the id.
#[derive(Debug)]
pub struct CorrelatedReply {
    pub correlation_id: CorrelationId,
    pub reply: ReplyEnvelope,
    /// Registration to completion.
    pub response_time: Duration,
}

struct Waiter {
    reply_to: oneshot::Sender<CorrelatedReply>,
    key: DispatchKey,
    registered_at: Instant,
    deadline: Instant,
}

/// Lifetime counters of a [`PendingRequestStore`].
#[derive(Debug, Default)]
pub struct PendingStats {
    registered: AtomicU64,
    completed: AtomicU64,
    timeouts: AtomicU64,
    cancelled: AtomicU64,
}

impl PendingStats {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PendingSnapshot {
        PendingSnapshot {
            registered: self.registered.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`PendingStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PendingSnapshot {
    pub registered: u64,
    pub completed: u64,
    /// Expired by the waiting connection or by the sweeper.
    pub timeouts: u64,
    /// Removed without a reply, or answered after the connection left.
    pub cancelled: u64,
}

/// Correlation id → waiting connection.
pub struct PendingRequestStore {
    waiters: DashMap<CorrelationId, Waiter>,
    default_timeout: Duration,
    stats: PendingStats,
}

impl PendingRequestStore {
    pub fn new(default_timeout: Duration) -> Self {
        Self {
            waiters: DashMap::new(),
            default_timeout,
            stats: PendingStats::default(),
        }
    }

    /// Park a new waiter for `key` and return its id and receiver.
    ///
    /// `timeout` overrides the store default for the sweeper's deadline.
    pub fn register(
        &self,
        key: &DispatchKey,
        timeout: Option<Duration>,
    ) -> (CorrelationId, oneshot::Receiver<CorrelatedReply>) {
        let id = CorrelationId::new();
        let (reply_to, receiver) = oneshot::channel();
        let registered_at = Instant::now();

        self.waiters.insert(
            id,
            Waiter {
                reply_to,
                key: key.clone(),
                registered_at,
                deadline: registered_at + timeout.unwrap_or(self.default_timeout),
            },
        );
        PendingStats::bump(&self.stats.registered);
        trace!(correlation_id = %id, key = %key, "Waiter parked");

        (id, receiver)
    }

    /// Hand `reply` to the waiter registered under `id`.
    ///
    /// False when the id is unknown (already answered, expired, or never
    /// issued) or when the connection stopped listening.
    pub fn complete(&self, id: CorrelationId, reply: ReplyEnvelope) -> bool {
        let Some((_, waiter)) = self.waiters.remove(&id) else {
            warn!(correlation_id = %id, "Dropping reply with no waiter");
            return false;
        };

        let response_time = waiter.registered_at.elapsed();
        let handed_over = waiter
            .reply_to
            .send(CorrelatedReply {
                correlation_id: id,
                reply,
                response_time,
            })
            .is_ok();

        if handed_over {
            PendingStats::bump(&self.stats.completed);
            debug!(
                correlation_id = %id,
                key = %waiter.key,
                elapsed_ms = response_time.as_millis(),
                "Reply correlated"
            );
        } else {
            PendingStats::bump(&self.stats.cancelled);
            debug!(correlation_id = %id, key = %waiter.key, "Connection left before reply");
        }
        handed_over
    }

    /// Remove a waiter whose connection stopped waiting for it.
    pub fn expire(&self, id: &CorrelationId) -> bool {
        let Some((_, waiter)) = self.waiters.remove(id) else {
            return false;
        };
        PendingStats::bump(&self.stats.timeouts);
        warn!(
            correlation_id = %id,
            key = %waiter.key,
            waited_ms = waiter.registered_at.elapsed().as_millis(),
            "No reply before deadline"
        );
        true
    }

    /// Remove a waiter that will never get a reply, e.g. nothing was routed.
    pub fn cancel(&self, id: &CorrelationId) -> bool {
        let removed = self.waiters.remove(id).is_some();
        if removed {
            PendingStats::bump(&self.stats.cancelled);
        }
        removed
    }

    /// Sweep waiters past their deadline. Returns how many were removed.
    pub fn remove_expired(&self) -> usize {
        let now = Instant::now();
        let mut swept = 0;

        self.waiters.retain(|id, waiter| {
            let live = now < waiter.deadline;
            if !live {
                swept += 1;
                PendingStats::bump(&self.stats.timeouts);
                warn!(correlation_id = %id, key = %waiter.key, "Sweeping abandoned waiter");
            }
            live
        });

        swept
    }

    pub fn pending_count(&self) -> usize {
        self.waiters.len()
    }

    pub fn is_pending(&self, id: &CorrelationId) -> bool {
        self.waiters.contains_key(id)
    }

    pub fn stats(&self) -> &PendingStats {
        &self.stats
    }
}

/// Sweep `store` every `every` until the task is aborted.
pub async fn cleanup_task(store: Arc<PendingRequestStore>, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        match store.remove_expired() {
            0 => {}
            swept => debug!(swept, "Pending store swept"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shared_types::ParamType;

    fn add_key() -> DispatchKey {
        DispatchKey::new("arithmetic", "add")
    }

    fn store() -> PendingRequestStore {
        PendingRequestStore::new(Duration::from_secs(30))
    }

    #[tokio::test]
    async fn test_reply_reaches_its_waiter() {
        let store = store();
        let (id, receiver) = store.register(&add_key(), None);
        assert!(store.is_pending(&id));

        let reply = ReplyEnvelope::success(ParamType::Number, json!(5));
        assert!(store.complete(id, reply.clone()));

        let correlated = receiver.await.unwrap();
        assert_eq!(correlated.correlation_id, id);
        assert_eq!(correlated.reply, reply);
        assert!(!store.is_pending(&id));
    }

    #[tokio::test]
    async fn test_waiters_are_independent() {
        let store = store();
        let (first, first_rx) = store.register(&add_key(), None);
        let (second, second_rx) = store.register(&DispatchKey::new("arithmetic", "subtract"), None);

        // Answer out of order.
        store.complete(second, ReplyEnvelope::success(ParamType::Number, json!(-1)));
        store.complete(first, ReplyEnvelope::success(ParamType::Number, json!(5)));

        assert_eq!(second_rx.await.unwrap().correlation_id, second);
        assert_eq!(first_rx.await.unwrap().correlation_id, first);
    }

    #[tokio::test]
    async fn test_id_is_answered_once() {
        let store = store();
        let (id, receiver) = store.register(&add_key(), None);

        assert!(store.complete(id, ReplyEnvelope::not_found()));
        assert!(!store.complete(id, ReplyEnvelope::internal_error()));
        assert_eq!(receiver.await.unwrap().reply.status_code, 404);
    }

    #[test]
    fn test_reply_without_waiter_is_dropped() {
        let store = store();
        assert!(!store.complete(CorrelationId::new(), ReplyEnvelope::not_found()));
        assert_eq!(store.stats().snapshot().completed, 0);
    }

    #[test]
    fn test_departed_connection_counts_as_cancelled() {
        let store = store();
        let (id, receiver) = store.register(&add_key(), None);
        drop(receiver);

        assert!(!store.complete(id, ReplyEnvelope::not_found()));
        assert_eq!(store.stats().snapshot().cancelled, 1);
        assert_eq!(store.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_sweep_respects_per_request_deadline() {
        let store = store();
        let (short, _short_rx) = store.register(&add_key(), Some(Duration::from_millis(5)));
        let (long, _long_rx) = store.register(&add_key(), None);

        tokio::time::sleep(Duration::from_millis(25)).await;

        assert_eq!(store.remove_expired(), 1);
        assert!(!store.is_pending(&short));
        assert!(store.is_pending(&long));
    }

    #[test]
    fn test_expire_and_cancel_are_counted_separately() {
        let store = store();
        let (timed_out, _rx1) = store.register(&add_key(), None);
        let (unrouted, _rx2) = store.register(&add_key(), None);

        assert!(store.expire(&timed_out));
        assert!(!store.expire(&timed_out));
        assert!(store.cancel(&unrouted));
        assert!(!store.cancel(&unrouted));

        assert_eq!(
            store.stats().snapshot(),
            PendingSnapshot {
                registered: 2,
                completed: 0,
                timeouts: 1,
                cancelled: 1,
            }
        );
    }

    #[tokio::test]
    async fn test_cleanup_task_sweeps_periodically() {
        let store = Arc::new(PendingRequestStore::new(Duration::from_millis(10)));
        let (_id, _rx) = store.register(&add_key(), None);

        let sweeper = tokio::spawn(cleanup_task(Arc::clone(&store), Duration::from_millis(20)));
        tokio::time::sleep(Duration::from_millis(80)).await;

        assert_eq!(store.pending_count(), 0);
        sweeper.abort();
    }
}
