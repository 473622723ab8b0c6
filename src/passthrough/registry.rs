//! Per-source subscription registry
//!
//! One registry owns all passthrough subscriptions for a single source's
//! packet feed. The producing side calls [`SubscriptionRegistry::publish`];
//! consumers come and go via subscribe/unsubscribe; closing the source tears
//! everything down deterministically.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::packet::PacketBatch;

use super::error::PassthroughError;
use super::queue::{OverflowPolicy, PacketQueue};
use super::subscription::{
    PacketCallback, SubscriptionHandle, SubscriptionId, TerminationReason, TerminationSignal,
};

/// Snapshot of registry activity
#[derive(Debug, Clone, Default)]
pub struct RegistryStats {
    /// Subscriptions currently active
    pub active_subscriptions: usize,
    /// Total batches accepted by `publish`
    pub published_batches: u64,
    /// Batches evicted across all subscriber queues (drop-oldest policy)
    pub dropped_batches: u64,
}

struct SubscriptionEntry {
    queue: Arc<PacketQueue>,
    cancel: CancellationToken,
    terminated_tx: oneshot::Sender<TerminationReason>,
    task: JoinHandle<()>,
}

struct RegistryInner {
    subs: HashMap<SubscriptionId, SubscriptionEntry>,
    closed: bool,
}

/// Owns and multiplexes all passthrough subscriptions for one source
///
/// Every active subscription in the map has a live delivery task; an entry is
/// removed atomically with its termination signal firing, so the map never
/// holds a terminated subscription.
pub struct SubscriptionRegistry {
    inner: Mutex<RegistryInner>,
    cancel: CancellationToken,
    policy: OverflowPolicy,
    enabled: bool,
    published: AtomicU64,
    dropped_by_removed: AtomicU64,
}

impl SubscriptionRegistry {
    /// Create an enabled registry with the default drop-oldest policy
    pub fn new() -> Self {
        Self::with_policy(OverflowPolicy::DropOldest)
    }

    /// Create an enabled registry with an explicit overflow policy
    pub fn with_policy(policy: OverflowPolicy) -> Self {
        Self {
            inner: Mutex::new(RegistryInner {
                subs: HashMap::new(),
                closed: false,
            }),
            cancel: CancellationToken::new(),
            policy,
            enabled: true,
            published: AtomicU64::new(0),
            dropped_by_removed: AtomicU64::new(0),
        }
    }

    /// Create a registry for a source without passthrough support
    ///
    /// Subscribe and unsubscribe report [`PassthroughError::NotEnabled`]
    /// without allocating anything.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new()
        }
    }

    /// Whether this source supports passthrough at all
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Register a new subscriber
    ///
    /// Allocates a bounded queue of `buffer_capacity` batches and starts a
    /// delivery task that drains it into `callback` in arrival order. Returns
    /// immediately with the subscription's ID and termination signal.
    ///
    /// Fails with [`PassthroughError::NotEnabled`] when passthrough is
    /// disabled for this source or the source has already been closed.
    pub async fn subscribe(
        &self,
        buffer_capacity: NonZeroUsize,
        mut callback: PacketCallback,
    ) -> Result<SubscriptionHandle, PassthroughError> {
        if !self.enabled {
            return Err(PassthroughError::NotEnabled);
        }

        let mut inner = self.inner.lock().await;
        if inner.closed {
            return Err(PassthroughError::NotEnabled);
        }

        let id = SubscriptionId::generate();
        let queue = Arc::new(PacketQueue::new(buffer_capacity, self.policy));
        let cancel = self.cancel.child_token();
        let (terminated_tx, terminated) = TerminationSignal::channel();

        let task = {
            let queue = Arc::clone(&queue);
            let cancel = cancel.clone();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        batch = queue.pop() => callback(batch),
                    }
                }
            })
        };

        inner.subs.insert(
            id,
            SubscriptionEntry {
                queue,
                cancel,
                terminated_tx,
                task,
            },
        );

        tracing::debug!(
            subscription = %id,
            capacity = buffer_capacity.get(),
            subscribers = inner.subs.len(),
            "Subscriber added"
        );

        Ok(SubscriptionHandle { id, terminated })
    }

    /// Fan a batch out to every active subscription
    ///
    /// Under the drop-oldest policy this never waits on a slow subscriber;
    /// under the blocking policy it waits for each full queue in turn.
    pub async fn publish(&self, batch: PacketBatch) {
        let queues: Vec<Arc<PacketQueue>> = {
            let inner = self.inner.lock().await;
            if inner.closed {
                return;
            }
            inner.subs.values().map(|e| Arc::clone(&e.queue)).collect()
        };

        self.published.fetch_add(1, Ordering::Relaxed);

        for queue in queues {
            queue.push(batch.clone()).await;
        }
    }

    /// Terminate one subscription
    ///
    /// Stops its delivery task, fires its termination signal with
    /// [`TerminationReason::Unsubscribed`], and removes it from the map.
    /// Fails with [`PassthroughError::NotFound`] for IDs that were never
    /// issued or have already been terminated.
    pub async fn unsubscribe(&self, id: SubscriptionId) -> Result<(), PassthroughError> {
        if !self.enabled {
            return Err(PassthroughError::NotEnabled);
        }

        let entry = {
            let mut inner = self.inner.lock().await;
            inner
                .subs
                .remove(&id)
                .ok_or(PassthroughError::NotFound(id))?
        };

        self.retire(id, entry, TerminationReason::Unsubscribed)
            .await;

        tracing::debug!(subscription = %id, "Subscriber removed");
        Ok(())
    }

    /// Terminate every remaining subscription and refuse new ones
    ///
    /// Does not return until every delivery task has observed cancellation
    /// and stopped. Idempotent: repeated calls are no-ops, and subsequent
    /// subscribe calls degrade to [`PassthroughError::NotEnabled`].
    pub async fn close_all(&self) {
        let entries: Vec<(SubscriptionId, SubscriptionEntry)> = {
            let mut inner = self.inner.lock().await;
            inner.closed = true;
            inner.subs.drain().collect()
        };

        if entries.is_empty() {
            return;
        }

        let count = entries.len();
        for (id, entry) in entries {
            self.retire(id, entry, TerminationReason::SourceClosed)
                .await;
        }

        tracing::info!(subscribers = count, "Passthrough closed, all subscribers terminated");
    }

    /// Current registry statistics
    pub async fn stats(&self) -> RegistryStats {
        let inner = self.inner.lock().await;
        let mut dropped = self.dropped_by_removed.load(Ordering::Relaxed);
        for entry in inner.subs.values() {
            dropped += entry.queue.dropped().await;
        }
        RegistryStats {
            active_subscriptions: inner.subs.len(),
            published_batches: self.published.load(Ordering::Relaxed),
            dropped_batches: dropped,
        }
    }

    /// Number of active subscriptions
    pub async fn subscriber_count(&self) -> usize {
        self.inner.lock().await.subs.len()
    }

    async fn retire(
        &self,
        id: SubscriptionId,
        entry: SubscriptionEntry,
        reason: TerminationReason,
    ) {
        entry.cancel.cancel();
        // Release a producer parked on this queue's overflow policy before
        // waiting on the delivery task.
        entry.queue.close().await;
        if let Err(e) = entry.task.await {
            tracing::warn!(subscription = %id, error = %e, "Delivery task ended abnormally");
        }
        self.dropped_by_removed
            .fetch_add(entry.queue.dropped().await, Ordering::Relaxed);
        // The receiver may have been dropped by an uninterested caller.
        let _ = entry.terminated_tx.send(reason);
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use bytes::Bytes;
    use tokio::sync::mpsc;

    use super::*;
    use crate::packet::Packet;

    fn capacity(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    fn batch(tag: u8) -> PacketBatch {
        vec![Packet::new(Bytes::from(vec![tag]), u32::from(tag))]
    }

    /// Callback that forwards batches into an mpsc channel for assertions
    fn channel_callback() -> (PacketCallback, mpsc::UnboundedReceiver<PacketBatch>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let callback: PacketCallback = Box::new(move |batch| {
            let _ = tx.send(batch);
        });
        (callback, rx)
    }

    #[tokio::test]
    async fn test_subscribe_then_publish_delivers() {
        let registry = SubscriptionRegistry::new();
        let (callback, mut rx) = channel_callback();

        let handle = registry.subscribe(capacity(8), callback).await.unwrap();
        registry.publish(batch(1)).await;

        let delivered = rx.recv().await.unwrap();
        assert_eq!(delivered[0].data[0], 1);

        // Still active: no termination signal yet
        let mut terminated = handle.terminated;
        assert_eq!(terminated.try_wait(), None);
    }

    #[tokio::test]
    async fn test_delivery_preserves_publish_order() {
        let registry = SubscriptionRegistry::new();
        let (callback, mut rx) = channel_callback();

        registry.subscribe(capacity(512), callback).await.unwrap();

        for tag in 0..4 {
            registry.publish(batch(tag)).await;
        }

        for tag in 0..4 {
            let delivered = rx.recv().await.unwrap();
            assert_eq!(delivered[0].data[0], tag);
        }
    }

    #[tokio::test]
    async fn test_scenario_publish_unsubscribe_lifecycle() {
        // Full lifecycle: 512-capacity subscription, 4 batches delivered in
        // order, unknown-ID unsubscribe fails, real unsubscribe terminates.
        let registry = SubscriptionRegistry::new();
        let (callback, mut rx) = channel_callback();

        let handle = registry.subscribe(capacity(512), callback).await.unwrap();

        for tag in 0..4 {
            registry.publish(batch(tag)).await;
        }
        for tag in 0..4 {
            assert_eq!(rx.recv().await.unwrap()[0].data[0], tag);
        }

        let bogus = SubscriptionId::generate();
        assert_eq!(
            registry.unsubscribe(bogus).await,
            Err(PassthroughError::NotFound(bogus))
        );

        registry.unsubscribe(handle.id).await.unwrap();
        assert_eq!(handle.terminated.wait().await, TerminationReason::Unsubscribed);
    }

    #[tokio::test]
    async fn test_unsubscribe_twice_fails_with_not_found() {
        let registry = SubscriptionRegistry::new();
        let (callback, _rx) = channel_callback();

        let handle = registry.subscribe(capacity(4), callback).await.unwrap();

        registry.unsubscribe(handle.id).await.unwrap();
        assert_eq!(
            registry.unsubscribe(handle.id).await,
            Err(PassthroughError::NotFound(handle.id))
        );
    }

    #[tokio::test]
    async fn test_close_all_terminates_and_rejects_new_subscribers() {
        let registry = SubscriptionRegistry::new();
        let (cb_a, _rx_a) = channel_callback();
        let (cb_b, _rx_b) = channel_callback();

        let a = registry.subscribe(capacity(4), cb_a).await.unwrap();
        let b = registry.subscribe(capacity(4), cb_b).await.unwrap();

        registry.close_all().await;

        assert_eq!(a.terminated.wait().await, TerminationReason::SourceClosed);
        assert_eq!(b.terminated.wait().await, TerminationReason::SourceClosed);
        assert_eq!(registry.subscriber_count().await, 0);

        let (cb_c, _rx_c) = channel_callback();
        assert!(matches!(
            registry.subscribe(capacity(4), cb_c).await,
            Err(PassthroughError::NotEnabled)
        ));

        // Idempotent
        registry.close_all().await;
    }

    #[tokio::test]
    async fn test_no_callbacks_after_close() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let delivered = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&delivered);
        let callback: PacketCallback = Box::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let handle = registry.subscribe(capacity(4), callback).await.unwrap();
        registry.publish(batch(0)).await;

        registry.close_all().await;
        assert_eq!(handle.terminated.wait().await, TerminationReason::SourceClosed);

        // close_all returned, so the delivery task has stopped; nothing
        // published afterwards may reach the callback.
        let after_close = delivered.load(Ordering::SeqCst);
        registry.publish(batch(1)).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(delivered.load(Ordering::SeqCst), after_close);
    }

    #[tokio::test]
    async fn test_slow_subscriber_sees_ordered_subsequence() {
        let registry = SubscriptionRegistry::new();

        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<u8>();
        let callback: PacketCallback = Box::new(move |batch: PacketBatch| {
            let _ = out_tx.send(batch[0].data[0]);
        });

        let _handle = registry.subscribe(capacity(2), callback).await.unwrap();

        // Outpace the 2-slot queue
        for tag in 0..20 {
            registry.publish(batch(tag)).await;
        }

        // Let the delivery loop drain what survived, then tear down so the
        // callback (and with it out_tx) is dropped.
        tokio::time::sleep(Duration::from_millis(50)).await;
        registry.close_all().await;

        let mut seen = Vec::new();
        while let Some(tag) = out_rx.recv().await {
            seen.push(tag);
        }

        // Whatever was delivered is a strictly increasing subsequence of the
        // published order: drops, never reorders.
        assert!(!seen.is_empty());
        assert!(seen.windows(2).all(|w| w[0] < w[1]), "order inverted: {seen:?}");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_blocked_publisher_released_on_close() {
        let registry = Arc::new(SubscriptionRegistry::with_policy(OverflowPolicy::Block));

        // Callback parks on the gate, wedging the delivery task mid-batch
        let (gate_tx, gate_rx) = std::sync::mpsc::channel::<()>();
        let callback: PacketCallback = Box::new(move |_| {
            let _ = gate_rx.recv();
        });
        registry.subscribe(capacity(1), callback).await.unwrap();

        registry.publish(batch(0)).await;
        // Let the delivery task pop the batch and enter the callback
        tokio::time::sleep(Duration::from_millis(50)).await;
        registry.publish(batch(1)).await;

        // The queue is full and its consumer is stuck: this publish parks
        let producer = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move { registry.publish(batch(2)).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!producer.is_finished(), "publish should be parked on the full queue");

        let closer = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move { registry.close_all().await })
        };

        // Closing must release the parked publish even while the delivery
        // task is still inside its callback.
        tokio::time::timeout(Duration::from_secs(2), producer)
            .await
            .expect("publish still blocked after close_all")
            .unwrap();

        drop(gate_tx);
        closer.await.unwrap();
        assert_eq!(registry.subscriber_count().await, 0);
    }

    #[tokio::test]
    async fn test_disabled_registry_rejects_everything() {
        let registry = SubscriptionRegistry::disabled();
        assert!(!registry.is_enabled());

        let (callback, _rx) = channel_callback();
        assert!(matches!(
            registry.subscribe(capacity(4), callback).await,
            Err(PassthroughError::NotEnabled)
        ));
        assert!(matches!(
            registry.unsubscribe(SubscriptionId::generate()).await,
            Err(PassthroughError::NotEnabled)
        ));
    }

    #[tokio::test]
    async fn test_stats_track_drops_and_publishes() {
        let registry = SubscriptionRegistry::new();
        let (callback, _rx) = channel_callback();

        let handle = registry.subscribe(capacity(1), callback).await.unwrap();

        for tag in 0..5 {
            registry.publish(batch(tag)).await;
        }

        let stats = registry.stats().await;
        assert_eq!(stats.active_subscriptions, 1);
        assert_eq!(stats.published_batches, 5);

        registry.unsubscribe(handle.id).await.unwrap();
        let stats = registry.stats().await;
        assert_eq!(stats.active_subscriptions, 0);
        // Drop counts from removed subscriptions are retained
        assert_eq!(stats.published_batches, 5);
    }

    #[tokio::test]
    async fn test_publish_with_no_subscribers_is_harmless() {
        let registry = SubscriptionRegistry::new();
        registry.publish(batch(0)).await;
        assert_eq!(registry.stats().await.published_batches, 1);
    }
}
