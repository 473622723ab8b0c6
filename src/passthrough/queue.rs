//! Bounded per-subscriber packet queue

use std::collections::VecDeque;
use std::num::NonZeroUsize;

use tokio::sync::{Mutex, Notify};

use crate::packet::PacketBatch;

/// What to do when a subscriber's queue is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Evict the oldest unconsumed batch to admit the new one.
    ///
    /// The producer never blocks; the subscriber sees a gap but stays
    /// current. This is the right default for live media.
    #[default]
    DropOldest,

    /// Make the producer wait for queue space.
    ///
    /// No batch is ever lost, but a slow subscriber stalls whoever calls
    /// `push`. Opt-in only.
    Block,
}

/// A bounded FIFO of packet batches with a configurable overflow policy
///
/// Single producer, single consumer. `push`/`pop` preserve arrival order;
/// the queue never holds more than `capacity` batches.
pub struct PacketQueue {
    inner: Mutex<QueueInner>,
    readable: Notify,
    writable: Notify,
    capacity: usize,
    policy: OverflowPolicy,
}

struct QueueInner {
    batches: VecDeque<PacketBatch>,
    dropped: u64,
    closed: bool,
}

impl PacketQueue {
    /// Create a queue holding at most `capacity` batches
    pub fn new(capacity: NonZeroUsize, policy: OverflowPolicy) -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                batches: VecDeque::with_capacity(capacity.get()),
                dropped: 0,
                closed: false,
            }),
            readable: Notify::new(),
            writable: Notify::new(),
            capacity: capacity.get(),
            policy,
        }
    }

    /// Enqueue a batch, applying the overflow policy if the queue is full
    ///
    /// Only awaits under [`OverflowPolicy::Block`]; with `DropOldest` this
    /// completes on the first poll. After [`close`](Self::close) the batch
    /// is discarded and this returns immediately.
    pub async fn push(&self, batch: PacketBatch) {
        match self.policy {
            OverflowPolicy::DropOldest => {
                let mut queue = self.inner.lock().await;
                if queue.closed {
                    return;
                }
                if queue.batches.len() == self.capacity {
                    queue.batches.pop_front();
                    queue.dropped += 1;
                }
                queue.batches.push_back(batch);
                drop(queue);
                self.readable.notify_one();
            }
            OverflowPolicy::Block => loop {
                // Register for a wakeup before checking, so a pop between
                // the check and the await cannot be missed.
                let writable = self.writable.notified();
                {
                    let mut queue = self.inner.lock().await;
                    if queue.closed {
                        return;
                    }
                    if queue.batches.len() < self.capacity {
                        queue.batches.push_back(batch);
                        drop(queue);
                        self.readable.notify_one();
                        return;
                    }
                }
                writable.await;
            },
        }
    }

    /// Close the queue, releasing any producer parked in `push`
    ///
    /// Subsequent pushes discard their batch and return immediately.
    pub async fn close(&self) {
        self.inner.lock().await.closed = true;
        // SPSC, so at most one parked producer; the stored permit also
        // covers a producer that has not registered its wait yet.
        self.writable.notify_one();
    }

    /// Dequeue the next batch, waiting while the queue is empty
    pub async fn pop(&self) -> PacketBatch {
        loop {
            let readable = self.readable.notified();
            {
                let mut queue = self.inner.lock().await;
                if let Some(batch) = queue.batches.pop_front() {
                    drop(queue);
                    self.writable.notify_one();
                    return batch;
                }
            }
            readable.await;
        }
    }

    /// Number of batches currently queued
    pub async fn len(&self) -> usize {
        self.inner.lock().await.batches.len()
    }

    /// Whether the queue is currently empty
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Number of batches evicted by the `DropOldest` policy
    pub async fn dropped(&self) -> u64 {
        self.inner.lock().await.dropped
    }

    /// Maximum number of batches this queue holds
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
