//! Packet passthrough: per-source subscription fan-out
//!
//! A [`SubscriptionRegistry`] multiplexes one source's encoded packet feed to
//! any number of in-process subscribers. Each subscriber gets its own bounded
//! queue and a dedicated delivery task, so a slow callback can never stall
//! the producer or its sibling subscribers.
//!
//! # Architecture
//!
//! ```text
//!                      SubscriptionRegistry (one per source)
//!                  ┌──────────────────────────────────────┐
//!                  │ subs: HashMap<SubscriptionId,        │
//!                  │   Entry {                            │
//!                  │     queue: Arc<PacketQueue>,         │
//!                  │     cancel: CancellationToken,       │
//!                  │     delivery task,                   │
//!                  │   }                                  │
//!                  │ >                                    │
//!                  └───────────────┬──────────────────────┘
//!                                  │ publish(batch)
//!              ┌───────────────────┼───────────────────┐
//!              ▼                   ▼                   ▼
//!         [queue A]           [queue B]           [queue C]
//!              │                   │                   │
//!         delivery task       delivery task       delivery task
//!              │                   │                   │
//!         callback(batch)     callback(batch)     callback(batch)
//! ```
//!
//! # Backpressure
//!
//! The default [`OverflowPolicy::DropOldest`] evicts the oldest unconsumed
//! batch when a queue is full: real-time consumers prefer bounded staleness
//! over completeness, and producers are never blocked. Consumers that want
//! the opposite trade-off can opt into [`OverflowPolicy::Block`].
//!
//! Batches are delivered to a given callback in publish order; drops remove
//! batches but never reorder them.

pub mod error;
pub mod queue;
pub mod registry;
pub mod subscription;

pub use error::PassthroughError;
pub use queue::{OverflowPolicy, PacketQueue};
pub use registry::{RegistryStats, SubscriptionRegistry};
pub use subscription::{
    PacketCallback, SubscriptionHandle, SubscriptionId, TerminationReason, TerminationSignal,
};
