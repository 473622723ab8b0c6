//! Streams, the stream catalog, and per-stream workers
//!
//! A [`Stream`] is the named broadcast unit a remote peer asks for: one
//! source, one encoder configuration, and the set of transport-registered
//! sinks receiving its encoded output. The [`StreamCatalog`] guarantees at
//! most one stream per name. A [`StreamWorker`] drives production for one
//! stream and retries transient source faults under a jittered exponential
//! backoff instead of tearing the stream down.

pub mod backoff;
pub mod catalog;
pub mod config;
pub mod stream;
pub mod worker;

pub use backoff::{BackoffPolicy, BackoffState};
pub use catalog::{CatalogError, StreamCatalog};
pub use config::{EncodeError, Encoder, EncoderFactory, StreamConfig};
pub use stream::{PacketSink, Stream};
pub use worker::{StreamWorker, WorkerError, WorkerState};
