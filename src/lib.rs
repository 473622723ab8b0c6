//! # mediahub
//!
//! Real-time media fan-out core for robotics middleware: takes the frames
//! and audio samples produced by hardware-backed sources (cameras,
//! microphones) and distributes them, with low latency, to any number of
//! concurrent consumers.
//!
//! Two independent delivery paths share the same sources:
//!
//! - **Passthrough subscriptions** ([`passthrough`]): in-process consumers
//!   register a callback against a source's encoded packet feed and get
//!   their own bounded queue with drop-oldest backpressure and explicit
//!   cancellation.
//! - **Streams** ([`stream`], [`orchestrator`]): named broadcast units
//!   announced to a transport layer for remote peers. A per-stream worker
//!   pulls, encodes, and broadcasts, retrying transient hardware faults
//!   under a jittered exponential backoff instead of tearing the stream
//!   down.
//!
//! The [`StreamOrchestrator`] ties it together: on every configuration
//! change it re-derives the set of media sources from a typed resource
//! snapshot, creates missing streams exactly once, and starts or restarts
//! their workers. One source's failure never blocks the rest.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use mediahub::{ResourceSet, StreamConfig, StreamOrchestrator};
//! # use mediahub::stream::EncoderFactory;
//! # fn encoder_factory() -> Arc<dyn EncoderFactory> { unimplemented!() }
//! # fn camera() -> Arc<dyn mediahub::source::VideoSource> { unimplemented!() }
//!
//! # async fn example() {
//! let orchestrator = StreamOrchestrator::new(
//!     StreamConfig::new().video_encoder(encoder_factory()),
//! );
//!
//! // On every configuration change:
//! let mut resources = ResourceSet::new();
//! resources.insert_video("cam0", camera());
//! orchestrator.refresh(&resources).await;
//!
//! // On owner teardown:
//! orchestrator.shutdown().await;
//! # }
//! ```

pub mod error;
pub mod orchestrator;
pub mod packet;
pub mod passthrough;
pub mod source;
pub mod stream;

pub use error::{Error, Result};
pub use orchestrator::{StreamOrchestrator, StreamPublisher};
pub use packet::{Codec, MediaKind, Packet, PacketBatch};
pub use passthrough::{
    OverflowPolicy, PassthroughError, SubscriptionHandle, SubscriptionId, SubscriptionRegistry,
    TerminationReason,
};
pub use source::{ResourceSet, SourceDirectory, SourceError};
pub use stream::{
    BackoffPolicy, CatalogError, PacketSink, Stream, StreamCatalog, StreamConfig, StreamWorker,
    WorkerError, WorkerState,
};
