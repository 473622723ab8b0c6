//! End-to-end demo with a synthetic camera
//!
//! Run with: cargo run --example fake_camera
//!
//! Builds an orchestrator around one fake video source, registers a logging
//! sink on the created stream, and attaches a passthrough subscription that
//! receives the same packets through its own bounded queue. Ctrl+C shuts
//! everything down.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use mediahub::source::{RawMedia, SourceError, VideoSource};
use mediahub::stream::{EncodeError, Encoder, EncoderFactory};
use mediahub::{
    Codec, Packet, PacketBatch, PacketSink, ResourceSet, StreamConfig, StreamOrchestrator,
    SubscriptionRegistry,
};

/// Produces a small synthetic frame 30 times a second
struct FakeCamera {
    frame_counter: AtomicU32,
}

#[async_trait]
impl VideoSource for FakeCamera {
    async fn next_frame(&self) -> Result<RawMedia, SourceError> {
        tokio::time::sleep(Duration::from_millis(33)).await;
        let n = self.frame_counter.fetch_add(1, Ordering::Relaxed);
        Ok(RawMedia::new(Bytes::from(vec![0u8; 128]), n * 33))
    }

    fn preferred_codec(&self) -> Option<Codec> {
        Some(Codec::H264)
    }
}

/// "Encoder" that wraps each raw frame in a single packet unchanged
struct IdentityEncoder;

impl Encoder for IdentityEncoder {
    fn encode(&mut self, media: &RawMedia) -> Result<PacketBatch, EncodeError> {
        Ok(vec![Packet::new(media.data.clone(), media.timestamp_ms)])
    }
}

struct IdentityFactory;

impl EncoderFactory for IdentityFactory {
    fn new_encoder(&self, _codec_hint: Option<Codec>) -> Box<dyn Encoder> {
        Box::new(IdentityEncoder)
    }
}

/// Sink that forwards stream output into a passthrough registry
///
/// `send` must not block, so batches go through an unbounded channel drained
/// by a pump task that calls the async `publish`.
struct RegistryBridge {
    tx: mpsc::UnboundedSender<PacketBatch>,
}

impl RegistryBridge {
    fn new(registry: Arc<SubscriptionRegistry>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<PacketBatch>();
        tokio::spawn(async move {
            while let Some(batch) = rx.recv().await {
                registry.publish(batch).await;
            }
        });
        Self { tx }
    }
}

impl PacketSink for RegistryBridge {
    fn send(&self, batch: PacketBatch) {
        let _ = self.tx.send(batch);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mediahub=debug".parse()?)
                .add_directive("fake_camera=info".parse()?),
        )
        .init();

    let orchestrator = StreamOrchestrator::new(
        StreamConfig::new().video_encoder(Arc::new(IdentityFactory)),
    );

    let mut resources = ResourceSet::new();
    resources.insert_video(
        "cam0",
        Arc::new(FakeCamera {
            frame_counter: AtomicU32::new(0),
        }),
    );
    orchestrator.refresh(&resources).await;

    let stream = orchestrator
        .catalog()
        .get("cam0")
        .await
        .expect("stream was not created");
    println!(
        "Stream '{}' up, codec hint: {:?}",
        stream.name(),
        stream.config().codec_hint
    );

    // Feed the stream's output into a passthrough registry
    let registry = Arc::new(SubscriptionRegistry::new());
    stream
        .add_sink(Arc::new(RegistryBridge::new(Arc::clone(&registry))))
        .await;

    // A consumer subscribes with a 64-batch buffer
    let handle = registry
        .subscribe(
            NonZeroUsize::new(64).expect("nonzero"),
            Box::new(|batch: PacketBatch| {
                if batch[0].timestamp_ms % 990 == 0 {
                    println!(
                        "subscriber: batch of {} packet(s) at t={}ms",
                        batch.len(),
                        batch[0].timestamp_ms
                    );
                }
            }),
        )
        .await?;
    println!("Subscribed with id {}", handle.id);

    tokio::signal::ctrl_c().await?;
    println!("\nShutting down...");

    registry.close_all().await;
    orchestrator.shutdown().await;

    let stats = registry.stats().await;
    println!(
        "Delivered {} batches, dropped {}",
        stats.published_batches, stats.dropped_batches
    );
    Ok(())
}
