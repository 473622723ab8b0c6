//! The named, transport-facing broadcast unit

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::packet::{MediaKind, PacketBatch};

use super::config::{Encoder, StreamConfig};

/// Receives a stream's encoded output on behalf of one remote consumer
///
/// Implemented by the transport layer. `send` must not block: transports are
/// expected to buffer internally (or drop) and return immediately, since it
/// is called from the stream's production loop.
pub trait PacketSink: Send + Sync {
    /// Deliver one encoded batch
    fn send(&self, batch: PacketBatch);
}

/// A named broadcast unit wrapping one source and its encoder configuration
///
/// Created once per name by the [`StreamCatalog`](super::StreamCatalog) and
/// kept for the life of the owner; transient source loss pauses production
/// but never destroys the stream, so registered sinks survive hardware
/// blips without renegotiation.
pub struct Stream {
    name: String,
    kind: MediaKind,
    config: StreamConfig,
    sinks: RwLock<Vec<Arc<dyn PacketSink>>>,
}

impl Stream {
    pub(super) fn new(name: String, kind: MediaKind, config: StreamConfig) -> Self {
        Self {
            name,
            kind,
            config,
            sinks: RwLock::new(Vec::new()),
        }
    }

    /// Stream name, unique within its catalog
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Media kind this stream carries
    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    /// Encoder configuration this stream was created with
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Register a remote-consumer sink
    pub async fn add_sink(&self, sink: Arc<dyn PacketSink>) {
        let mut sinks = self.sinks.write().await;
        sinks.push(sink);
        tracing::debug!(stream = %self.name, sinks = sinks.len(), "Sink registered");
    }

    /// Number of registered sinks
    pub async fn sink_count(&self) -> usize {
        self.sinks.read().await.len()
    }

    /// Deliver one encoded batch to every registered sink
    pub async fn broadcast(&self, batch: &PacketBatch) {
        let sinks = self.sinks.read().await;
        for sink in sinks.iter() {
            sink.send(batch.clone());
        }
    }

    /// Build a fresh encoder from this stream's configuration
    ///
    /// The catalog only creates streams whose kind has a factory, so this
    /// cannot fail at production time.
    pub(super) fn new_encoder(&self) -> Option<Box<dyn Encoder>> {
        let factory = match self.kind {
            MediaKind::Video => self.config.video_encoder.as_ref(),
            MediaKind::Audio => self.config.audio_encoder.as_ref(),
        }?;
        Some(factory.new_encoder(self.config.codec_hint))
    }
}

impl std::fmt::Debug for Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stream")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use bytes::Bytes;

    use super::*;
    use crate::packet::Packet;

    struct CollectSink {
        batches: Mutex<Vec<PacketBatch>>,
    }

    impl CollectSink {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                batches: Mutex::new(Vec::new()),
            })
        }
    }

    impl PacketSink for CollectSink {
        fn send(&self, batch: PacketBatch) {
            self.batches.lock().unwrap().push(batch);
        }
    }

    #[tokio::test]
    async fn test_broadcast_reaches_all_sinks() {
        let stream = Stream::new("cam0".into(), MediaKind::Video, StreamConfig::default());

        let a = CollectSink::new();
        let b = CollectSink::new();
        stream.add_sink(a.clone()).await;
        stream.add_sink(b.clone()).await;
        assert_eq!(stream.sink_count().await, 2);

        let batch = vec![Packet::new(Bytes::from_static(b"pkt"), 0)];
        stream.broadcast(&batch).await;

        assert_eq!(a.batches.lock().unwrap().len(), 1);
        assert_eq!(b.batches.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_encoder_requires_matching_factory() {
        let stream = Stream::new("cam0".into(), MediaKind::Video, StreamConfig::default());
        assert!(stream.new_encoder().is_none());
    }
}
