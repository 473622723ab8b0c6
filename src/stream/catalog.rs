//! Stream catalog: at most one stream per name

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::RwLock;

use crate::packet::MediaKind;

use super::config::StreamConfig;
use super::stream::Stream;

/// Error type for stream creation
#[derive(Debug, Error)]
pub enum CatalogError {
    /// No encoder is available for this media kind on the current platform
    ///
    /// Surfaced eagerly so the orchestrator logs and skips the source
    /// instead of retrying something that can never succeed.
    #[error("no {kind} encoder available on this platform")]
    UnsupportedPlatform {
        /// The media kind that cannot be encoded
        kind: MediaKind,
    },

    /// The configuration is structurally invalid
    #[error("invalid stream configuration: {0}")]
    InvalidConfig(String),
}

/// Maps stream name to stream, guaranteeing uniqueness per name
pub struct StreamCatalog {
    streams: RwLock<HashMap<String, Arc<Stream>>>,
}

impl StreamCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self {
            streams: RwLock::new(HashMap::new()),
        }
    }

    /// Create a stream, or return the existing one registered under `name`
    ///
    /// The boolean is `true` when the stream already existed; duplicate
    /// creation requests are deliberately not errors, so a repeated
    /// orchestrator refresh is a no-op.
    pub async fn create_or_get(
        &self,
        name: &str,
        kind: MediaKind,
        config: StreamConfig,
    ) -> Result<(Arc<Stream>, bool), CatalogError> {
        if name.is_empty() {
            return Err(CatalogError::InvalidConfig("empty stream name".into()));
        }

        // Fast path for the common already-registered case
        {
            let streams = self.streams.read().await;
            if let Some(stream) = streams.get(name) {
                return Ok((Arc::clone(stream), true));
            }
        }

        let has_encoder = match kind {
            MediaKind::Video => config.video_encoder.is_some(),
            MediaKind::Audio => config.audio_encoder.is_some(),
        };
        if !has_encoder {
            return Err(CatalogError::UnsupportedPlatform { kind });
        }

        let mut streams = self.streams.write().await;
        // A concurrent creator may have won the race between the read and
        // write locks.
        if let Some(stream) = streams.get(name) {
            return Ok((Arc::clone(stream), true));
        }

        let stream = Arc::new(Stream::new(name.to_owned(), kind, config));
        streams.insert(name.to_owned(), Arc::clone(&stream));

        tracing::info!(stream = %name, kind = %kind, "Stream created");
        Ok((stream, false))
    }

    /// Look up a stream by name
    pub async fn get(&self, name: &str) -> Option<Arc<Stream>> {
        self.streams.read().await.get(name).cloned()
    }

    /// Number of registered streams
    pub async fn len(&self) -> usize {
        self.streams.read().await.len()
    }

    /// Whether the catalog is empty
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for StreamCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{Codec, PacketBatch};
    use crate::source::RawMedia;
    use crate::stream::config::{EncodeError, Encoder, EncoderFactory};

    struct NoopFactory;
    struct NoopEncoder;

    impl Encoder for NoopEncoder {
        fn encode(&mut self, media: &RawMedia) -> Result<PacketBatch, EncodeError> {
            Ok(vec![crate::packet::Packet::new(
                media.data.clone(),
                media.timestamp_ms,
            )])
        }
    }

    impl EncoderFactory for NoopFactory {
        fn new_encoder(&self, _codec_hint: Option<Codec>) -> Box<dyn Encoder> {
            Box::new(NoopEncoder)
        }
    }

    fn video_config() -> StreamConfig {
        StreamConfig::new().video_encoder(Arc::new(NoopFactory))
    }

    #[tokio::test]
    async fn test_create_or_get_is_idempotent() {
        let catalog = StreamCatalog::new();

        let (first, existed) = catalog
            .create_or_get("cam0", MediaKind::Video, video_config())
            .await
            .unwrap();
        assert!(!existed);

        let (second, existed) = catalog
            .create_or_get("cam0", MediaKind::Video, video_config())
            .await
            .unwrap();
        assert!(existed);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(catalog.len().await, 1);
    }

    #[tokio::test]
    async fn test_missing_encoder_is_unsupported_platform() {
        let catalog = StreamCatalog::new();

        let err = catalog
            .create_or_get("cam0", MediaKind::Video, StreamConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CatalogError::UnsupportedPlatform {
                kind: MediaKind::Video
            }
        ));

        // Nothing was registered
        assert!(catalog.get("cam0").await.is_none());
    }

    #[tokio::test]
    async fn test_empty_name_is_invalid() {
        let catalog = StreamCatalog::new();
        let err = catalog
            .create_or_get("", MediaKind::Video, video_config())
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_distinct_names_get_distinct_streams() {
        let catalog = StreamCatalog::new();

        let (a, _) = catalog
            .create_or_get("cam0", MediaKind::Video, video_config())
            .await
            .unwrap();
        let (b, _) = catalog
            .create_or_get("cam1", MediaKind::Video, video_config())
            .await
            .unwrap();

        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(catalog.len().await, 2);
    }
}
