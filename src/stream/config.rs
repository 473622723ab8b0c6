//! Stream configuration and the encoder seam
//!
//! Encoder internals live outside this crate; streams only need a factory
//! per media kind. A platform that cannot encode a given kind simply leaves
//! that factory unset, which the catalog turns into a fast
//! "unsupported on this platform" failure instead of a silent no-op.

use std::sync::Arc;

use thiserror::Error;

use crate::packet::{Codec, PacketBatch};
use crate::source::RawMedia;

use super::backoff::BackoffPolicy;

/// Error produced while encoding a media unit
#[derive(Debug, Error)]
#[error("encode failed: {0}")]
pub struct EncodeError(pub String);

/// Stateful encoder for one stream's production loop
pub trait Encoder: Send {
    /// Encode one raw media unit into a batch of packets
    fn encode(&mut self, media: &RawMedia) -> Result<PacketBatch, EncodeError>;
}

/// Creates a fresh encoder each time a worker (re)starts production
pub trait EncoderFactory: Send + Sync {
    /// Build an encoder, honoring the codec hint when one is given
    fn new_encoder(&self, codec_hint: Option<Codec>) -> Box<dyn Encoder>;
}

/// Configuration carried by every stream
#[derive(Clone, Default)]
pub struct StreamConfig {
    /// Factory for video encoders; `None` means video streaming is
    /// unsupported on this platform
    pub video_encoder: Option<Arc<dyn EncoderFactory>>,

    /// Factory for audio encoders; `None` means audio streaming is
    /// unsupported on this platform
    pub audio_encoder: Option<Arc<dyn EncoderFactory>>,

    /// Preferred codec, if the caller (or the source) has constrained it
    pub codec_hint: Option<Codec>,

    /// Retry schedule for the stream's worker
    pub backoff: BackoffPolicy,
}

impl StreamConfig {
    /// Create a config with no encoder factories set
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the video encoder factory
    pub fn video_encoder(mut self, factory: Arc<dyn EncoderFactory>) -> Self {
        self.video_encoder = Some(factory);
        self
    }

    /// Set the audio encoder factory
    pub fn audio_encoder(mut self, factory: Arc<dyn EncoderFactory>) -> Self {
        self.audio_encoder = Some(factory);
        self
    }

    /// Constrain the codec
    pub fn codec_hint(mut self, codec: Codec) -> Self {
        self.codec_hint = Some(codec);
        self
    }

    /// Set the worker backoff policy
    pub fn backoff(mut self, policy: BackoffPolicy) -> Self {
        self.backoff = policy;
        self
    }
}

impl std::fmt::Debug for StreamConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamConfig")
            .field("video_encoder", &self.video_encoder.is_some())
            .field("audio_encoder", &self.audio_encoder.is_some())
            .field("codec_hint", &self.codec_hint)
            .field("backoff", &self.backoff)
            .finish()
    }
}
