//! Media sources, resource snapshots, and the source directory
//!
//! Sources are hardware-backed producers (cameras, microphones) owned by the
//! surrounding middleware. This crate only ever holds `Arc` references to
//! them; a source may disappear from one [`ResourceSet`](resources::ResourceSet)
//! snapshot and reappear in a later one.

pub mod directory;
pub mod resources;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::packet::Codec;

/// A raw media unit pulled from a source: one video frame or one chunk of
/// audio samples, not yet encoded
#[derive(Debug, Clone)]
pub struct RawMedia {
    /// Uncompressed payload
    pub data: Bytes,
    /// Capture timestamp in milliseconds
    pub timestamp_ms: u32,
}

impl RawMedia {
    /// Create a raw media unit
    pub fn new(data: Bytes, timestamp_ms: u32) -> Self {
        Self { data, timestamp_ms }
    }
}

/// Error produced while pulling from a source
#[derive(Debug, Error)]
pub enum SourceError {
    /// The device is temporarily unavailable (busy, mid-reconnect)
    #[error("source unavailable: {0}")]
    Unavailable(String),

    /// I/O error from the underlying device
    #[error("source i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The source has been shut down and will not produce again
    #[error("source closed")]
    Closed,
}

/// A named producer of video frames
#[async_trait]
pub trait VideoSource: Send + Sync {
    /// Pull the next frame, waiting until one is available
    async fn next_frame(&self) -> Result<RawMedia, SourceError>;

    /// Codec this source would prefer downstream encoders to use
    ///
    /// Cameras that emit pre-encoded H.264, for example, advertise it here so
    /// the orchestrator avoids forcing a re-encode.
    fn preferred_codec(&self) -> Option<Codec> {
        None
    }
}

/// A named producer of audio sample chunks
#[async_trait]
pub trait AudioSource: Send + Sync {
    /// Pull the next chunk of samples, waiting until one is available
    async fn next_chunk(&self) -> Result<RawMedia, SourceError>;
}

pub use directory::SourceDirectory;
pub use resources::{MediaResource, ResourceSet};
