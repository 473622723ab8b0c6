//! Packet and media types shared across the crate
//!
//! Everything that flows between sources, workers, and subscribers is built
//! from these types. Payloads are `bytes::Bytes`, so handing a batch to many
//! subscribers only bumps a reference count rather than copying media data.

use bytes::Bytes;

/// Kind of media a source or stream carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    /// Video frames
    Video,
    /// Audio samples
    Audio,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Video => write!(f, "video"),
            MediaKind::Audio => write!(f, "audio"),
        }
    }
}

/// Codec identifier used for capability hints
///
/// Sources may advertise a preferred codec; the orchestrator passes the hint
/// through to encoder configuration without forcing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    /// H.264 / AVC video
    H264,
    /// VP8 video
    Vp8,
    /// Opus audio
    Opus,
    /// Raw PCM audio
    Pcm,
}

impl std::fmt::Display for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Codec::H264 => write!(f, "h264"),
            Codec::Vp8 => write!(f, "vp8"),
            Codec::Opus => write!(f, "opus"),
            Codec::Pcm => write!(f, "pcm"),
        }
    }
}

/// A single encoded media packet
///
/// Cheap to clone: the payload is reference counted.
#[derive(Debug, Clone)]
pub struct Packet {
    /// Encoded payload
    pub data: Bytes,
    /// Timestamp in milliseconds, relative to stream start
    pub timestamp_ms: u32,
}

impl Packet {
    /// Create a packet from a payload and timestamp
    pub fn new(data: Bytes, timestamp_ms: u32) -> Self {
        Self { data, timestamp_ms }
    }
}

/// A batch of packets delivered as one unit
///
/// Producers hand batches to the passthrough registry and to stream sinks;
/// subscribers receive whole batches in arrival order.
pub type PacketBatch = Vec<Packet>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_clone_shares_payload() {
        let data = Bytes::from(vec![1u8, 2, 3, 4]);
        let packet = Packet::new(data.clone(), 42);
        let cloned = packet.clone();

        assert_eq!(cloned.timestamp_ms, 42);
        // Same underlying allocation, not a copy
        assert_eq!(data.as_ptr(), cloned.data.as_ptr());
    }

    #[test]
    fn test_media_kind_display() {
        assert_eq!(MediaKind::Video.to_string(), "video");
        assert_eq!(MediaKind::Audio.to_string(), "audio");
    }
}
