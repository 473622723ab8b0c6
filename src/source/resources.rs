//! Typed resource-set snapshot
//!
//! The surrounding middleware hands the orchestrator a read-only snapshot of
//! its named resources on every configuration change. Resources are tagged
//! with the media capability they expose; anything else is opaque to this
//! crate and filtered out during directory recomputation.

use std::collections::HashMap;
use std::sync::Arc;

use super::{AudioSource, VideoSource};

/// A named resource as seen by the media core
#[derive(Clone)]
pub enum MediaResource {
    /// Exposes the video-source capability
    Video(Arc<dyn VideoSource>),
    /// Exposes the audio-source capability
    Audio(Arc<dyn AudioSource>),
    /// Present in the robot config but not a media source (arm, gripper, ...)
    Opaque,
}

impl std::fmt::Debug for MediaResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaResource::Video(_) => f.write_str("MediaResource::Video"),
            MediaResource::Audio(_) => f.write_str("MediaResource::Audio"),
            MediaResource::Opaque => f.write_str("MediaResource::Opaque"),
        }
    }
}

/// Read-only snapshot of the currently configured resources
#[derive(Debug, Clone, Default)]
pub struct ResourceSet {
    entries: HashMap<String, MediaResource>,
}

impl ResourceSet {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a video source under `name`, replacing any previous entry
    pub fn insert_video(&mut self, name: impl Into<String>, source: Arc<dyn VideoSource>) {
        self.entries.insert(name.into(), MediaResource::Video(source));
    }

    /// Add an audio source under `name`, replacing any previous entry
    pub fn insert_audio(&mut self, name: impl Into<String>, source: Arc<dyn AudioSource>) {
        self.entries.insert(name.into(), MediaResource::Audio(source));
    }

    /// Add a non-media resource under `name`
    pub fn insert_opaque(&mut self, name: impl Into<String>) {
        self.entries.insert(name.into(), MediaResource::Opaque);
    }

    /// Remove the resource registered under `name`
    pub fn remove(&mut self, name: &str) -> Option<MediaResource> {
        self.entries.remove(name)
    }

    /// Iterate over all named resources
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MediaResource)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of resources in the snapshot
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the snapshot is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
