//! Source directory: capability-filtered view of a resource set
//!
//! Rebuilt from scratch on every refresh rather than patched incrementally,
//! so a removed resource can never linger as a stale entry.

use std::collections::HashMap;
use std::sync::Arc;

use super::resources::{MediaResource, ResourceSet};
use super::{AudioSource, VideoSource};

/// Name-indexed maps of the media sources present in a resource set
///
/// Cloning is cheap: the maps hold `Arc` handles.
#[derive(Clone, Default)]
pub struct SourceDirectory {
    video: HashMap<String, Arc<dyn VideoSource>>,
    audio: HashMap<String, Arc<dyn AudioSource>>,
}

impl SourceDirectory {
    /// Compute a directory from a resource snapshot
    ///
    /// Pure function of the snapshot: walks every resource, keeps those with
    /// a video or audio capability, ignores the rest.
    pub fn from_resources(resources: &ResourceSet) -> Self {
        let mut video = HashMap::new();
        let mut audio = HashMap::new();

        for (name, resource) in resources.iter() {
            match resource {
                MediaResource::Video(source) => {
                    video.insert(name.to_owned(), Arc::clone(source));
                }
                MediaResource::Audio(source) => {
                    audio.insert(name.to_owned(), Arc::clone(source));
                }
                MediaResource::Opaque => {}
            }
        }

        tracing::debug!(
            video_sources = video.len(),
            audio_sources = audio.len(),
            "Source directory recomputed"
        );

        Self { video, audio }
    }

    /// Look up a video source by name
    pub fn video_source(&self, name: &str) -> Option<&Arc<dyn VideoSource>> {
        self.video.get(name)
    }

    /// Look up an audio source by name
    pub fn audio_source(&self, name: &str) -> Option<&Arc<dyn AudioSource>> {
        self.audio.get(name)
    }

    /// Iterate over all video sources
    pub fn video_sources(&self) -> impl Iterator<Item = (&str, &Arc<dyn VideoSource>)> {
        self.video.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterate over all audio sources
    pub fn audio_sources(&self) -> impl Iterator<Item = (&str, &Arc<dyn AudioSource>)> {
        self.audio.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Total number of media sources
    pub fn len(&self) -> usize {
        self.video.len() + self.audio.len()
    }

    /// Whether the directory holds no media sources
    pub fn is_empty(&self) -> bool {
        self.video.is_empty() && self.audio.is_empty()
    }
}

impl std::fmt::Debug for SourceDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceDirectory")
            .field("video", &self.video.keys().collect::<Vec<_>>())
            .field("audio", &self.audio.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use bytes::Bytes;

    use super::*;
    use crate::source::{RawMedia, SourceError};

    struct StubVideo;
    struct StubAudio;

    #[async_trait]
    impl VideoSource for StubVideo {
        async fn next_frame(&self) -> Result<RawMedia, SourceError> {
            Ok(RawMedia::new(Bytes::from_static(b"frame"), 0))
        }
    }

    #[async_trait]
    impl AudioSource for StubAudio {
        async fn next_chunk(&self) -> Result<RawMedia, SourceError> {
            Ok(RawMedia::new(Bytes::from_static(b"chunk"), 0))
        }
    }

    #[test]
    fn test_filters_by_capability() {
        let mut resources = ResourceSet::new();
        resources.insert_video("cam0", Arc::new(StubVideo));
        resources.insert_audio("mic0", Arc::new(StubAudio));
        resources.insert_opaque("arm0");

        let dir = SourceDirectory::from_resources(&resources);

        assert_eq!(dir.len(), 2);
        assert!(dir.video_source("cam0").is_some());
        assert!(dir.audio_source("mic0").is_some());
        assert!(dir.video_source("arm0").is_none());
        assert!(dir.audio_source("arm0").is_none());
    }

    #[test]
    fn test_recompute_drops_removed_sources() {
        let mut resources = ResourceSet::new();
        resources.insert_video("cam0", Arc::new(StubVideo));
        resources.insert_video("cam1", Arc::new(StubVideo));

        let dir = SourceDirectory::from_resources(&resources);
        assert_eq!(dir.len(), 2);

        resources.remove("cam1");
        let dir = SourceDirectory::from_resources(&resources);

        assert!(dir.video_source("cam0").is_some());
        assert!(dir.video_source("cam1").is_none(), "stale entry survived");
    }

    #[test]
    fn test_empty_set_yields_empty_directory() {
        let dir = SourceDirectory::from_resources(&ResourceSet::new());
        assert!(dir.is_empty());
    }
}
