//! Stream orchestration
//!
//! The [`StreamOrchestrator`] reacts to configuration changes: it recomputes
//! the source directory, creates any streams that are missing from the
//! catalog, announces new streams to the transport layer, and starts (or
//! restarts) their workers. Sources that vanish are not torn down eagerly;
//! their workers fail on their own and either recover when the source
//! reappears or go quiet, which keeps remote-consumer registrations stable
//! across transient hardware loss.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use crate::packet::MediaKind;
use crate::source::{ResourceSet, SourceDirectory};
use crate::stream::{Stream, StreamCatalog, StreamConfig, StreamWorker};

/// Announces newly created streams to an external transport service
///
/// This crate only guarantees that every stream is announced exactly once,
/// by name; how peers then negotiate delivery is the transport's business.
pub trait StreamPublisher: Send + Sync {
    /// Called once when a stream is first created
    fn announce(&self, stream: &Arc<Stream>);
}

/// Top-level coordinator for source discovery and stream lifecycles
pub struct StreamOrchestrator {
    catalog: Arc<StreamCatalog>,
    directory: RwLock<SourceDirectory>,
    workers: Mutex<HashMap<String, StreamWorker>>,
    config: StreamConfig,
    publisher: Option<Arc<dyn StreamPublisher>>,
    cancel: CancellationToken,
}

impl StreamOrchestrator {
    /// Create an orchestrator with the given base stream configuration
    ///
    /// The configuration's encoder factories decide which media kinds this
    /// platform can stream at all.
    pub fn new(config: StreamConfig) -> Self {
        Self {
            catalog: Arc::new(StreamCatalog::new()),
            directory: RwLock::new(SourceDirectory::default()),
            workers: Mutex::new(HashMap::new()),
            config,
            publisher: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Attach a transport publisher for stream announcements
    pub fn with_publisher(mut self, publisher: Arc<dyn StreamPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// The stream catalog
    pub fn catalog(&self) -> &Arc<StreamCatalog> {
        &self.catalog
    }

    /// Snapshot of the current source directory
    pub async fn directory(&self) -> SourceDirectory {
        self.directory.read().await.clone()
    }

    /// Lifecycle state of the named stream's worker
    pub async fn worker_state(&self, name: &str) -> Option<crate::stream::WorkerState> {
        self.workers.lock().await.get(name).map(|w| w.state())
    }

    /// Number of workers the orchestrator currently owns
    pub async fn worker_count(&self) -> usize {
        self.workers.lock().await.len()
    }

    /// Re-derive sources from a fresh resource snapshot and reconcile streams
    ///
    /// For every source without a stream: create the stream, announce it, and
    /// start a worker. Sources already covered by a stream are left alone (no
    /// duplicate workers). A stopped worker whose source is still present is
    /// restarted. One source's failure is logged and skipped without
    /// aborting the walk.
    pub async fn refresh(&self, resources: &ResourceSet) {
        if self.cancel.is_cancelled() {
            tracing::warn!("Ignoring refresh after shutdown");
            return;
        }

        let directory = SourceDirectory::from_resources(resources);
        *self.directory.write().await = directory.clone();

        tracing::info!(
            video_sources = directory.video_sources().count(),
            audio_sources = directory.audio_sources().count(),
            "Refreshing streams"
        );

        let mut workers = self.workers.lock().await;

        for (name, source) in directory.video_sources() {
            let mut config = self.config.clone();
            // Prefer the source's advertised codec, but never override an
            // explicit constraint from the caller.
            if config.codec_hint.is_none() {
                config.codec_hint = source.preferred_codec();
            }

            match self.catalog.create_or_get(name, MediaKind::Video, config).await {
                Ok((stream, already_existed)) => {
                    if !already_existed {
                        self.announce(&stream);
                        let mut worker = StreamWorker::new_video(
                            stream,
                            Arc::clone(source),
                            self.cancel.clone(),
                        );
                        worker.start();
                        workers.insert(name.to_owned(), worker);
                    } else {
                        Self::restart_if_stopped(&mut workers, name);
                    }
                }
                Err(e) => {
                    tracing::warn!(stream = %name, error = %e, "Skipping video source");
                }
            }
        }

        for (name, source) in directory.audio_sources() {
            match self
                .catalog
                .create_or_get(name, MediaKind::Audio, self.config.clone())
                .await
            {
                Ok((stream, already_existed)) => {
                    if !already_existed {
                        self.announce(&stream);
                        let mut worker = StreamWorker::new_audio(
                            stream,
                            Arc::clone(source),
                            self.cancel.clone(),
                        );
                        worker.start();
                        workers.insert(name.to_owned(), worker);
                    } else {
                        Self::restart_if_stopped(&mut workers, name);
                    }
                }
                Err(e) => {
                    tracing::warn!(stream = %name, error = %e, "Skipping audio source");
                }
            }
        }
    }

    /// Stop every worker and refuse further refreshes
    ///
    /// Cancels the orchestrator's root token (cascading to all workers) and
    /// waits for each production loop to exit. Idempotent; already-stopped
    /// workers are not an error.
    pub async fn shutdown(&self) {
        self.cancel.cancel();

        let mut workers = self.workers.lock().await;
        for (name, worker) in workers.iter_mut() {
            worker.stop().await;
            tracing::debug!(stream = %name, "Worker stopped");
        }

        tracing::info!(workers = workers.len(), "Stream orchestrator shut down");
    }

    fn announce(&self, stream: &Arc<Stream>) {
        if let Some(publisher) = &self.publisher {
            publisher.announce(stream);
            tracing::debug!(stream = %stream.name(), "Stream announced to transport");
        }
    }

    fn restart_if_stopped(workers: &mut HashMap<String, StreamWorker>, name: &str) {
        if let Some(worker) = workers.get_mut(name) {
            if !worker.is_active() {
                tracing::info!(stream = %name, "Restarting stopped worker, source present again");
                worker.start();
            }
        }
    }
}
