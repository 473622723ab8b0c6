//! Per-stream production worker
//!
//! One worker drives one stream: pull from the source, encode, broadcast to
//! the stream's sinks. Hardware faults are usually transient (device busy,
//! momentary I/O error), so the worker retries production in place under a
//! jittered exponential backoff and only gives up when its consecutive
//! failure budget is spent. The stream object and its registered sinks are
//! never torn down by a production failure.
//!
//! # State machine
//!
//! ```text
//! Idle ──start()──▶ Starting ──▶ Running ──failure──▶ Backoff
//!                      ▲                                 │
//!                      └──────────── delay ──────────────┤
//!                                                        │ budget spent
//! (any state) ──stop()──▶ Stopped ◀──────────────────────┘
//! ```

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::source::{AudioSource, RawMedia, SourceError, VideoSource};

use super::backoff::BackoffState;
use super::stream::Stream;

/// Observable worker lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Constructed, never started
    Idle,
    /// Setting up production (encoder construction, first pull pending)
    Starting,
    /// Pulling, encoding, and broadcasting
    Running,
    /// Waiting out a retry delay after a production failure
    Backoff,
    /// Cancelled, or failure budget exhausted
    Stopped,
}

/// Error type for worker failures
#[derive(Debug, Clone, Error)]
pub enum WorkerError {
    /// A single production or encode step failed (retried internally)
    #[error("stream production failed: {0}")]
    Production(String),

    /// The consecutive-failure budget was spent; the worker is inert until
    /// explicitly restarted
    #[error("stream production gave up after {attempts} consecutive failures: {last}")]
    ExhaustedRetries {
        /// Failures recorded when the worker gave up
        attempts: u32,
        /// The failure that spent the budget
        last: String,
    },

    /// The stream's configuration has no encoder for its media kind
    #[error("no encoder available for this stream")]
    MissingEncoder,
}

/// The source side of a worker, erased over media kind
#[derive(Clone)]
enum WorkerSource {
    Video(Arc<dyn VideoSource>),
    Audio(Arc<dyn AudioSource>),
}

impl WorkerSource {
    async fn next(&self) -> Result<RawMedia, SourceError> {
        match self {
            WorkerSource::Video(source) => source.next_frame().await,
            WorkerSource::Audio(source) => source.next_chunk().await,
        }
    }
}

/// Drives production for one stream, restarting in place on failure
pub struct StreamWorker {
    stream: Arc<Stream>,
    source: WorkerSource,
    parent_cancel: CancellationToken,
    cancel: CancellationToken,
    state_tx: watch::Sender<WorkerState>,
    state_rx: watch::Receiver<WorkerState>,
    last_error: Arc<Mutex<Option<WorkerError>>>,
    task: Option<JoinHandle<()>>,
}

impl StreamWorker {
    /// Create a worker for a video stream
    ///
    /// `parent_cancel` is the owner's token: cancelling it stops this worker
    /// along with its siblings.
    pub fn new_video(
        stream: Arc<Stream>,
        source: Arc<dyn VideoSource>,
        parent_cancel: CancellationToken,
    ) -> Self {
        Self::new(stream, WorkerSource::Video(source), parent_cancel)
    }

    /// Create a worker for an audio stream
    pub fn new_audio(
        stream: Arc<Stream>,
        source: Arc<dyn AudioSource>,
        parent_cancel: CancellationToken,
    ) -> Self {
        Self::new(stream, WorkerSource::Audio(source), parent_cancel)
    }

    fn new(stream: Arc<Stream>, source: WorkerSource, parent_cancel: CancellationToken) -> Self {
        let (state_tx, state_rx) = watch::channel(WorkerState::Idle);
        Self {
            stream,
            source,
            cancel: parent_cancel.child_token(),
            parent_cancel,
            state_tx,
            state_rx,
            last_error: Arc::new(Mutex::new(None)),
            task: None,
        }
    }

    /// The stream this worker feeds
    pub fn stream(&self) -> &Arc<Stream> {
        &self.stream
    }

    /// Current lifecycle state
    pub fn state(&self) -> WorkerState {
        *self.state_rx.borrow()
    }

    /// Watch state transitions (for tests and supervision)
    pub fn watch_state(&self) -> watch::Receiver<WorkerState> {
        self.state_rx.clone()
    }

    /// Whether the worker is currently active (not idle or stopped)
    pub fn is_active(&self) -> bool {
        matches!(
            self.state(),
            WorkerState::Starting | WorkerState::Running | WorkerState::Backoff
        )
    }

    /// The terminal error, if the worker stopped by exhausting its budget
    pub async fn last_error(&self) -> Option<WorkerError> {
        self.last_error.lock().await.clone()
    }

    /// Begin (or resume) production
    ///
    /// No-op while the worker is already active or after the owner has shut
    /// down. Restarting a stopped worker reuses the same stream object, so
    /// registered sinks survive; the failure budget starts fresh.
    pub fn start(&mut self) {
        if self.is_active() {
            return;
        }
        if self.parent_cancel.is_cancelled() {
            tracing::debug!(stream = %self.stream.name(), "Not starting worker: owner shut down");
            return;
        }

        let cancel = self.parent_cancel.child_token();
        self.cancel = cancel.clone();
        let _ = self.state_tx.send(WorkerState::Starting);

        let ctx = RunContext {
            stream: Arc::clone(&self.stream),
            source: self.source.clone(),
            cancel,
            state_tx: self.state_tx.clone(),
            last_error: Arc::clone(&self.last_error),
        };
        self.task = Some(tokio::spawn(ctx.run()));
    }

    /// Cancel production and wait for the loop to exit
    ///
    /// Idempotent; never fails for a worker that already stopped.
    pub async fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(stream = %self.stream.name(), error = %e, "Worker task ended abnormally");
            }
        }
        let _ = self.state_tx.send(WorkerState::Stopped);
    }
}

struct RunContext {
    stream: Arc<Stream>,
    source: WorkerSource,
    cancel: CancellationToken,
    state_tx: watch::Sender<WorkerState>,
    last_error: Arc<Mutex<Option<WorkerError>>>,
}

impl RunContext {
    async fn run(self) {
        let policy = self.stream.config().backoff;
        let mut backoff = BackoffState::new();

        loop {
            let mut encoder = match self.stream.new_encoder() {
                Some(encoder) => encoder,
                None => {
                    // The catalog gates encoder availability at creation
                    // time, so this only happens with a hand-built stream.
                    self.fail(WorkerError::MissingEncoder).await;
                    return;
                }
            };

            let _ = self.state_tx.send(WorkerState::Running);
            tracing::debug!(stream = %self.stream.name(), "Stream production running");

            let failure = loop {
                let media = tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => {
                        let _ = self.state_tx.send(WorkerState::Stopped);
                        return;
                    }
                    media = self.source.next() => media,
                };

                match media {
                    Ok(media) => {
                        backoff.reset();
                        match encoder.encode(&media) {
                            Ok(batch) => {
                                if !batch.is_empty() {
                                    self.stream.broadcast(&batch).await;
                                }
                            }
                            Err(e) => break WorkerError::Production(e.to_string()),
                        }
                    }
                    Err(e) => break WorkerError::Production(e.to_string()),
                }
            };

            match backoff.next_delay(&policy) {
                Some(delay) => {
                    let _ = self.state_tx.send(WorkerState::Backoff);
                    tracing::warn!(
                        stream = %self.stream.name(),
                        error = %failure,
                        attempts = backoff.attempts(),
                        delay_ms = delay.as_millis() as u64,
                        "Stream production failed, backing off"
                    );
                    tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => {
                            let _ = self.state_tx.send(WorkerState::Stopped);
                            return;
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                    let _ = self.state_tx.send(WorkerState::Starting);
                }
                None => {
                    self.fail(WorkerError::ExhaustedRetries {
                        attempts: backoff.attempts(),
                        last: failure.to_string(),
                    })
                    .await;
                    return;
                }
            }
        }
    }

    async fn fail(&self, error: WorkerError) {
        tracing::error!(stream = %self.stream.name(), error = %error, "Stream worker stopped");
        *self.last_error.lock().await = Some(error);
        let _ = self.state_tx.send(WorkerState::Stopped);
    }
}
