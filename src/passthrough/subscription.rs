//! Subscription identity and termination signalling

use tokio::sync::oneshot;
use uuid::Uuid;

use crate::packet::PacketBatch;

/// Callback invoked with each delivered packet batch
///
/// Runs on the subscription's delivery task. A long-running callback delays
/// only its own subscription; siblings and the producer are unaffected.
pub type PacketCallback = Box<dyn FnMut(PacketBatch) + Send + 'static>;

/// Globally unique subscription identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    /// Generate a fresh identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Why a subscription was terminated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// The subscriber called unsubscribe
    Unsubscribed,
    /// The owning source was closed (registry shutdown)
    SourceClosed,
}

/// Caller-held observer for a subscription's termination
///
/// Fires exactly once. The caller can only observe termination through this
/// signal; it holds no rights to mutate the subscription itself.
#[derive(Debug)]
pub struct TerminationSignal {
    rx: oneshot::Receiver<TerminationReason>,
}

impl TerminationSignal {
    pub(super) fn channel() -> (oneshot::Sender<TerminationReason>, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self { rx })
    }

    /// Wait for the subscription to terminate
    ///
    /// If the registry is dropped without terminating cleanly, this reports
    /// [`TerminationReason::SourceClosed`].
    pub async fn wait(self) -> TerminationReason {
        self.rx.await.unwrap_or(TerminationReason::SourceClosed)
    }

    /// Check for termination without waiting
    ///
    /// Returns `None` while the subscription is still active.
    pub fn try_wait(&mut self) -> Option<TerminationReason> {
        match self.rx.try_recv() {
            Ok(reason) => Some(reason),
            Err(oneshot::error::TryRecvError::Closed) => Some(TerminationReason::SourceClosed),
            Err(oneshot::error::TryRecvError::Empty) => None,
        }
    }
}

/// What a successful subscribe call hands back to the caller
#[derive(Debug)]
pub struct SubscriptionHandle {
    /// Identifier to pass to unsubscribe
    pub id: SubscriptionId,
    /// Fires exactly once when the subscription ends
    pub terminated: TerminationSignal,
}
