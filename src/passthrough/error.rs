//! Passthrough error types

use thiserror::Error;

use super::subscription::SubscriptionId;

/// Error type for passthrough subscription operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PassthroughError {
    /// No active subscription holds the given ID
    #[error("subscription not found: {0}")]
    NotFound(SubscriptionId),

    /// Passthrough is not enabled for this source, or the source was closed
    #[error("packet passthrough not enabled")]
    NotEnabled,
}
