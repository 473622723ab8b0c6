//! Crate-level error type
//!
//! Each area defines its own error enum; this module wraps them into one
//! `Error` for callers that don't care which layer failed.

use thiserror::Error;

use crate::passthrough::PassthroughError;
use crate::source::SourceError;
use crate::stream::{CatalogError, WorkerError};

/// Crate-wide error type
#[derive(Debug, Error)]
pub enum Error {
    /// Passthrough subscription error
    #[error(transparent)]
    Passthrough(#[from] PassthroughError),

    /// Stream catalog error
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Stream worker error
    #[error(transparent)]
    Worker(#[from] WorkerError),

    /// Source production error
    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Crate-wide result type
pub type Result<T> = std::result::Result<T, Error>;
