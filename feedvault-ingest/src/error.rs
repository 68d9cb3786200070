//! Driver error types.

use feedvault_fetch::FetchError;
use feedvault_store::StoreError;
use thiserror::Error;

/// Errors that can occur while driving ingestion.
#[derive(Debug, Error)]
pub enum IngestError {
    /// A startup probe failed; the driver never entered its loop.
    #[error("Startup check failed: {0}")]
    Startup(String),

    /// A fetch failed after retries.
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// A store operation failed.
    #[error("Store failed: {0}")]
    Store(#[from] StoreError),
}
