//! Fetch error taxonomy.
//!
//! The variants map one-to-one onto the retry policies the drivers
//! apply: rate limiting is waited out, transient failures are retried a
//! bounded number of times, malformed pages are dropped without retry.

use thiserror::Error;

/// Error type for fetch operations.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Upstream returned HTTP 429. Wait the advertised delay (or the
    /// governor's window remainder) and retry; never surfaced as a
    /// fetch failure.
    #[error("Rate limited, retry after {retry_after:?} seconds")]
    RateLimited {
        /// Seconds to wait before retrying, from `Retry-After`.
        retry_after: Option<u64>,
    },

    /// Network failure, timeout, or upstream 5xx. Retryable with
    /// backoff up to a bounded attempt count.
    #[error("Transient upstream failure: {0}")]
    Transient(String),

    /// Response failed schema validation. The page is dropped and
    /// counted as a fetch error; retrying cannot fix a schema mismatch.
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// The caller violated an input constraint (page size bounds,
    /// unsupported strategy). Not retried.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Shutdown was requested while waiting for a slot or a retry
    /// delay. Not an upstream failure; the driver stops cleanly.
    #[error("Interrupted by shutdown")]
    Interrupted,
}

impl FetchError {
    /// Returns true if a retry with backoff may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Transient(_))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        // Connection errors, timeouts, and body read failures are all
        // transient from the caller's point of view.
        Self::Transient(err.to_string())
    }
}
