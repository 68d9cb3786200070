//! HTTP client wrapper with tracing and rate-limit helpers.

use std::time::Duration;

use reqwest::{header, Client, Response};
use tracing::{debug, instrument};

use crate::error::FetchError;

/// Default request timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// HTTP Client
// ============================================================================

/// Thin reqwest wrapper carrying the client-identifying user agent the
/// upstreams require for rate-limit compliance.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
}

impl HttpClient {
    /// Creates a new HTTP client with the default timeout.
    pub fn new(user_agent: &str) -> Self {
        Self::with_timeout(user_agent, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a new HTTP client with a custom timeout.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built. This should only occur
    /// if the system's TLS/SSL configuration is fundamentally broken,
    /// making network operations impossible. This is considered
    /// unrecoverable at runtime.
    pub fn with_timeout(user_agent: &str, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .unwrap_or_else(|e| {
                panic!(
                    "Failed to create HTTP client: {e}. \
                    This usually indicates a broken TLS/SSL configuration."
                )
            });

        Self { inner: client }
    }

    /// Performs a GET request with query parameters and an optional
    /// bearer token.
    #[instrument(skip(self, query, bearer), fields(url = %url))]
    pub async fn get(
        &self,
        url: &str,
        query: &[(&str, String)],
        bearer: Option<&str>,
    ) -> Result<Response, FetchError> {
        debug!("GET request");

        let mut request = self.inner.get(url).query(query);
        if let Some(token) = bearer {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let response = request.send().await?;
        debug!(status = %response.status(), "Response received");
        Ok(response)
    }
}

// ============================================================================
// Response Extensions
// ============================================================================

/// Extension trait for rate-limit handling on responses.
pub trait ResponseExt {
    /// Check if the response indicates rate limiting.
    fn is_rate_limited(&self) -> bool;

    /// Get the Retry-After header value in seconds.
    fn retry_after_secs(&self) -> Option<u64>;
}

impl ResponseExt for Response {
    fn is_rate_limited(&self) -> bool {
        self.status() == reqwest::StatusCode::TOO_MANY_REQUESTS
    }

    fn retry_after_secs(&self) -> Option<u64> {
        self.headers()
            .get(header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
    }
}
