//! Bounded retry with backoff around page fetches.

use std::time::Duration;

use feedvault_core::Shutdown;
use tracing::warn;

use crate::error::FetchError;
use crate::governor::RateGovernor;
use crate::strategy::{FetchedPage, PageRequest, SourceClient};

/// Fallback wait when a 429 arrives without a `Retry-After` header.
const DEFAULT_RATE_LIMIT_WAIT_SECS: u64 = 30;

/// Policy for retrying transient fetch failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Base delay between retries in seconds.
    pub base_delay_secs: u64,
    /// Whether to use exponential backoff.
    pub exponential_backoff: bool,
    /// Maximum delay between retries.
    pub max_delay_secs: u64,
}

impl RetryPolicy {
    /// Creates a new retry policy.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay_secs: 1,
            exponential_backoff: true,
            max_delay_secs: 60,
        }
    }

    /// Disables retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            base_delay_secs: 0,
            exponential_backoff: false,
            max_delay_secs: 0,
        }
    }

    /// Sets the base delay.
    pub fn with_base_delay(mut self, secs: u64) -> Self {
        self.base_delay_secs = secs;
        self
    }

    /// Calculates the delay for a given attempt number.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = if self.exponential_backoff {
            self.base_delay_secs * 2u64.pow(attempt.saturating_sub(1))
        } else {
            self.base_delay_secs
        };

        Duration::from_secs(delay.min(self.max_delay_secs))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Fetches one page, consulting the rate governor before every attempt
/// and applying the taxonomy's retry policies:
///
/// - `RateLimited` waits out the advertised delay and retries without
///   consuming an attempt
/// - `Transient` retries with backoff up to `policy.max_attempts`
/// - `Malformed` / `InvalidRequest` return immediately
///
/// All waits are interruptible; a pending shutdown surfaces as
/// [`FetchError::Interrupted`], which callers treat as a clean stop
/// rather than a fetch failure.
pub async fn fetch_with_retry<C>(
    client: &C,
    req: &PageRequest,
    policy: &RetryPolicy,
    governor: &RateGovernor,
    shutdown: &Shutdown,
) -> Result<FetchedPage, FetchError>
where
    C: SourceClient + ?Sized,
{
    let mut attempt: u32 = 1;
    loop {
        if !governor.acquire(client.upstream_id(), shutdown).await {
            return Err(FetchError::Interrupted);
        }

        match client.fetch_page(req).await {
            Ok(page) => return Ok(page),
            Err(FetchError::RateLimited { retry_after }) => {
                let wait = Duration::from_secs(retry_after.unwrap_or(DEFAULT_RATE_LIMIT_WAIT_SECS));
                warn!(
                    source = %req.source,
                    strategy = %req.strategy,
                    wait_secs = wait.as_secs(),
                    "Rate limited, waiting"
                );
                if !shutdown.sleep(wait).await {
                    return Err(FetchError::Interrupted);
                }
            }
            Err(err @ FetchError::Transient(_)) => {
                if attempt >= policy.max_attempts {
                    return Err(err);
                }
                let delay = policy.delay_for_attempt(attempt);
                warn!(
                    source = %req.source,
                    strategy = %req.strategy,
                    attempt,
                    delay_secs = delay.as_secs(),
                    error = %err,
                    "Transient fetch failure, retrying"
                );
                attempt += 1;
                if !shutdown.sleep(delay).await {
                    return Err(FetchError::Interrupted);
                }
            }
            Err(err) => return Err(err),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
