//! Per-upstream request rate governance.
//!
//! The governor is the only intentional throttling point in the system:
//! every outbound request goes through [`RateGovernor::acquire`] before
//! it is issued. It never fails; it trades latency for compliance,
//! blocking the (single-threaded) calling loop until a slot is free.
//! One governor instance is shared across any drivers that target the
//! same upstream credentials.

use std::collections::HashMap;
use std::time::Duration;

use feedvault_core::{RatePolicyConfig, Shutdown};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::trace;

// ============================================================================
// Policy
// ============================================================================

/// How requests to one upstream are paced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatePolicy {
    /// Fixed delay between consecutive requests.
    FixedDelay(Duration),
    /// Fixed request budget per time window.
    Window {
        /// Requests allowed per window.
        max_requests: u32,
        /// Window length.
        window: Duration,
    },
}

impl From<RatePolicyConfig> for RatePolicy {
    fn from(config: RatePolicyConfig) -> Self {
        match config {
            RatePolicyConfig::FixedDelay { delay_secs } => {
                Self::FixedDelay(Duration::from_secs(delay_secs))
            }
            RatePolicyConfig::Window {
                max_requests,
                window_secs,
            } => Self::Window {
                max_requests,
                window: Duration::from_secs(window_secs),
            },
        }
    }
}

// ============================================================================
// Governor
// ============================================================================

#[derive(Debug)]
struct UpstreamBudget {
    /// Requests left in the current window (windowed policy).
    remaining: u32,
    /// When the current window started (windowed policy).
    window_started: Instant,
    /// When the last request was issued (fixed-delay policy).
    last_request: Option<Instant>,
}

impl UpstreamBudget {
    fn new(policy: RatePolicy) -> Self {
        let remaining = match policy {
            RatePolicy::Window { max_requests, .. } => max_requests,
            RatePolicy::FixedDelay(_) => 1,
        };
        Self {
            remaining,
            window_started: Instant::now(),
            last_request: None,
        }
    }
}

/// Tracks request budgets per upstream and blocks callers to stay
/// under the configured limit.
#[derive(Debug)]
pub struct RateGovernor {
    policy: RatePolicy,
    budgets: Mutex<HashMap<String, UpstreamBudget>>,
}

impl RateGovernor {
    /// Creates a governor for the given policy.
    pub fn new(policy: RatePolicy) -> Self {
        Self {
            policy,
            budgets: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a governor from validated configuration.
    pub fn from_config(config: RatePolicyConfig) -> Self {
        Self::new(config.into())
    }

    /// Waits until a request slot is available for `upstream`, then
    /// consumes one unit of its budget.
    ///
    /// Returns `false` only if shutdown was requested while waiting;
    /// a slot is otherwise always granted within one window period.
    pub async fn acquire(&self, upstream: &str, shutdown: &Shutdown) -> bool {
        loop {
            if shutdown.is_triggered() {
                return false;
            }
            let wait = {
                let mut budgets = self.budgets.lock().await;
                let budget = budgets
                    .entry(upstream.to_string())
                    .or_insert_with(|| UpstreamBudget::new(self.policy));
                self.try_consume(budget)
            };
            match wait {
                None => return true,
                Some(delay) => {
                    trace!(upstream, ?delay, "Rate slot busy, waiting");
                    if !shutdown.sleep(delay).await {
                        return false;
                    }
                }
            }
        }
    }

    /// Remaining request budget for `upstream` (1/0 for fixed delay).
    pub async fn remaining(&self, upstream: &str) -> u32 {
        let mut budgets = self.budgets.lock().await;
        let budget = budgets
            .entry(upstream.to_string())
            .or_insert_with(|| UpstreamBudget::new(self.policy));
        match self.policy {
            RatePolicy::FixedDelay(delay) => match budget.last_request {
                Some(last) if last.elapsed() < delay => 0,
                _ => 1,
            },
            RatePolicy::Window { max_requests, window } => {
                if budget.window_started.elapsed() >= window {
                    budget.remaining = max_requests;
                    budget.window_started = Instant::now();
                }
                budget.remaining
            }
        }
    }

    /// Tries to consume one unit. Returns the wait until a slot frees
    /// up, or `None` if the unit was consumed.
    fn try_consume(&self, budget: &mut UpstreamBudget) -> Option<Duration> {
        let now = Instant::now();
        match self.policy {
            RatePolicy::FixedDelay(delay) => match budget.last_request {
                Some(last) if now.duration_since(last) < delay => {
                    Some(delay - now.duration_since(last))
                }
                _ => {
                    budget.last_request = Some(now);
                    None
                }
            },
            RatePolicy::Window { max_requests, window } => {
                if now.duration_since(budget.window_started) >= window {
                    budget.remaining = max_requests;
                    budget.window_started = now;
                }
                if budget.remaining > 0 {
                    budget.remaining -= 1;
                    None
                } else {
                    Some(window - now.duration_since(budget.window_started))
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_fixed_delay_spaces_requests() {
        let governor = RateGovernor::new(RatePolicy::FixedDelay(Duration::from_secs(2)));
        let shutdown = Shutdown::new();

        let start = Instant::now();
        assert!(governor.acquire("reddit", &shutdown).await);
        assert!(governor.acquire("reddit", &shutdown).await);
        // Second slot only frees after the fixed delay elapses.
        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_budget_exhaustion_blocks_until_reset() {
        let governor = RateGovernor::new(RatePolicy::Window {
            max_requests: 2,
            window: Duration::from_secs(60),
        });
        let shutdown = Shutdown::new();

        let start = Instant::now();
        assert!(governor.acquire("mb", &shutdown).await);
        assert!(governor.acquire("mb", &shutdown).await);
        assert!(start.elapsed() < Duration::from_secs(1));

        // Third request waits for the window to reset.
        assert!(governor.acquire("mb", &shutdown).await);
        assert!(start.elapsed() >= Duration::from_secs(60));
        assert_eq!(governor.remaining("mb").await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_budgets_are_per_upstream() {
        let governor = RateGovernor::new(RatePolicy::Window {
            max_requests: 1,
            window: Duration::from_secs(60),
        });
        let shutdown = Shutdown::new();

        assert!(governor.acquire("reddit", &shutdown).await);
        // A different upstream has its own untouched budget.
        assert_eq!(governor.remaining("microblog").await, 1);
        assert_eq!(governor.remaining("reddit").await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_interrupts_wait() {
        let governor = RateGovernor::new(RatePolicy::FixedDelay(Duration::from_secs(3600)));
        let shutdown = Shutdown::new();

        assert!(governor.acquire("reddit", &shutdown).await);
        shutdown.trigger();
        assert!(!governor.acquire("reddit", &shutdown).await);
    }
}
