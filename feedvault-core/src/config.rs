//! Immutable ingest configuration.
//!
//! The configuration is constructed once at the CLI boundary (from
//! arguments and environment), validated with [`IngestConfig::validate`],
//! and then passed by reference into every component. No component
//! re-reads the environment or re-validates mid-run.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Upstream page size ceiling. Requests above this are rejected by the
/// source clients rather than silently clamped.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Minimum poll interval. Anything shorter would burn the upstream
/// request budget on empty cycles.
pub const MIN_POLL_INTERVAL_SECS: u64 = 10;

/// Rate limiting policy, one per upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatePolicyConfig {
    /// Fixed delay between consecutive requests.
    FixedDelay {
        /// Delay in seconds.
        delay_secs: u64,
    },
    /// Fixed request budget per time window.
    Window {
        /// Requests allowed per window.
        max_requests: u32,
        /// Window length in seconds.
        window_secs: u64,
    },
}

impl Default for RatePolicyConfig {
    fn default() -> Self {
        // The listing API tolerates ~1 request / 2s for an identified client.
        Self::FixedDelay { delay_secs: 2 }
    }
}

/// Validated, immutable configuration for the ingestion drivers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Path to the SQLite archive.
    pub db_path: PathBuf,
    /// Source names to track (subreddits or hashtags), each with its
    /// own cursor.
    pub sources: Vec<String>,
    /// Sleep between polling cycles.
    pub poll_interval: Duration,
    /// Items requested per page, `1..=MAX_PAGE_SIZE`.
    pub page_size: u32,
    /// Upper bound on NEWEST pages fetched per source per cycle.
    pub max_pages_per_cycle: u32,
    /// Per-strategy item budget for backfill runs.
    pub backfill_budget: u32,
    /// Client-identifying string sent with every upstream request.
    pub user_agent: String,
    /// Rate limiting policy for the upstream.
    pub rate: RatePolicyConfig,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("feedvault.db"),
            sources: Vec::new(),
            poll_interval: Duration::from_secs(60),
            page_size: 25,
            max_pages_per_cycle: 1,
            backfill_budget: 1000,
            user_agent: concat!("feedvault/", env!("CARGO_PKG_VERSION")).to_string(),
            rate: RatePolicyConfig::default(),
        }
    }
}

impl IngestConfig {
    /// Validates the whole configuration, collecting every violation
    /// into a single error so the operator sees them all at once.
    pub fn validate(&self) -> Result<(), CoreError> {
        let mut errors = Vec::new();

        if self.sources.is_empty() {
            errors.push("at least one source must be configured".to_string());
        }
        for source in &self.sources {
            if !is_valid_source_name(source) {
                errors.push(format!("invalid source name: {source:?}"));
            }
        }
        if self.poll_interval < Duration::from_secs(MIN_POLL_INTERVAL_SECS) {
            errors.push(format!(
                "poll interval must be at least {MIN_POLL_INTERVAL_SECS}s"
            ));
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            errors.push(format!("page size must be in 1..={MAX_PAGE_SIZE}"));
        }
        if self.max_pages_per_cycle == 0 {
            errors.push("max pages per cycle must be at least 1".to_string());
        }
        if self.backfill_budget == 0 {
            errors.push("backfill budget must be at least 1".to_string());
        }
        if self.user_agent.trim().is_empty() {
            errors.push("user agent must not be empty".to_string());
        }
        match self.rate {
            RatePolicyConfig::FixedDelay { delay_secs } if delay_secs == 0 => {
                errors.push("rate delay must be at least 1s".to_string());
            }
            RatePolicyConfig::Window {
                max_requests,
                window_secs,
            } if max_requests == 0 || window_secs == 0 => {
                errors.push("rate window needs a nonzero budget and length".to_string());
            }
            _ => {}
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(CoreError::InvalidConfig(errors.join("; ")))
        }
    }
}

/// Source names map into URL paths and search queries, so they are kept
/// to the alphanumeric-plus-separators shape both upstreams accept.
fn is_valid_source_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
