//! Per-driver run statistics.
//!
//! Each driver instance (poller or backfill run) owns one [`RunStats`]
//! value. Counters use atomic increments so the value can be shared
//! behind an `Arc` with the retry helpers that record fetch errors.
//! Statistics never drive control flow; they only feed log lines.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use serde::Serialize;

/// Accumulated counters for one driver run.
#[derive(Debug)]
pub struct RunStats {
    fetched: AtomicU64,
    stored: AtomicU64,
    duplicates: AtomicU64,
    fetch_errors: AtomicU64,
    store_errors: AtomicU64,
    started: Instant,
}

impl Default for RunStats {
    fn default() -> Self {
        Self::new()
    }
}

impl RunStats {
    /// Creates a fresh set of counters, stamping the start time.
    pub fn new() -> Self {
        Self {
            fetched: AtomicU64::new(0),
            stored: AtomicU64::new(0),
            duplicates: AtomicU64::new(0),
            fetch_errors: AtomicU64::new(0),
            store_errors: AtomicU64::new(0),
            started: Instant::now(),
        }
    }

    /// Records items returned by a fetch.
    pub fn record_fetched(&self, count: u64) {
        self.fetched.fetch_add(count, Ordering::Relaxed);
    }

    /// Records the outcome of a store batch.
    pub fn record_store_outcome(&self, stored: u64, duplicates: u64) {
        self.stored.fetch_add(stored, Ordering::Relaxed);
        self.duplicates.fetch_add(duplicates, Ordering::Relaxed);
    }

    /// Records a fetch that failed after retries (or was malformed).
    pub fn record_fetch_error(&self) {
        self.fetch_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a store batch that failed.
    pub fn record_store_error(&self) {
        self.store_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Reads a consistent-enough snapshot of all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            fetched: self.fetched.load(Ordering::Relaxed),
            stored: self.stored.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            fetch_errors: self.fetch_errors.load(Ordering::Relaxed),
            store_errors: self.store_errors.load(Ordering::Relaxed),
            runtime_secs: self.started.elapsed().as_secs(),
        }
    }
}

/// A point-in-time copy of the counters, for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Items returned by fetches, before dedup.
    pub fetched: u64,
    /// Items newly written to the store.
    pub stored: u64,
    /// Items recognized as already archived.
    pub duplicates: u64,
    /// Fetches that failed after retries.
    pub fetch_errors: u64,
    /// Store batches that failed.
    pub store_errors: u64,
    /// Seconds since the driver started.
    pub runtime_secs: u64,
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "runtime={}s fetched={} stored={} duplicates={} fetch_errors={} store_errors={}",
            self.runtime_secs,
            self.fetched,
            self.stored,
            self.duplicates,
            self.fetch_errors,
            self.store_errors
        )
    }
}
