//! Incremental polling driver.
//!
//! The poller walks every configured source once per cycle with the
//! NEWEST strategy, advancing a per-source timestamp cursor read back
//! from the store. It is single-threaded on purpose: sources share one
//! upstream rate budget, so parallel fetches would only contend on the
//! governor.

use std::sync::Arc;

use feedvault_core::{IngestConfig, RunStats, Shutdown, StatsSnapshot};
use feedvault_fetch::{fetch_with_retry, FetchError, PageRequest, RateGovernor, RetryPolicy, SourceClient};
use feedvault_store::PostStore;
use tracing::{error, info, warn};

use crate::error::IngestError;

/// Cycles between periodic stats log lines.
const STATS_LOG_EVERY: u64 = 5;

// ============================================================================
// Lifecycle
// ============================================================================

/// Lifecycle states of the polling driver.
///
/// `Init → Polling ⇄ Sleeping → Draining → Stopped`; there are no
/// transitions out of `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    /// Probing the seams; no loop state exists yet.
    Init,
    /// Walking the configured sources.
    Polling,
    /// Waiting out the poll interval.
    Sleeping,
    /// Shutdown observed; emitting the final stats line.
    Draining,
    /// Terminal.
    Stopped,
}

// ============================================================================
// Cycle Outcome
// ============================================================================

/// Aggregate result of one polling cycle across all sources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleOutcome {
    /// Sources polled without error.
    pub sources_ok: u32,
    /// Sources skipped after a fetch or store failure.
    pub sources_failed: u32,
    /// New posts written this cycle.
    pub stored: u64,
    /// Already-archived posts seen this cycle.
    pub duplicates: u64,
}

impl CycleOutcome {
    /// Whether any source failed this cycle.
    pub fn had_failures(&self) -> bool {
        self.sources_failed > 0
    }
}

// ============================================================================
// Poller
// ============================================================================

/// Continuous incremental ingestion driver.
pub struct Poller<C: ?Sized, S: ?Sized> {
    client: Arc<C>,
    store: Arc<S>,
    governor: Arc<RateGovernor>,
    config: IngestConfig,
    retry: RetryPolicy,
    stats: Arc<RunStats>,
    state: std::sync::Mutex<PollerState>,
    shutdown: Shutdown,
}

impl<C, S> Poller<C, S>
where
    C: SourceClient + ?Sized,
    S: PostStore + ?Sized,
{
    /// Creates a poller over the given seams.
    pub fn new(
        client: Arc<C>,
        store: Arc<S>,
        governor: Arc<RateGovernor>,
        config: IngestConfig,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            client,
            store,
            governor,
            config,
            retry: RetryPolicy::default(),
            stats: Arc::new(RunStats::new()),
            state: std::sync::Mutex::new(PollerState::Init),
            shutdown,
        }
    }

    /// The driver's current lifecycle state.
    pub fn state(&self) -> PollerState {
        self.state.lock().map_or(PollerState::Stopped, |s| *s)
    }

    fn set_state(&self, state: PollerState) {
        if let Ok(mut current) = self.state.lock() {
            *current = state;
        }
    }

    /// Overrides the retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The run counters, shareable with reporting tasks.
    pub fn stats(&self) -> Arc<RunStats> {
        Arc::clone(&self.stats)
    }

    /// Verifies both seams before entering the loop. A failure here is
    /// a misconfiguration, not an operational hiccup, so the driver
    /// refuses to start.
    pub async fn startup_probe(&self) -> Result<(), IngestError> {
        self.store
            .probe()
            .map_err(|e| IngestError::Startup(format!("store: {e}")))?;
        self.client
            .probe()
            .await
            .map_err(|e| IngestError::Startup(format!("upstream: {e}")))?;
        Ok(())
    }

    /// Runs the polling loop until shutdown, returning the final
    /// counters.
    pub async fn run(&self) -> Result<StatsSnapshot, IngestError> {
        self.startup_probe().await?;
        info!(
            sources = ?self.config.sources,
            interval_secs = self.config.poll_interval.as_secs(),
            "Poller started"
        );

        let mut cycles: u64 = 0;
        while !self.shutdown.is_triggered() {
            self.set_state(PollerState::Polling);
            let outcome = self.cycle().await;
            cycles += 1;
            if outcome.had_failures() {
                warn!(
                    sources_failed = outcome.sources_failed,
                    "Cycle completed with failures"
                );
            }
            if cycles % STATS_LOG_EVERY == 0 {
                info!(stats = %self.stats.snapshot(), "Progress");
            }
            self.set_state(PollerState::Sleeping);
            if !self.shutdown.sleep(self.config.poll_interval).await {
                break;
            }
        }

        self.set_state(PollerState::Draining);
        let snapshot = self.stats.snapshot();
        info!(stats = %snapshot, "Poller stopped");
        self.set_state(PollerState::Stopped);
        Ok(snapshot)
    }

    /// Runs the startup probe and exactly one cycle.
    pub async fn run_once(&self) -> Result<CycleOutcome, IngestError> {
        self.startup_probe().await?;
        self.set_state(PollerState::Polling);
        let outcome = self.cycle().await;
        info!(stats = %self.stats.snapshot(), "Cycle finished");
        self.set_state(PollerState::Stopped);
        Ok(outcome)
    }

    /// Polls every configured source once. Per-source failures are
    /// recorded and skipped; a store outage aborts the rest of the
    /// cycle since every remaining source would hit the same wall.
    pub async fn cycle(&self) -> CycleOutcome {
        let mut outcome = CycleOutcome::default();
        for source in &self.config.sources {
            if self.shutdown.is_triggered() {
                break;
            }
            match self.poll_source(source).await {
                Ok((stored, duplicates)) => {
                    outcome.sources_ok += 1;
                    outcome.stored += stored;
                    outcome.duplicates += duplicates;
                }
                Err(IngestError::Fetch(FetchError::Interrupted)) => break,
                Err(IngestError::Store(e)) if e.is_fatal() => {
                    outcome.sources_failed += 1;
                    error!(source, error = %e, "Store unavailable, aborting cycle");
                    break;
                }
                Err(e) => {
                    outcome.sources_failed += 1;
                    warn!(source, error = %e, "Source poll failed");
                }
            }
        }
        outcome
    }

    /// Fetches NEWEST pages for one source until it is caught up or the
    /// per-cycle page bound is hit, advancing the cursor as batches
    /// land.
    async fn poll_source(&self, source: &str) -> Result<(u64, u64), IngestError> {
        let mut cursor = self.store.latest_cursor(source)?;
        let mut stored: u64 = 0;
        let mut duplicates: u64 = 0;

        for _ in 0..self.config.max_pages_per_cycle {
            let req = PageRequest::newest(source, cursor, self.config.page_size);
            let page = match fetch_with_retry(
                self.client.as_ref(),
                &req,
                &self.retry,
                &self.governor,
                &self.shutdown,
            )
            .await
            {
                Ok(page) => page,
                Err(FetchError::Interrupted) => return Err(FetchError::Interrupted.into()),
                Err(e) => {
                    self.stats.record_fetch_error();
                    return Err(e.into());
                }
            };

            self.stats.record_fetched(page.posts.len() as u64);
            if page.posts.is_empty() {
                break;
            }

            let batch = match self.store.store_batch(&page.posts) {
                Ok(batch) => batch,
                Err(e) => {
                    self.stats.record_store_error();
                    return Err(e.into());
                }
            };
            self.stats.record_store_outcome(batch.stored, batch.duplicates);
            stored += batch.stored;
            duplicates += batch.duplicates;

            // Pages arrive ascending, so the last item is the new cursor.
            if let Some(last) = page.posts.last() {
                cursor = Some(cursor.map_or(last.created_utc, |c| c.max(last.created_utc)));
            }
            if (page.posts.len() as u64) < u64::from(self.config.page_size) {
                break;
            }
        }

        Ok((stored, duplicates))
    }
}

// ============================================================================
// Tests
// ============================================================================
