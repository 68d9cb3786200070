//! Historical backfill driver.
//!
//! A backfill run walks several overlapping listing strategies for one
//! source. The listings overlap heavily (this week's top posts are
//! usually in this month's too), so the run keeps an in-memory set of
//! already-seen post IDs, seeded from the archive, and drops repeats
//! before they reach the store.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use feedvault_core::{IngestConfig, Post, RunStats, Shutdown};
use feedvault_fetch::{
    fetch_with_retry, Continuation, FetchError, PageRequest, RateGovernor, RetryPolicy,
    SourceClient, Strategy,
};
use feedvault_store::PostStore;
use tracing::{info, warn};

use crate::error::IngestError;

// ============================================================================
// Report
// ============================================================================

/// Summary of one backfill run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackfillReport {
    /// Source the run covered.
    pub source: String,
    /// New posts written.
    pub stored: u64,
    /// Posts dropped as already seen (in the run or in the archive).
    pub duplicates: u64,
    /// Strategies that failed mid-walk.
    pub fetch_errors: u64,
    /// Store batches that failed without taking the backend down.
    pub store_errors: u64,
    /// Strategies attempted.
    pub strategies_run: u32,
}

impl BackfillReport {
    fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            stored: 0,
            duplicates: 0,
            fetch_errors: 0,
            store_errors: 0,
            strategies_run: 0,
        }
    }
}

impl fmt::Display for BackfillReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "source={} strategies={} stored={} duplicates={} fetch_errors={} store_errors={}",
            self.source,
            self.strategies_run,
            self.stored,
            self.duplicates,
            self.fetch_errors,
            self.store_errors
        )
    }
}

// ============================================================================
// Engine
// ============================================================================

/// One-shot historical ingestion driver.
pub struct BackfillEngine<C: ?Sized, S: ?Sized> {
    client: Arc<C>,
    store: Arc<S>,
    governor: Arc<RateGovernor>,
    config: IngestConfig,
    retry: RetryPolicy,
    stats: Arc<RunStats>,
    shutdown: Shutdown,
}

impl<C, S> BackfillEngine<C, S>
where
    C: SourceClient + ?Sized,
    S: PostStore + ?Sized,
{
    /// Creates a backfill engine over the given seams.
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
            shutdown,
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

    /// The strategy walk for this upstream: the standard sequence
    /// filtered to what the client implements, falling back to tag
    /// search for upstreams that only do search.
    fn strategies(&self) -> Vec<Strategy> {
        let supported: Vec<Strategy> = Strategy::backfill_sequence()
            .into_iter()
            .filter(|s| self.client.supports(*s))
            .collect();
        if supported.is_empty() && self.client.supports(Strategy::SearchTag) {
            vec![Strategy::SearchTag]
        } else {
            supported
        }
    }

    /// Runs the full strategy walk for `source`.
    ///
    /// Each strategy is bounded by `config.backfill_budget` fetched
    /// items and isolated from the others' failures. Only a store
    /// outage (or a failure reading the seed set) aborts the run; a
    /// pending shutdown ends it early with a partial report.
    pub async fn run(&self, source: &str) -> Result<BackfillReport, IngestError> {
        let mut seen = self.store.existing_ids(source)?;
        let mut report = BackfillReport::new(source);
        info!(
            source,
            archived = seen.len(),
            budget = self.config.backfill_budget,
            "Backfill started"
        );

        for strategy in self.strategies() {
            if self.shutdown.is_triggered() {
                break;
            }
            report.strategies_run += 1;
            match self.walk_strategy(source, strategy, &mut seen, &mut report).await {
                Ok(()) => {}
                Err(IngestError::Fetch(FetchError::Interrupted)) => break,
                Err(e @ IngestError::Store(_)) => return Err(e),
                Err(e) => {
                    report.fetch_errors += 1;
                    warn!(source, %strategy, error = %e, "Strategy abandoned");
                }
            }
        }

        info!(%report, "Backfill finished");
        Ok(report)
    }

    /// Pages through one strategy until it is exhausted or the item
    /// budget is spent.
    async fn walk_strategy(
        &self,
        source: &str,
        strategy: Strategy,
        seen: &mut HashSet<String>,
        report: &mut BackfillReport,
    ) -> Result<(), IngestError> {
        let mut after: Option<String> = None;
        let mut fetched: u32 = 0;

        while fetched < self.config.backfill_budget {
            let page_size = self.config.page_size.min(self.config.backfill_budget - fetched);
            let req = PageRequest::paged(strategy, source, after.take(), page_size);
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
                Err(e) => {
                    if !matches!(e, FetchError::Interrupted) {
                        self.stats.record_fetch_error();
                    }
                    return Err(e.into());
                }
            };

            fetched += u32::try_from(page.posts.len()).unwrap_or(u32::MAX);
            self.stats.record_fetched(page.posts.len() as u64);
            if page.posts.is_empty() {
                break;
            }

            let (survivors, dropped) = Self::split_unseen(page.posts, seen);
            report.duplicates += dropped;
            self.stats.record_store_outcome(0, dropped);

            if !survivors.is_empty() {
                match self.store.store_batch(&survivors) {
                    Ok(batch) => {
                        self.stats.record_store_outcome(batch.stored, batch.duplicates);
                        report.stored += batch.stored;
                        report.duplicates += batch.duplicates;
                        seen.extend(survivors.into_iter().map(|p| p.post_id));
                    }
                    Err(e) if e.is_fatal() => {
                        self.stats.record_store_error();
                        return Err(e.into());
                    }
                    Err(e) => {
                        // The page stays out of the seen set so a later
                        // strategy can retry these items.
                        self.stats.record_store_error();
                        report.store_errors += 1;
                        warn!(source, %strategy, error = %e, "Batch write failed");
                        break;
                    }
                }
            }

            match page.continuation {
                Continuation::Token(token) => after = Some(token),
                Continuation::Exhausted => break,
            }
        }

        Ok(())
    }

    /// Splits a page into unseen posts and the count of already-seen
    /// ones. Also dedups within the page itself.
    fn split_unseen(posts: Vec<Post>, seen: &HashSet<String>) -> (Vec<Post>, u64) {
        let mut survivors = Vec::with_capacity(posts.len());
        let mut in_page: HashSet<String> = HashSet::new();
        let mut dropped: u64 = 0;
        for post in posts {
            if seen.contains(&post.post_id) || !in_page.insert(post.post_id.clone()) {
                dropped += 1;
            } else {
                survivors.push(post);
            }
        }
        (survivors, dropped)
    }
}

// ============================================================================
// Tests
// ============================================================================
