//! The persistence seam between ingest drivers and storage backends.

use std::collections::HashSet;

use feedvault_core::Post;
use serde::Serialize;

use crate::error::StoreError;

// ============================================================================
// Outcomes
// ============================================================================

/// Result of writing one batch of posts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Rows actually inserted.
    pub stored: u64,
    /// Rows skipped because the `post_id` already existed.
    pub duplicates: u64,
}

impl BatchOutcome {
    /// Merges another outcome into this one.
    pub fn absorb(&mut self, other: BatchOutcome) {
        self.stored += other.stored;
        self.duplicates += other.duplicates;
    }
}

/// Per-source aggregate reported by the stats command.
#[derive(Debug, Clone, Serialize)]
pub struct SourceSummary {
    /// Source name (subreddit or hashtag).
    pub source: String,
    /// Total posts archived for this source.
    pub total: u64,
    /// Creation time of the oldest archived post (epoch seconds).
    pub oldest_created_utc: Option<i64>,
    /// Creation time of the newest archived post (epoch seconds).
    pub newest_created_utc: Option<i64>,
    /// When a post for this source was last written (epoch seconds).
    pub last_retrieved_at: Option<i64>,
}

// ============================================================================
// Trait
// ============================================================================

/// Storage backend for archived posts.
///
/// Implementations must make `store_batch` idempotent on `post_id`:
/// replaying a page that was already written reports duplicates rather
/// than failing or double-counting.
pub trait PostStore: Send + Sync {
    /// Writes a batch of posts, skipping any whose `post_id` is
    /// already archived.
    fn store_batch(&self, posts: &[Post]) -> Result<BatchOutcome, StoreError>;

    /// Highest `created_utc` archived for `source`, if any. This is
    /// the incremental poll cursor.
    fn latest_cursor(&self, source: &str) -> Result<Option<i64>, StoreError>;

    /// All archived post IDs for `source`. Seeds the backfill
    /// deduplication set.
    fn existing_ids(&self, source: &str) -> Result<HashSet<String>, StoreError>;

    /// Per-source aggregates, ordered by source name.
    fn source_summaries(&self) -> Result<Vec<SourceSummary>, StoreError>;

    /// Total archived posts across all sources.
    fn post_count(&self) -> Result<u64, StoreError>;

    /// Verifies the backend is reachable and the schema is present.
    fn probe(&self) -> Result<(), StoreError>;
}
