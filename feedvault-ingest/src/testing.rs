//! In-memory doubles shared by the driver tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use feedvault_core::Post;
use feedvault_fetch::{
    Continuation, FetchError, FetchedPage, PageRequest, SourceClient, Strategy,
};
use feedvault_store::{BatchOutcome, PostStore, SourceSummary, StoreError};

/// Minimal post fixture.
pub fn post(id: &str, source: &str, created_utc: i64) -> Post {
    Post {
        post_id: id.to_string(),
        title: format!("post {id}"),
        author: "alice".to_string(),
        created_utc,
        score: 1,
        num_comments: 0,
        url: String::new(),
        selftext: String::new(),
        permalink: String::new(),
        source: source.to_string(),
    }
}

// ============================================================================
// Store Double
// ============================================================================

/// `PostStore` over a vector, with a switch to simulate the backend
/// going away.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<Post>>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(rows: Vec<Post>) -> Self {
        Self {
            rows: Mutex::new(rows),
            unavailable: AtomicBool::new(false),
        }
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn rows(&self) -> Vec<Post> {
        self.rows.lock().unwrap().clone()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("backend offline".to_string()))
        } else {
            Ok(())
        }
    }
}

impl PostStore for MemoryStore {
    fn store_batch(&self, posts: &[Post]) -> Result<BatchOutcome, StoreError> {
        self.check_available()?;
        let mut rows = self.rows.lock().unwrap();
        let mut outcome = BatchOutcome::default();
        for post in posts {
            if rows.iter().any(|r| r.post_id == post.post_id) {
                outcome.duplicates += 1;
            } else {
                rows.push(post.clone());
                outcome.stored += 1;
            }
        }
        Ok(outcome)
    }

    fn latest_cursor(&self, source: &str) -> Result<Option<i64>, StoreError> {
        self.check_available()?;
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .filter(|r| r.source == source)
            .map(|r| r.created_utc)
            .max())
    }

    fn existing_ids(&self, source: &str) -> Result<HashSet<String>, StoreError> {
        self.check_available()?;
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .filter(|r| r.source == source)
            .map(|r| r.post_id.clone())
            .collect())
    }

    fn source_summaries(&self) -> Result<Vec<SourceSummary>, StoreError> {
        self.check_available()?;
        let rows = self.rows.lock().unwrap();
        let mut by_source: HashMap<String, Vec<i64>> = HashMap::new();
        for row in rows.iter() {
            by_source
                .entry(row.source.clone())
                .or_default()
                .push(row.created_utc);
        }
        let mut summaries: Vec<SourceSummary> = by_source
            .into_iter()
            .map(|(source, times)| SourceSummary {
                source,
                total: times.len() as u64,
                oldest_created_utc: times.iter().min().copied(),
                newest_created_utc: times.iter().max().copied(),
                last_retrieved_at: None,
            })
            .collect();
        summaries.sort_by(|a, b| a.source.cmp(&b.source));
        Ok(summaries)
    }

    fn post_count(&self) -> Result<u64, StoreError> {
        self.check_available()?;
        Ok(self.rows.lock().unwrap().len() as u64)
    }

    fn probe(&self) -> Result<(), StoreError> {
        self.check_available()
    }
}

// ============================================================================
// Client Double
// ============================================================================

/// `SourceClient` that serves scripted timelines and pages.
///
/// NEWEST requests walk a per-source timeline oldest-first, honoring
/// the `since` cursor and page size. Paginated strategies serve a fixed
/// page list with `p{n}` continuation tokens.
#[derive(Default)]
pub struct ScriptedClient {
    timelines: Mutex<HashMap<String, Vec<Post>>>,
    pages: Mutex<HashMap<(String, Strategy), Vec<Vec<Post>>>>,
    fail_sources: Mutex<HashSet<String>>,
    fail_strategies: Mutex<HashSet<Strategy>>,
    pub calls: AtomicU32,
    pub probe_fails: AtomicBool,
    pub search_only: AtomicBool,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the full NEWEST timeline for a source (ascending by time).
    pub fn set_timeline(&self, source: &str, mut posts: Vec<Post>) {
        posts.sort_by_key(|p| p.created_utc);
        self.timelines
            .lock()
            .unwrap()
            .insert(source.to_string(), posts);
    }

    /// Sets the page sequence one strategy serves for a source.
    pub fn set_pages(&self, source: &str, strategy: Strategy, pages: Vec<Vec<Post>>) {
        self.pages
            .lock()
            .unwrap()
            .insert((source.to_string(), strategy), pages);
    }

    /// Makes every fetch for `source` fail with a transient error.
    pub fn fail_source(&self, source: &str) {
        self.fail_sources.lock().unwrap().insert(source.to_string());
    }

    /// Makes every fetch with `strategy` fail with a transient error.
    pub fn fail_strategy(&self, strategy: Strategy) {
        self.fail_strategies.lock().unwrap().insert(strategy);
    }

    fn newest_page(&self, req: &PageRequest) -> FetchedPage {
        let timelines = self.timelines.lock().unwrap();
        let posts: Vec<Post> = timelines
            .get(&req.source)
            .map(|timeline| {
                timeline
                    .iter()
                    .filter(|p| req.since.is_none_or(|since| p.created_utc > since))
                    .take(req.page_size as usize)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        FetchedPage::exhausted(posts)
    }

    fn scripted_page(&self, req: &PageRequest) -> FetchedPage {
        let index = match &req.after {
            None => 0,
            Some(token) => token
                .strip_prefix('p')
                .and_then(|n| n.parse::<usize>().ok())
                .unwrap_or(0),
        };
        let pages = self.pages.lock().unwrap();
        let sequence = pages.get(&(req.source.clone(), req.strategy));
        let mut posts = sequence
            .and_then(|s| s.get(index))
            .cloned()
            .unwrap_or_default();
        posts.truncate(req.page_size as usize);
        let continuation = match sequence {
            Some(s) if index + 1 < s.len() => Continuation::Token(format!("p{}", index + 1)),
            _ => Continuation::Exhausted,
        };
        FetchedPage { posts, continuation }
    }
}

#[async_trait]
impl SourceClient for ScriptedClient {
    fn upstream_id(&self) -> &'static str {
        "scripted"
    }

    fn supports(&self, strategy: Strategy) -> bool {
        if self.search_only.load(Ordering::SeqCst) {
            matches!(strategy, Strategy::Newest | Strategy::SearchTag)
        } else {
            strategy != Strategy::SearchTag
        }
    }

    async fn fetch_page(&self, req: &PageRequest) -> Result<FetchedPage, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_sources.lock().unwrap().contains(&req.source) {
            return Err(FetchError::Transient("scripted failure".to_string()));
        }
        if self.fail_strategies.lock().unwrap().contains(&req.strategy) {
            return Err(FetchError::Transient("scripted failure".to_string()));
        }
        if req.strategy == Strategy::Newest {
            Ok(self.newest_page(req))
        } else {
            Ok(self.scripted_page(req))
        }
    }

    async fn probe(&self) -> Result<(), FetchError> {
        if self.probe_fails.load(Ordering::SeqCst) {
            return Err(FetchError::Transient("probe failure".to_string()));
        }
        Ok(())
    }
}
