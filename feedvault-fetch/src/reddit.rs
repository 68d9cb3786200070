//! Reddit listing API client.
//!
//! Speaks the public JSON listing endpoints (`/r/{source}/new.json`,
//! `top.json`, `hot.json`). Responses are validated against typed
//! structs at this boundary; anything that fails validation becomes
//! [`FetchError::Malformed`] and the page is dropped.

use async_trait::async_trait;
use feedvault_core::Post;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::client::{HttpClient, ResponseExt};
use crate::error::FetchError;
use crate::strategy::{Continuation, FetchedPage, PageRequest, SourceClient, Strategy};

/// Rate-budget key for the Reddit upstream.
const UPSTREAM_ID: &str = "reddit";

/// Listing children of this kind are posts; everything else (comments,
/// messages) is ignored.
const POST_KIND: &str = "t3";

// ============================================================================
// Client
// ============================================================================

/// Client for the Reddit listing API.
#[derive(Debug, Clone)]
pub struct RedditClient {
    http: HttpClient,
    base_url: String,
    probe_source: String,
}

impl RedditClient {
    /// Creates a client against the public API.
    pub fn new(user_agent: &str, probe_source: &str) -> Self {
        Self::with_base_url("https://www.reddit.com", user_agent, probe_source)
    }

    /// Creates a client against a custom base URL (tests, mirrors).
    pub fn with_base_url(base_url: impl Into<String>, user_agent: &str, probe_source: &str) -> Self {
        Self {
            http: HttpClient::new(user_agent),
            base_url: base_url.into(),
            probe_source: probe_source.to_string(),
        }
    }

    fn endpoint(&self, req: &PageRequest) -> Result<String, FetchError> {
        let path = match req.strategy {
            Strategy::Newest => "new",
            Strategy::Hot => "hot",
            Strategy::TopAll | Strategy::TopYear | Strategy::TopMonth | Strategy::TopWeek => "top",
            Strategy::SearchTag => {
                return Err(FetchError::InvalidRequest(
                    "reddit upstream has no tag search".to_string(),
                ));
            }
        };
        Ok(format!("{}/r/{}/{path}.json", self.base_url, req.source))
    }

    fn query(req: &PageRequest) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("limit", req.page_size.to_string()),
            // Prevents HTML entity encoding in bodies.
            ("raw_json", "1".to_string()),
        ];
        if let Some(t) = req.strategy.time_filter() {
            query.push(("t", t.to_string()));
        }
        if let Some(after) = &req.after {
            query.push(("after", after.clone()));
        }
        query
    }

    /// Parses a listing body into normalized posts plus the upstream's
    /// pagination token.
    fn parse_listing(source: &str, body: &str) -> Result<(Vec<Post>, Option<String>), FetchError> {
        let listing: Listing =
            serde_json::from_str(body).map_err(|e| FetchError::Malformed(e.to_string()))?;

        let posts = listing
            .data
            .children
            .into_iter()
            .filter(|child| child.kind == POST_KIND)
            .map(|child| child.data.into_post(source))
            .collect();

        Ok((posts, listing.data.after))
    }

    /// Applies the per-strategy page semantics: NEWEST pages are
    /// cursor-filtered and sorted ascending so the caller can advance
    /// its cursor to the last item without gaps; token strategies pass
    /// the upstream's continuation through.
    fn assemble_page(req: &PageRequest, mut posts: Vec<Post>, after: Option<String>) -> FetchedPage {
        if req.strategy == Strategy::Newest {
            if let Some(since) = req.since {
                posts.retain(|p| p.created_utc > since);
            }
            posts.sort_by_key(|p| p.created_utc);
            FetchedPage::exhausted(posts)
        } else {
            FetchedPage {
                posts,
                continuation: Continuation::from_token(after),
            }
        }
    }
}

#[async_trait]
impl SourceClient for RedditClient {
    fn upstream_id(&self) -> &'static str {
        UPSTREAM_ID
    }

    fn supports(&self, strategy: Strategy) -> bool {
        strategy != Strategy::SearchTag
    }

    #[instrument(skip(self), fields(source = %req.source, strategy = %req.strategy))]
    async fn fetch_page(&self, req: &PageRequest) -> Result<FetchedPage, FetchError> {
        req.validate()?;
        let url = self.endpoint(req)?;
        let query = Self::query(req);

        let response = self.http.get(&url, &query, None).await?;
        if response.is_rate_limited() {
            return Err(FetchError::RateLimited {
                retry_after: response.retry_after_secs(),
            });
        }
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Transient(format!("HTTP {status}")));
        }

        let body = response.text().await?;
        let (posts, after) = Self::parse_listing(&req.source, &body)?;
        debug!(count = posts.len(), "Parsed listing page");
        Ok(Self::assemble_page(req, posts, after))
    }

    async fn probe(&self) -> Result<(), FetchError> {
        let req = PageRequest::newest(&self.probe_source, None, 1);
        self.fetch_page(&req).await.map(|_| ())
    }
}

// ============================================================================
// Wire Format
// ============================================================================

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    children: Vec<ListingChild>,
    #[serde(default)]
    after: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListingChild {
    kind: String,
    data: RawPost,
}

/// One post as the listing API returns it. Only `id`, `title`, and
/// `created_utc` are required; everything else degrades to defaults
/// the way deleted/removed posts do upstream.
#[derive(Debug, Deserialize)]
struct RawPost {
    id: String,
    title: String,
    /// Arrives as a float (e.g. `1700000000.0`).
    created_utc: f64,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    num_comments: i64,
    #[serde(default)]
    url: String,
    #[serde(default)]
    selftext: String,
    #[serde(default)]
    permalink: String,
}

impl RawPost {
    #[allow(clippy::cast_possible_truncation)]
    fn into_post(self, source: &str) -> Post {
        let permalink = if self.permalink.is_empty() {
            String::new()
        } else {
            format!("https://reddit.com{}", self.permalink)
        };
        Post {
            post_id: self.id,
            title: self.title,
            author: self.author.unwrap_or_else(|| "[deleted]".to_string()),
            created_utc: self.created_utc as i64,
            score: self.score,
            num_comments: self.num_comments,
            url: self.url,
            selftext: self.selftext,
            permalink,
            source: source.to_string(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"{
        "kind": "Listing",
        "data": {
            "after": "t3_next",
            "children": [
                {"kind": "t3", "data": {
                    "id": "aaa", "title": "First", "created_utc": 100.0,
                    "author": "alice", "score": 5, "num_comments": 2,
                    "url": "https://example.com/a", "selftext": "",
                    "permalink": "/r/demo/comments/aaa"
                }},
                {"kind": "t1", "data": {
                    "id": "ccc", "title": "A comment", "created_utc": 150.0
                }},
                {"kind": "t3", "data": {
                    "id": "bbb", "title": "Second", "created_utc": 300.0
                }}
            ]
        }
    }"#;

    #[test]
    fn test_parse_listing_filters_non_posts() {
        let (posts, after) = RedditClient::parse_listing("demo", LISTING).unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(after.as_deref(), Some("t3_next"));
        assert_eq!(posts[0].post_id, "aaa");
        assert_eq!(posts[0].permalink, "https://reddit.com/r/demo/comments/aaa");
        assert_eq!(posts[1].author, "[deleted]");
        assert_eq!(posts[1].created_utc, 300);
    }

    #[test]
    fn test_parse_rejects_malformed_body() {
        let err = RedditClient::parse_listing("demo", "{\"data\": 42}").unwrap_err();
        assert!(matches!(err, FetchError::Malformed(_)));

        let err = RedditClient::parse_listing("demo", "not json at all").unwrap_err();
        assert!(matches!(err, FetchError::Malformed(_)));
    }

    #[test]
    fn test_newest_page_filters_and_sorts() {
        let (posts, after) = RedditClient::parse_listing("demo", LISTING).unwrap();
        let req = PageRequest::newest("demo", Some(100), 25);
        let page = RedditClient::assemble_page(&req, posts, after);

        // Item at the cursor is excluded (strictly newer), output ascending.
        assert_eq!(page.posts.len(), 1);
        assert_eq!(page.posts[0].post_id, "bbb");
        assert_eq!(page.continuation, Continuation::Exhausted);
    }

    #[test]
    fn test_paged_strategy_passes_token_through() {
        let (posts, after) = RedditClient::parse_listing("demo", LISTING).unwrap();
        let req = PageRequest::paged(Strategy::TopWeek, "demo", None, 25);
        let page = RedditClient::assemble_page(&req, posts, after);

        assert_eq!(page.posts.len(), 2);
        assert_eq!(page.continuation, Continuation::Token("t3_next".to_string()));
    }

    #[test]
    fn test_endpoint_mapping() {
        let client = RedditClient::with_base_url("https://host", "ua", "demo");
        let top = PageRequest::paged(Strategy::TopYear, "demo", None, 25);
        assert_eq!(client.endpoint(&top).unwrap(), "https://host/r/demo/top.json");
        assert!(RedditClient::query(&top).contains(&("t", "year".to_string())));

        let search = PageRequest::paged(Strategy::SearchTag, "demo", None, 25);
        assert!(matches!(
            client.endpoint(&search),
            Err(FetchError::InvalidRequest(_))
        ));
    }
}
