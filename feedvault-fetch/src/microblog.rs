//! Microblog search API client (the hashtag-monitoring variant).
//!
//! Speaks the v2 recent-search endpoint with a bearer token. Token
//! acquisition is external; this client only attaches the token it was
//! given. Sources are hashtag names without the `#` prefix.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat};
use feedvault_core::Post;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::client::{HttpClient, ResponseExt};
use crate::error::FetchError;
use crate::strategy::{Continuation, FetchedPage, PageRequest, SourceClient, Strategy};

/// Rate-budget key for the microblog upstream.
const UPSTREAM_ID: &str = "microblog";

/// The recent-search endpoint rejects `max_results` below this.
const MIN_SEARCH_RESULTS: u32 = 10;

// ============================================================================
// Client
// ============================================================================

/// Client for the microblog v2 search API.
#[derive(Debug, Clone)]
pub struct MicroblogClient {
    http: HttpClient,
    base_url: String,
    bearer_token: String,
}

impl MicroblogClient {
    /// Creates a client against the public API.
    pub fn new(bearer_token: &str, user_agent: &str) -> Self {
        Self::with_base_url("https://api.x.com", bearer_token, user_agent)
    }

    /// Creates a client against a custom base URL (tests).
    pub fn with_base_url(base_url: impl Into<String>, bearer_token: &str, user_agent: &str) -> Self {
        Self {
            http: HttpClient::new(user_agent),
            base_url: base_url.into(),
            bearer_token: bearer_token.to_string(),
        }
    }

    fn query(req: &PageRequest) -> Vec<(&'static str, String)> {
        // The endpoint's floor is 10; extra items beyond the requested
        // page size are trimmed after parsing.
        let max_results = req.page_size.max(MIN_SEARCH_RESULTS);
        let mut query = vec![
            ("query", format!("#{}", req.source)),
            ("max_results", max_results.to_string()),
            (
                "tweet.fields",
                "id,text,author_id,created_at,public_metrics".to_string(),
            ),
        ];
        if let Some(since) = req.since {
            if let Some(start) = DateTime::from_timestamp(since, 0) {
                query.push(("start_time", start.to_rfc3339_opts(SecondsFormat::Secs, true)));
            }
        }
        if let Some(after) = &req.after {
            query.push(("next_token", after.clone()));
        }
        query
    }

    /// Parses a search response body into normalized posts plus the
    /// pagination token.
    fn parse_search(source: &str, body: &str) -> Result<(Vec<Post>, Option<String>), FetchError> {
        let response: SearchResponse =
            serde_json::from_str(body).map_err(|e| FetchError::Malformed(e.to_string()))?;

        let posts = response
            .data
            .into_iter()
            .map(|tweet| tweet.into_post(source))
            .collect::<Result<Vec<_>, _>>()?;

        Ok((posts, response.meta.next_token))
    }

    fn assemble_page(req: &PageRequest, mut posts: Vec<Post>, token: Option<String>) -> FetchedPage {
        posts.truncate(req.page_size as usize);
        if req.strategy == Strategy::Newest {
            if let Some(since) = req.since {
                posts.retain(|p| p.created_utc > since);
            }
            posts.sort_by_key(|p| p.created_utc);
            FetchedPage::exhausted(posts)
        } else {
            FetchedPage {
                posts,
                continuation: Continuation::from_token(token),
            }
        }
    }
}

#[async_trait]
impl SourceClient for MicroblogClient {
    fn upstream_id(&self) -> &'static str {
        UPSTREAM_ID
    }

    fn supports(&self, strategy: Strategy) -> bool {
        matches!(strategy, Strategy::Newest | Strategy::SearchTag)
    }

    #[instrument(skip(self), fields(source = %req.source, strategy = %req.strategy))]
    async fn fetch_page(&self, req: &PageRequest) -> Result<FetchedPage, FetchError> {
        req.validate()?;
        if !self.supports(req.strategy) {
            return Err(FetchError::InvalidRequest(format!(
                "microblog upstream has no {} traversal",
                req.strategy
            )));
        }

        let url = format!("{}/2/tweets/search/recent", self.base_url);
        let query = Self::query(req);

        let response = self
            .http
            .get(&url, &query, Some(&self.bearer_token))
            .await?;
        if response.is_rate_limited() {
            return Err(FetchError::RateLimited {
                retry_after: response.retry_after_secs(),
            });
        }
        let status = response.status();
        if !status.is_success() {
            // 401/403 included: the token itself is managed outside the
            // archiver, so all the driver can do is record and move on.
            return Err(FetchError::Transient(format!("HTTP {status}")));
        }

        let body = response.text().await?;
        let (posts, token) = Self::parse_search(&req.source, &body)?;
        debug!(count = posts.len(), "Parsed search page");
        Ok(Self::assemble_page(req, posts, token))
    }

    async fn probe(&self) -> Result<(), FetchError> {
        let req = PageRequest::paged(Strategy::SearchTag, "test", None, MIN_SEARCH_RESULTS);
        self.fetch_page(&req).await.map(|_| ())
    }
}

// ============================================================================
// Wire Format
// ============================================================================

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<RawTweet>,
    #[serde(default)]
    meta: SearchMeta,
}

#[derive(Debug, Default, Deserialize)]
struct SearchMeta {
    #[serde(default)]
    next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawTweet {
    id: String,
    text: String,
    created_at: String,
    #[serde(default)]
    author_id: String,
    #[serde(default)]
    public_metrics: TweetMetrics,
}

#[derive(Debug, Default, Deserialize)]
struct TweetMetrics {
    #[serde(default)]
    like_count: i64,
    #[serde(default)]
    reply_count: i64,
}

impl RawTweet {
    fn into_post(self, source: &str) -> Result<Post, FetchError> {
        let created = DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|e| FetchError::Malformed(format!("created_at {:?}: {e}", self.created_at)))?;
        let permalink = format!("https://x.com/i/web/status/{}", self.id);
        Ok(Post {
            post_id: self.id,
            title: self.text,
            author: if self.author_id.is_empty() {
                "unknown".to_string()
            } else {
                self.author_id
            },
            created_utc: created.timestamp(),
            score: self.public_metrics.like_count,
            num_comments: self.public_metrics.reply_count,
            url: permalink.clone(),
            selftext: String::new(),
            permalink,
            source: source.to_string(),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SEARCH_BODY: &str = r#"{
        "data": [
            {"id": "111", "text": "hello #demo", "author_id": "u1",
             "created_at": "2023-11-14T22:13:20Z",
             "public_metrics": {"like_count": 3, "reply_count": 1,
                                "retweet_count": 0, "quote_count": 0}},
            {"id": "222", "text": "another #demo", "author_id": "u2",
             "created_at": "2023-11-14T23:00:00Z"}
        ],
        "meta": {"next_token": "tok123", "result_count": 2}
    }"#;

    #[test]
    fn test_parse_search_maps_metrics() {
        let (posts, token) = MicroblogClient::parse_search("demo", SEARCH_BODY).unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(token.as_deref(), Some("tok123"));
        assert_eq!(posts[0].post_id, "111");
        assert_eq!(posts[0].score, 3);
        assert_eq!(posts[0].num_comments, 1);
        assert_eq!(posts[0].created_utc, 1_700_000_000);
        assert_eq!(posts[0].permalink, "https://x.com/i/web/status/111");
        assert_eq!(posts[1].score, 0);
    }

    #[test]
    fn test_empty_result_set_is_valid() {
        let (posts, token) = MicroblogClient::parse_search("demo", "{}").unwrap();
        assert!(posts.is_empty());
        assert!(token.is_none());
    }

    #[test]
    fn test_bad_timestamp_is_malformed() {
        let body = r#"{"data": [{"id": "1", "text": "x", "created_at": "yesterday"}]}"#;
        let err = MicroblogClient::parse_search("demo", body).unwrap_err();
        assert!(matches!(err, FetchError::Malformed(_)));
    }

    #[test]
    fn test_query_includes_hashtag_and_cursor() {
        let req = PageRequest::newest("demo", Some(1_700_000_000), 5);
        let query = MicroblogClient::query(&req);
        assert!(query.contains(&("query", "#demo".to_string())));
        assert!(query.contains(&("start_time", "2023-11-14T22:13:20Z".to_string())));
        // Page size below the endpoint floor is raised to the floor.
        assert!(query.contains(&("max_results", "10".to_string())));
    }

    #[test]
    fn test_trims_to_requested_page_size() {
        let (posts, token) = MicroblogClient::parse_search("demo", SEARCH_BODY).unwrap();
        let req = PageRequest::paged(Strategy::SearchTag, "demo", None, 1);
        let page = MicroblogClient::assemble_page(&req, posts, token);
        assert_eq!(page.posts.len(), 1);
    }
}
