//! Traversal strategies and the source client seam.
//!
//! A strategy is one way of walking an upstream's content for a source.
//! The incremental poller only ever uses [`Strategy::Newest`]; the
//! backfill engine runs the fixed sequence from
//! [`Strategy::backfill_sequence`] to maximize unique historical
//! coverage.

use async_trait::async_trait;
use feedvault_core::{Post, MAX_PAGE_SIZE};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::FetchError;

// ============================================================================
// Strategy
// ============================================================================

/// A traversal strategy over one upstream source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Newest items first, cursored by a creation-timestamp lower bound.
    Newest,
    /// Top items of all time.
    TopAll,
    /// Top items of the past year.
    TopYear,
    /// Top items of the past month.
    TopMonth,
    /// Top items of the past week.
    TopWeek,
    /// Currently trending items.
    Hot,
    /// Tag/hashtag search (microblog upstream).
    SearchTag,
}

impl Strategy {
    /// Returns the display name for this strategy.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Newest => "newest",
            Self::TopAll => "top-all",
            Self::TopYear => "top-year",
            Self::TopMonth => "top-month",
            Self::TopWeek => "top-week",
            Self::Hot => "hot",
            Self::SearchTag => "search-tag",
        }
    }

    /// The fixed strategy order a backfill run walks for each source.
    pub fn backfill_sequence() -> [Strategy; 5] {
        [
            Self::TopAll,
            Self::TopYear,
            Self::TopMonth,
            Self::TopWeek,
            Self::Hot,
        ]
    }

    /// The upstream `t=` time filter for the top-by-period strategies.
    pub fn time_filter(&self) -> Option<&'static str> {
        match self {
            Self::TopAll => Some("all"),
            Self::TopYear => Some("year"),
            Self::TopMonth => Some("month"),
            Self::TopWeek => Some("week"),
            _ => None,
        }
    }

    /// Whether this strategy paginates with an opaque token.
    ///
    /// `Newest` does not: it is cursored by timestamp and returns one
    /// listing page per call.
    pub fn is_paginated(&self) -> bool {
        !matches!(self, Self::Newest)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

// ============================================================================
// Page Request / Fetched Page
// ============================================================================

/// One page-fetch request against a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Traversal strategy to use.
    pub strategy: Strategy,
    /// Source name (subreddit or hashtag, without prefix).
    pub source: String,
    /// Exclusive creation-timestamp lower bound. Only meaningful for
    /// [`Strategy::Newest`]; `None` means "no bound" (bootstrap).
    pub since: Option<i64>,
    /// Opaque continuation token from the previous page. Only
    /// meaningful for paginated strategies; `None` means "start".
    pub after: Option<String>,
    /// Items requested, `1..=MAX_PAGE_SIZE`. The caller clamps; the
    /// client rejects out-of-range values instead of reducing them.
    pub page_size: u32,
}

impl PageRequest {
    /// Builds a NEWEST request with a timestamp cursor.
    pub fn newest(source: &str, since: Option<i64>, page_size: u32) -> Self {
        Self {
            strategy: Strategy::Newest,
            source: source.to_string(),
            since,
            after: None,
            page_size,
        }
    }

    /// Builds a token-paginated request for a backfill strategy.
    pub fn paged(strategy: Strategy, source: &str, after: Option<String>, page_size: u32) -> Self {
        Self {
            strategy,
            source: source.to_string(),
            since: None,
            after,
            page_size,
        }
    }

    /// Checks the request's input constraints.
    pub fn validate(&self) -> Result<(), FetchError> {
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(FetchError::InvalidRequest(format!(
                "page size {} outside 1..={MAX_PAGE_SIZE}",
                self.page_size
            )));
        }
        Ok(())
    }
}

/// Where pagination stands after a page fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Continuation {
    /// Pass this token as `after` to get the next page.
    Token(String),
    /// The strategy has no more pages for this source.
    Exhausted,
}

impl Continuation {
    /// Wraps an upstream's optional token: absent means exhausted.
    pub fn from_token(token: Option<String>) -> Self {
        match token {
            Some(t) if !t.is_empty() => Self::Token(t),
            _ => Self::Exhausted,
        }
    }
}

/// The result of one successful page fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// Normalized items, ascending by `created_utc` for NEWEST pages,
    /// upstream order otherwise.
    pub posts: Vec<Post>,
    /// Continuation state for paginated strategies.
    pub continuation: Continuation,
}

impl FetchedPage {
    /// A page with no further continuation.
    pub fn exhausted(posts: Vec<Post>) -> Self {
        Self {
            posts,
            continuation: Continuation::Exhausted,
        }
    }
}

// ============================================================================
// Source Client Trait
// ============================================================================

/// One upstream API, exposed as paged fetches by strategy.
///
/// Implementations normalize upstream items into [`Post`] and classify
/// failures into the [`FetchError`] taxonomy. They do not throttle or
/// retry; the drivers go through [`crate::fetch_with_retry`], which
/// consults the rate governor before every outbound request.
#[async_trait]
pub trait SourceClient: Send + Sync {
    /// Key for this upstream's rate budget (e.g. `"reddit"`).
    fn upstream_id(&self) -> &'static str;

    /// Whether this upstream implements the given strategy.
    fn supports(&self, strategy: Strategy) -> bool;

    /// Fetches one page of items for the request.
    async fn fetch_page(&self, req: &PageRequest) -> Result<FetchedPage, FetchError>;

    /// Lightweight connectivity check used at driver startup.
    async fn probe(&self) -> Result<(), FetchError>;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backfill_sequence_order() {
        let seq = Strategy::backfill_sequence();
        assert_eq!(
            seq,
            [
                Strategy::TopAll,
                Strategy::TopYear,
                Strategy::TopMonth,
                Strategy::TopWeek,
                Strategy::Hot
            ]
        );
    }

    #[test]
    fn test_time_filters() {
        assert_eq!(Strategy::TopWeek.time_filter(), Some("week"));
        assert_eq!(Strategy::Hot.time_filter(), None);
        assert_eq!(Strategy::Newest.time_filter(), None);
    }

    #[test]
    fn test_page_size_bounds_rejected() {
        assert!(PageRequest::newest("demo", None, 0).validate().is_err());
        assert!(PageRequest::newest("demo", None, 101).validate().is_err());
        assert!(PageRequest::newest("demo", None, 100).validate().is_ok());
    }

    #[test]
    fn test_continuation_from_token() {
        assert_eq!(
            Continuation::from_token(Some("t3_abc".into())),
            Continuation::Token("t3_abc".into())
        );
        assert_eq!(Continuation::from_token(None), Continuation::Exhausted);
        assert_eq!(
            Continuation::from_token(Some(String::new())),
            Continuation::Exhausted
        );
    }
}
