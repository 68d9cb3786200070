//! The archived feed item.

use serde::{Deserialize, Serialize};

/// A single feed item (a subreddit post or a microblog status) as it is
/// stored in the archive.
///
/// The natural id (`post_id`) is unique within the store; retrieving an
/// already-stored id is a no-op, never an update. Engagement counters
/// are a snapshot taken at retrieval time. The retrieval timestamp is
/// assigned by the store at first insert and is deliberately not part
/// of this model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Natural id, unique per upstream (e.g. the Reddit base36 id).
    pub post_id: String,
    /// Title, or the full text for microblog items.
    pub title: String,
    /// Author identifier.
    #[serde(default = "default_author")]
    pub author: String,
    /// Creation time in seconds since epoch, as reported by the upstream.
    pub created_utc: i64,
    /// Upvote score / like count at retrieval time.
    #[serde(default)]
    pub score: i64,
    /// Comment / reply count at retrieval time.
    #[serde(default)]
    pub num_comments: i64,
    /// Link URL (may equal the permalink for self posts).
    #[serde(default)]
    pub url: String,
    /// Self-text body, empty for link posts and microblog items.
    #[serde(default)]
    pub selftext: String,
    /// Canonical permalink back to the upstream.
    #[serde(default)]
    pub permalink: String,
    /// Source name this item was fetched for (subreddit or hashtag).
    pub source: String,
}

fn default_author() -> String {
    "[deleted]".to_string()
}

impl Post {
    /// Returns a short one-line description, useful in log output.
    pub fn summary(&self) -> String {
        let title: String = self.title.chars().take(60).collect();
        format!("{} [{}] {}", self.post_id, self.source, title)
    }
}
