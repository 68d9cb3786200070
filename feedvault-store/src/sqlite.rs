//! SQLite-backed post archive.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;

use feedvault_core::Post;
use rusqlite::{params, Connection};
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::store::{BatchOutcome, PostStore, SourceSummary};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS posts (
    post_id      TEXT PRIMARY KEY,
    title        TEXT NOT NULL,
    author       TEXT NOT NULL DEFAULT '[deleted]',
    created_utc  INTEGER NOT NULL,
    score        INTEGER NOT NULL DEFAULT 0,
    num_comments INTEGER NOT NULL DEFAULT 0,
    url          TEXT NOT NULL DEFAULT '',
    selftext     TEXT NOT NULL DEFAULT '',
    permalink    TEXT NOT NULL DEFAULT '',
    source       TEXT NOT NULL,
    retrieved_at INTEGER NOT NULL DEFAULT (strftime('%s','now'))
);
CREATE INDEX IF NOT EXISTS idx_posts_created_utc ON posts(created_utc);
CREATE INDEX IF NOT EXISTS idx_posts_retrieved_at ON posts(retrieved_at);
CREATE INDEX IF NOT EXISTS idx_posts_source ON posts(source);
";

// ============================================================================
// Store
// ============================================================================

/// Post archive over a single SQLite database file.
///
/// The connection is serialized behind a mutex; all callers in this
/// system share one store through `Arc`, and write volume is paced by
/// the rate governor well below what a single connection handles.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (creating if needed) the archive at `path` and ensures
    /// the schema exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .map_err(|e| StoreError::Unavailable(format!("open {}: {e}", path.display())))?;
        info!(path = %path.display(), "Opened post archive");
        Self::init(conn)
    }

    /// Opens an in-memory archive (tests).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("connection mutex poisoned".to_string()))
    }
}

impl PostStore for SqliteStore {
    fn store_batch(&self, posts: &[Post]) -> Result<BatchOutcome, StoreError> {
        if posts.is_empty() {
            return Ok(BatchOutcome::default());
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut outcome = BatchOutcome::default();
        {
            let mut insert = tx.prepare_cached(
                "INSERT INTO posts
                   (post_id, title, author, created_utc, score, num_comments,
                    url, selftext, permalink, source)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                 ON CONFLICT(post_id) DO NOTHING",
            )?;
            for post in posts {
                let result = insert.execute(params![
                    post.post_id,
                    post.title,
                    post.author,
                    post.created_utc,
                    post.score,
                    post.num_comments,
                    post.url,
                    post.selftext,
                    post.permalink,
                    post.source,
                ]);
                match result.map_err(StoreError::from) {
                    Ok(0) => outcome.duplicates += 1,
                    Ok(_) => outcome.stored += 1,
                    // A bad row should not take down the rest of the batch.
                    Err(e @ StoreError::ConstraintViolation(_)) => {
                        warn!(post_id = %post.post_id, error = %e, "Row rejected, skipping");
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        tx.commit()?;

        debug!(
            stored = outcome.stored,
            duplicates = outcome.duplicates,
            "Batch written"
        );
        Ok(outcome)
    }

    fn latest_cursor(&self, source: &str) -> Result<Option<i64>, StoreError> {
        let conn = self.lock()?;
        let cursor = conn.query_row(
            "SELECT MAX(created_utc) FROM posts WHERE source = ?1",
            params![source],
            |row| row.get::<_, Option<i64>>(0),
        )?;
        Ok(cursor)
    }

    fn existing_ids(&self, source: &str) -> Result<HashSet<String>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached("SELECT post_id FROM posts WHERE source = ?1")?;
        let ids = stmt
            .query_map(params![source], |row| row.get::<_, String>(0))?
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(ids)
    }

    fn source_summaries(&self) -> Result<Vec<SourceSummary>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(
            "SELECT source, COUNT(*), MIN(created_utc), MAX(created_utc), MAX(retrieved_at)
             FROM posts GROUP BY source ORDER BY source",
        )?;
        let summaries = stmt
            .query_map([], |row| {
                Ok(SourceSummary {
                    source: row.get(0)?,
                    total: row.get::<_, i64>(1)?.unsigned_abs(),
                    oldest_created_utc: row.get(2)?,
                    newest_created_utc: row.get(3)?,
                    last_retrieved_at: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(summaries)
    }

    fn post_count(&self) -> Result<u64, StoreError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM posts", [], |row| row.get(0))?;
        Ok(count.unsigned_abs())
    }

    fn probe(&self) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.query_row("SELECT COUNT(*) FROM posts LIMIT 1", [], |_| Ok(()))?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn post(id: &str, source: &str, created_utc: i64) -> Post {
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

    #[test]
    fn test_store_batch_counts_duplicates() {
        let store = SqliteStore::open_in_memory().unwrap();

        let outcome = store
            .store_batch(&[post("a", "rust", 100), post("b", "rust", 200)])
            .unwrap();
        assert_eq!(outcome, BatchOutcome { stored: 2, duplicates: 0 });

        // Replaying an overlapping batch stores only the new row.
        let outcome = store
            .store_batch(&[post("b", "rust", 200), post("c", "rust", 300)])
            .unwrap();
        assert_eq!(outcome, BatchOutcome { stored: 1, duplicates: 1 });
        assert_eq!(store.post_count().unwrap(), 3);
    }

    #[test]
    fn test_duplicate_keeps_first_write() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.store_batch(&[post("a", "rust", 100)]).unwrap();

        let mut updated = post("a", "rust", 100);
        updated.title = "edited".to_string();
        store.store_batch(&[updated]).unwrap();

        let summaries = store.source_summaries().unwrap();
        assert_eq!(summaries[0].total, 1);
        let ids = store.existing_ids("rust").unwrap();
        assert!(ids.contains("a"));
    }

    #[test]
    fn test_latest_cursor_per_source() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .store_batch(&[
                post("a", "rust", 100),
                post("b", "rust", 300),
                post("c", "golang", 500),
            ])
            .unwrap();

        assert_eq!(store.latest_cursor("rust").unwrap(), Some(300));
        assert_eq!(store.latest_cursor("golang").unwrap(), Some(500));
        assert_eq!(store.latest_cursor("python").unwrap(), None);
    }

    #[test]
    fn test_existing_ids_scoped_to_source() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .store_batch(&[post("a", "rust", 100), post("b", "golang", 200)])
            .unwrap();

        let ids = store.existing_ids("rust").unwrap();
        assert_eq!(ids.len(), 1);
        assert!(ids.contains("a"));
    }

    #[test]
    fn test_source_summaries_aggregate() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .store_batch(&[
                post("a", "rust", 100),
                post("b", "rust", 300),
                post("c", "golang", 200),
            ])
            .unwrap();

        let summaries = store.source_summaries().unwrap();
        assert_eq!(summaries.len(), 2);
        // Ordered by source name.
        assert_eq!(summaries[0].source, "golang");
        assert_eq!(summaries[1].source, "rust");
        assert_eq!(summaries[1].total, 2);
        assert_eq!(summaries[1].oldest_created_utc, Some(100));
        assert_eq!(summaries[1].newest_created_utc, Some(300));
        assert!(summaries[1].last_retrieved_at.is_some());
    }

    #[test]
    fn test_reopen_preserves_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("archive.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.store_batch(&[post("a", "rust", 100)]).unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        store.probe().unwrap();
        assert_eq!(store.post_count().unwrap(), 1);
        assert_eq!(store.latest_cursor("rust").unwrap(), Some(100));
    }
}
