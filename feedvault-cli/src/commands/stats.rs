//! Stats command - per-source archive summary.

use anyhow::{Context, Result};
use chrono::DateTime;
use feedvault_store::{PostStore, SqliteStore};

use crate::{Cli, ExitCode};

/// Prints per-source archive statistics.
pub fn run(cli: &Cli) -> Result<ExitCode> {
    let store = SqliteStore::open(&cli.db)
        .with_context(|| format!("cannot open archive at {}", cli.db.display()))?;

    let summaries = store.source_summaries()?;
    if summaries.is_empty() {
        println!("Archive is empty.");
        return Ok(ExitCode::Success);
    }

    println!(
        "{:<20} {:>8}  {:<16} {:<16} {:<16}",
        "SOURCE", "POSTS", "OLDEST", "NEWEST", "LAST WRITE"
    );
    for summary in &summaries {
        println!(
            "{:<20} {:>8}  {:<16} {:<16} {:<16}",
            summary.source,
            summary.total,
            format_ts(summary.oldest_created_utc),
            format_ts(summary.newest_created_utc),
            format_ts(summary.last_retrieved_at),
        );
    }
    println!("\nTotal: {} posts", store.post_count()?);

    Ok(ExitCode::Success)
}

fn format_ts(ts: Option<i64>) -> String {
    ts.and_then(|t| DateTime::from_timestamp(t, 0))
        .map_or_else(|| "-".to_string(), |dt| dt.format("%Y-%m-%d %H:%M").to_string())
}
