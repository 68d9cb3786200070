//! Post persistence for FeedVault.
//!
//! Defines the [`PostStore`] trait the ingest drivers write through and
//! the SQLite implementation behind it. Deduplication lives here: the
//! primary key on `post_id` makes every insert idempotent, so drivers
//! can replay overlapping pages without bookkeeping.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

pub mod error;
pub mod sqlite;
pub mod store;

pub use error::StoreError;
pub use sqlite::SqliteStore;
pub use store::{BatchOutcome, PostStore, SourceSummary};
