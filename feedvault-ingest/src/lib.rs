//! Ingestion drivers for FeedVault.
//!
//! Two drivers share the fetch and store seams: the [`Poller`] runs the
//! continuous incremental loop, and the [`BackfillEngine`] walks the
//! historical listing strategies once. Both are generic over
//! [`feedvault_fetch::SourceClient`] and [`feedvault_store::PostStore`]
//! so tests can drive them with in-memory doubles.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

pub mod backfill;
pub mod error;
pub mod poller;

#[cfg(test)]
mod testing;

pub use backfill::{BackfillEngine, BackfillReport};
pub use error::IngestError;
pub use poller::{CycleOutcome, Poller, PollerState};
