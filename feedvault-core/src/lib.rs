// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `feedvault` Core
//!
//! Core types and configuration for the feedvault archiver.
//!
//! This crate provides the foundational pieces used across all other
//! feedvault crates:
//!
//! - Domain model ([`Post`]) for archived feed items
//! - Run statistics ([`RunStats`], [`StatsSnapshot`]) owned per driver
//! - Immutable ingest configuration ([`IngestConfig`]) validated once
//!   at startup
//! - Cooperative cancellation ([`Shutdown`]) checked at every
//!   suspension point
//! - Core error type ([`CoreError`])

pub mod config;
pub mod error;
pub mod models;
pub mod shutdown;

// Re-export error types
pub use error::CoreError;

// Re-export all model types
pub use models::{Post, RunStats, StatsSnapshot};

// Re-export config and shutdown
pub use config::{IngestConfig, RatePolicyConfig, MAX_PAGE_SIZE, MIN_POLL_INTERVAL_SECS};
pub use shutdown::Shutdown;
