// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `feedvault` Fetch
//!
//! Upstream access for the feedvault archiver.
//!
//! This crate provides everything between the ingestion drivers and the
//! network:
//!
//! - [`Strategy`] - the closed set of traversal strategies (newest,
//!   top-by-period, hot, tag search)
//! - [`SourceClient`] - the trait one upstream client implements
//! - [`RedditClient`] / [`MicroblogClient`] - the two upstream clients
//! - [`RateGovernor`] - the single intentional throttling point
//! - [`RetryPolicy`] / [`fetch_with_retry`] - bounded retry with
//!   backoff around every driver-issued fetch
//!
//! ## Example
//!
//! ```ignore
//! use feedvault_fetch::{fetch_with_retry, PageRequest, RedditClient};
//!
//! let client = RedditClient::new("feedvault/0.1", "samsung");
//! let req = PageRequest::newest("samsung", Some(cursor), 25);
//! let page = fetch_with_retry(&client, &req, &retry, &governor, &shutdown).await?;
//! ```

pub mod client;
pub mod error;
pub mod governor;
pub mod microblog;
pub mod reddit;
pub mod retry;
pub mod strategy;

// Errors
pub use error::FetchError;

// Strategy & client seam
pub use strategy::{Continuation, FetchedPage, PageRequest, SourceClient, Strategy};

// Upstream clients
pub use microblog::MicroblogClient;
pub use reddit::RedditClient;

// Throttling & retry
pub use client::{HttpClient, ResponseExt};
pub use governor::{RateGovernor, RatePolicy};
pub use retry::{fetch_with_retry, RetryPolicy};
