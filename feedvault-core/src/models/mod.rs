//! Domain models for feedvault.
//!
//! ## Submodules
//!
//! - [`post`] - The archived feed item ([`Post`])
//! - [`stats`] - Per-driver run statistics ([`RunStats`], [`StatsSnapshot`])

mod post;
mod stats;

// Re-export everything at the models level
pub use post::Post;
pub use stats::{RunStats, StatsSnapshot};
