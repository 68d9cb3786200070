//! Core error types for feedvault.

use thiserror::Error;

/// Core error type for feedvault operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Invalid configuration, reported once at startup.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A source name that the configuration does not know about.
    #[error("Unknown source: {0}")]
    UnknownSource(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}
