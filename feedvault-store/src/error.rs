//! Store error types.

use thiserror::Error;

/// Errors that can occur in the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The database is unreachable or the connection is broken.
    /// Drivers treat this as fatal for the current cycle.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A row violated a schema constraint other than the duplicate
    /// primary key (which is handled inline and never surfaces).
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// A query failed for a row-level reason.
    #[error("Query failed: {0}")]
    Query(String),
}

impl StoreError {
    /// Returns true if the whole backend is down, as opposed to a
    /// single bad row.
    pub fn is_fatal(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, _) => match code.code {
                rusqlite::ErrorCode::CannotOpen
                | rusqlite::ErrorCode::DatabaseBusy
                | rusqlite::ErrorCode::DatabaseLocked
                | rusqlite::ErrorCode::DiskFull
                | rusqlite::ErrorCode::ReadOnly
                | rusqlite::ErrorCode::DatabaseCorrupt => Self::Unavailable(err.to_string()),
                rusqlite::ErrorCode::ConstraintViolation => {
                    Self::ConstraintViolation(err.to_string())
                }
                _ => Self::Query(err.to_string()),
            },
            _ => Self::Query(err.to_string()),
        }
    }
}
