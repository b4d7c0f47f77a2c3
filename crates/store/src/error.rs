//! Store Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A store error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
/// [`ErrorKind::NotFound`] and [`ErrorKind::NilValue`] are lookup outcomes that
/// callers are expected to branch on rather than report.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The store file could not be opened within the configured timeout.
    #[display("unable to open store: {}", _0.display())]
    Open(#[error(not(source))] PathBuf),
    #[display("store did not close within the configured timeout")]
    CloseTimeout,
    #[display("database error")]
    Database,
    #[display("database migration error")]
    Migration,
    #[display("unable to remove store file: {}", _0.display())]
    Remove(#[error(not(source))] PathBuf),
    /// No entry exists under the key.
    #[display("key not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// The key exists but holds no value.
    #[display("nil value for key: {_0}")]
    NilValue(#[error(not(source))] String),
    /// Serialization/deserialization error.
    #[display("invalid store data: {_0}")]
    InvalidData(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Lock contention and busy databases clear up on their own.
        matches!(self, Self::Open(_) | Self::CloseTimeout | Self::Database)
    }

    /// Returns `true` for lookups that found nothing usable.
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::NilValue(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_kinds() {
        assert!(ErrorKind::NotFound("k".into()).is_missing());
        assert!(ErrorKind::NilValue("k".into()).is_missing());
        assert!(!ErrorKind::Database.is_missing());
        assert!(!ErrorKind::InvalidData("k".into()).is_missing());
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(ErrorKind::Database.is_retryable());
        assert!(ErrorKind::CloseTimeout.is_retryable());
        assert!(!ErrorKind::NotFound("k".into()).is_retryable());
        assert!(!ErrorKind::Migration.is_retryable());
    }
}
