//! Model Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A model error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for model operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A field was found but could not be parsed.
    #[display("failed to parse field '{field}', found value: {value}")]
    Parse {
        /// The field that failed to parse.
        field: &'static str,
        /// The offending value.
        value: String,
    },
    /// The aggregated listing could not be serialized.
    #[display("unable to serialize listing")]
    Serialize,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Manifests and identifiers are either valid or they're not.
        false
    }

    pub(crate) fn parse(field: &'static str, value: impl Into<String>) -> Self {
        Self::Parse { field, value: value.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        assert_eq!(
            ErrorKind::parse("variant", "gigantic").to_string(),
            "failed to parse field 'variant', found value: gigantic"
        );
        assert_eq!(ErrorKind::Serialize.to_string(), "unable to serialize listing");
    }

    #[test]
    fn error_kind_never_retryable() {
        assert!(!ErrorKind::parse("api", "1.0").is_retryable());
        assert!(!ErrorKind::Serialize.is_retryable());
    }
}
