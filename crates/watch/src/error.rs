//! Watch Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use pkgapi_models::Platform;

/// A watch error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for watch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The release source couldn't be reached or returned garbage.
    #[display("unable to fetch latest release for {_0}")]
    Fetch(#[error(not(source))] Platform),
    /// The release source answered with a non-success status.
    #[display("release source answered {status} for {platform}")]
    Status { platform: Platform, status: u16 },
    /// The manifest named an unknown platform, API level or variant.
    #[display("invalid release manifest for {_0}")]
    Parse(#[error(not(source))] Platform),
    #[display("unable to store releases")]
    Store,
    #[display("release source client could not be built")]
    Client,
    #[display("poll cycle cancelled")]
    Cancelled,
    #[display("fetch task failed")]
    Task,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Fetch(_) | Self::Store | Self::Task => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::Parse(_) | Self::Client | Self::Cancelled => false,
        }
    }
}
