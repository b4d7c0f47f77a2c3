//! CLI Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A CLI error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("configuration error")]
    Config,
    #[display("store error")]
    Store,
    #[display("release watcher error")]
    Watch,
    #[display("request failed")]
    Service,
    #[display("invalid arguments: {_0}")]
    Usage(#[error(not(source))] String),
    #[display("unable to write output")]
    Output,
    #[display("unable to listen for shutdown signal")]
    Signal,
}
