//! Listing, enable/disable and download-link queries over stored releases.
//!
//! This is the layer a transport (HTTP handlers, the CLI) talks to: requests
//! are validated here, store and cache failures are mapped to
//! [`ErrorKind`]s, and responses come back ready to serialize.

pub mod error;
mod request;
mod service;

pub use crate::error::{Error, ErrorKind, Result};
pub use crate::request::{Action, DownloadQuery, DownloadResponse, PackageChange, PackageRequest};
pub use crate::service::Service;
