//! Release sources and the periodic release poller.
//!
//! A [`Watcher`] fans out over every [`Platform`](pkgapi_models::Platform)
//! against a [`ReleaseSource`](source::ReleaseSource), aggregates the
//! manifests, and ingests releases it hasn't seen before into the
//! [`Store`](pkgapi_store::Store). A cycle either succeeds for every
//! platform or writes nothing.

pub mod error;
mod poller;
pub mod source;

pub use crate::error::{Error, ErrorKind, Result};
pub use crate::poller::{PollStatus, Watcher};
pub use crate::source::{ReleaseSource, SourceHandle};
