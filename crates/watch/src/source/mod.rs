//! Release source trait and implementations.
//!
//! A release source answers one question: what is the latest release
//! published for a platform?

#[cfg(feature = "http")]
mod http;
#[cfg(any(test, feature = "mock"))]
mod mock;

#[cfg(feature = "http")]
pub use self::http::{DEFAULT_URL_TEMPLATE, HttpSource};
#[cfg(any(test, feature = "mock"))]
pub use self::mock::MockSource;
use crate::error::Result;
use async_trait::async_trait;
use pkgapi_models::{Platform, ReleaseManifest};
use std::sync::Arc;

/// Where release manifests come from.
///
/// Implementations must be cancel-safe: the poller drops an in-flight
/// [`ReleaseSource::latest`] future as soon as its cycle is cancelled.
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    /// Name of the source, for logging only.
    fn name(&self) -> &str;

    /// Latest manifest published for `platform`.
    async fn latest(&self, platform: Platform) -> Result<ReleaseManifest>;
}

/// Shared, type-erased release source.
pub type SourceHandle = Arc<dyn ReleaseSource>;
