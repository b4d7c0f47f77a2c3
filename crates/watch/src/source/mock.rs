//! In-memory release source for testing.

use crate::error::{ErrorKind, Result};
use crate::source::ReleaseSource;
use async_trait::async_trait;
use pkgapi_models::{Platform, ReleaseAsset, ReleaseManifest};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

/// In-memory release source for testing.
///
/// Manifests live in a `HashMap` behind a [`RwLock`], so tests can swap them
/// or inject failures while a poller holds the source. A platform without a
/// manifest answers like a missing upstream file (status 404).
#[derive(Debug, Default)]
pub struct MockSource {
    name: String,
    manifests: RwLock<HashMap<Platform, ReleaseManifest>>,
    failing: RwLock<HashSet<Platform>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockSource {
    pub fn new() -> Self {
        Self { name: "mock".to_string(), ..Self::default() }
    }

    /// Create a mock source pre-populated with manifests.
    pub fn with_manifests(manifests: impl IntoIterator<Item = (Platform, ReleaseManifest)>) -> Self {
        Self { manifests: RwLock::new(manifests.into_iter().collect()), ..Self::new() }
    }

    /// Same manifest layout for every platform.
    pub fn with_release<'a>(date: &str, assets: impl IntoIterator<Item = (&'a str, &'a [&'a str])> + Clone) -> Self {
        Self::with_manifests(
            Platform::ALL.into_iter().map(|platform| (platform, Self::manifest(platform, date, assets.clone()))),
        )
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sleep this long before answering each request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Build a manifest from `(api, variants)` pairs.
    pub fn manifest<'a>(
        platform: Platform,
        date: &str,
        assets: impl IntoIterator<Item = (&'a str, &'a [&'a str])>,
    ) -> ReleaseManifest {
        ReleaseManifest {
            arch: platform.to_string(),
            date: date.to_string(),
            assets: assets
                .into_iter()
                .map(|(api, variants)| ReleaseAsset {
                    api: api.to_string(),
                    variants: variants.iter().map(ToString::to_string).collect(),
                })
                .collect(),
        }
    }

    pub async fn set_manifest(&self, platform: Platform, manifest: ReleaseManifest) {
        self.manifests.write().await.insert(platform, manifest);
    }

    /// Make every request for `platform` fail until [`MockSource::recover`].
    pub async fn fail(&self, platform: Platform) {
        self.failing.write().await.insert(platform);
    }

    pub async fn recover(&self, platform: Platform) {
        self.failing.write().await.remove(&platform);
    }

    /// Number of requests answered or attempted so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReleaseSource for MockSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn latest(&self, platform: Platform) -> Result<ReleaseManifest> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.read().await.contains(&platform) {
            exn::bail!(ErrorKind::Fetch(platform));
        }
        match self.manifests.read().await.get(&platform) {
            Some(manifest) => Ok(manifest.clone()),
            None => exn::bail!(ErrorKind::Status { platform, status: 404 }),
        }
    }
}
