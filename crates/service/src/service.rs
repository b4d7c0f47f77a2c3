use exn::ResultExt;
use futures::future::try_join_all;
use pkgapi_cache::{Fingerprint, ResponseCache};
use pkgapi_models::{ListResponse, Platform};
use pkgapi_store::{ErrorKind as StoreErrorKind, Store, StoreKey, StoredRecord};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::error::{ErrorKind, Result};
use crate::request::{DownloadQuery, DownloadResponse, PackageChange, PackageRequest};

fn list_key() -> Fingerprint {
    Fingerprint::of(b"list")
}

/// Read and maintenance operations over the release store.
///
/// The resolved listing is cached; enabling or disabling a release evicts it.
#[derive(Debug, Clone)]
pub struct Service {
    store: Store,
    cache: Arc<ResponseCache>,
    /// Bumped by every state change. A listing resolved under an older
    /// generation is never cached.
    generation: Arc<Mutex<u64>>,
}

impl Service {
    pub fn new(store: Store, cache: Arc<ResponseCache>) -> Self {
        Self { store, cache, generation: Arc::default() }
    }

    /// Sweep expired listings once per cache TTL until `cancel` fires.
    ///
    /// A host that keeps the service alive across requests runs this once.
    pub fn spawn_sweeper(&self, cancel: CancellationToken) -> JoinHandle<()> {
        self.cache.spawn_sweeper(self.cache.ttl(), cancel)
    }

    fn generation(&self) -> u64 {
        *self.generation.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cache `body` unless a state change happened since `seen` was read. Returns whether it was cached.
    fn cache_listing(&self, seen: u64, body: &Arc<[u8]>) -> bool {
        let generation = self.generation.lock().unwrap_or_else(PoisonError::into_inner);
        if *generation != seen {
            tracing::debug!(seen, current = *generation, "listing changed while resolving; not caching");
            return false;
        }
        self.cache.add(list_key(), Arc::clone(body));
        true
    }

    fn invalidate_listing(&self) {
        let mut generation = self.generation.lock().unwrap_or_else(PoisonError::into_inner);
        *generation += 1;
        self.cache.remove(&list_key());
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    /// Serialized listing of the latest enabled release per platform.
    pub async fn list(&self) -> Result<Arc<[u8]>> {
        let key = list_key();
        if let Some(body) = self.cache.get(&key) {
            tracing::trace!(key = %key, "listing served from cache");
            return Ok(body);
        }
        let seen = self.generation();
        let body: Arc<[u8]> = self.resolve().await?.to_json().or_raise(|| ErrorKind::Serialize)?.into();
        self.cache_listing(seen, &body);
        Ok(body)
    }

    /// Resolve the latest enabled release of every platform, bypassing the cache.
    ///
    /// Keys are listed once and shared by the per-platform resolutions, which run concurrently.
    #[instrument(level = "debug", skip(self))]
    pub async fn resolve(&self) -> Result<ListResponse> {
        let keys = self.store.keys().await.or_raise(|| ErrorKind::Store)?;
        let lookups = Platform::ALL.map(|platform| {
            let keys = &keys;
            async move { self.store.latest_enabled(keys, platform).await.map(|found| (platform, found)) }
        });
        let resolved = try_join_all(lookups).await.or_raise(|| ErrorKind::Store)?;
        let list = ListResponse::new();
        for (platform, found) in resolved {
            match found {
                Some((key, stored)) => {
                    tracing::trace!(key = %key, "resolved latest release");
                    list.insert(platform, stored.record);
                },
                None => tracing::debug!(%platform, "no enabled release"),
            }
        }
        Ok(list)
    }

    /// Enable or disable every release matching the request. Returns how many records changed.
    #[instrument(skip(self))]
    pub async fn toggle(&self, request: &PackageRequest) -> Result<usize> {
        let PackageChange { action, date, platform } = request.validate()?;
        let count = match self.store.set_disabled(date, platform, action.disables()).await {
            Ok(count) => count,
            Err(err) if matches!(*err, StoreErrorKind::NotFound(_)) => {
                let message = format!("package with date '{date}' was not found");
                return Err(err).or_raise(|| ErrorKind::NotFound(message));
            },
            Err(err) => return Err(err).or_raise(|| ErrorKind::Store),
        };
        self.invalidate_listing();
        tracing::info!(%action, %date, count, "package state changed");
        Ok(count)
    }

    /// Download links for one package, stamped with the current time.
    pub fn download(&self, query: &DownloadQuery) -> Result<DownloadResponse> {
        query.links()
    }

    /// Every stored release, oldest ingestion first.
    pub async fn history(&self, platform: Option<Platform>) -> Result<Vec<(StoreKey, StoredRecord)>> {
        self.store.history(platform).await.or_raise(|| ErrorKind::Store)
    }
}

#[cfg(test)]
mod tests {
    use pkgapi_models::ArchRecord;
    use std::time::Duration;
    use time::OffsetDateTime;

    use super::*;
    use crate::request::Action;

    async fn service() -> Service {
        let store = Store::open_in_memory().await.unwrap();
        let cache = Arc::new(ResponseCache::new(4, Duration::from_secs(60)).unwrap());
        Service::new(store, cache)
    }

    async fn seed(service: &Service, key: &str) {
        let key: StoreKey = key.parse().unwrap();
        assert!(service.store().ingest(&key, ArchRecord::new(key.date)).await.unwrap());
    }

    fn archs(body: &[u8]) -> serde_json::Map<String, serde_json::Value> {
        let value: serde_json::Value = serde_json::from_slice(body).unwrap();
        value.get("archs").and_then(|archs| archs.as_object().cloned()).unwrap_or_default()
    }

    #[tokio::test]
    async fn test_list_latest_per_platform() {
        let service = service().await;
        seed(&service, "20221201-arm").await;
        seed(&service, "20230101-arm").await;
        seed(&service, "20221215-x86").await;

        let archs = archs(&service.list().await.unwrap());
        assert_eq!(archs.len(), 2);
        assert_eq!(archs["arm"]["date"], "20230101");
        assert_eq!(archs["x86"]["date"], "20221215");
    }

    #[tokio::test]
    async fn test_list_empty_store() {
        let service = service().await;
        assert_eq!(&*service.list().await.unwrap(), b"{}");
    }

    #[tokio::test]
    async fn test_list_is_cached() {
        let service = service().await;
        seed(&service, "20221201-arm").await;
        let first = service.list().await.unwrap();
        seed(&service, "20230101-arm").await;
        let second = service.list().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(archs(&second)["arm"]["date"], "20221201");
    }

    #[tokio::test]
    async fn test_toggle_evicts_listing() {
        let service = service().await;
        seed(&service, "20221201-arm").await;
        seed(&service, "20230101-arm").await;
        assert_eq!(archs(&service.list().await.unwrap())["arm"]["date"], "20230101");

        let request = PackageRequest::new(Action::Disable, "20230101", None);
        assert_eq!(service.toggle(&request).await.unwrap(), 1);
        assert_eq!(archs(&service.list().await.unwrap())["arm"]["date"], "20221201");

        let request = PackageRequest::new(Action::Disable, "20221201", Some(Platform::Arm));
        service.toggle(&request).await.unwrap();
        assert!(archs(&service.list().await.unwrap()).is_empty());

        let request = PackageRequest::new(Action::Enable, "20230101", None);
        service.toggle(&request).await.unwrap();
        assert_eq!(archs(&service.list().await.unwrap())["arm"]["date"], "20230101");
    }

    #[tokio::test]
    async fn test_listing_resolved_before_toggle_is_not_cached() {
        let service = service().await;
        seed(&service, "20221201-arm").await;
        seed(&service, "20230101-arm").await;

        // A listing resolved concurrently with a toggle that commits before it is cached.
        let seen = service.generation();
        let stale: Arc<[u8]> = service.resolve().await.unwrap().to_json().unwrap().into();
        service.toggle(&PackageRequest::new(Action::Disable, "20230101", None)).await.unwrap();
        assert!(!service.cache_listing(seen, &stale));
        assert!(service.cache().is_empty());
        assert_eq!(archs(&service.list().await.unwrap())["arm"]["date"], "20221201");

        // Without an intervening change the listing is cached as usual.
        let seen = service.generation();
        let fresh: Arc<[u8]> = service.resolve().await.unwrap().to_json().unwrap().into();
        service.cache().clear();
        assert!(service.cache_listing(seen, &fresh));
        assert!(Arc::ptr_eq(&service.list().await.unwrap(), &fresh));
    }

    #[tokio::test]
    async fn test_sweeper_expires_cached_listing() {
        let store = Store::open_in_memory().await.unwrap();
        let cache = Arc::new(ResponseCache::new(4, Duration::from_millis(50)).unwrap());
        let service = Service::new(store, cache);
        seed(&service, "20230101-arm").await;
        let cancel = CancellationToken::new();
        let sweeper = service.spawn_sweeper(cancel.clone());

        service.list().await.unwrap();
        assert_eq!(service.cache().len(), 1);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(service.cache().sweep(), 0);
        assert!(service.cache().is_empty());

        cancel.cancel();
        sweeper.await.unwrap();
    }

    #[tokio::test]
    async fn test_toggle_unknown_date() {
        let service = service().await;
        seed(&service, "20230101-arm").await;
        let err = service.toggle(&PackageRequest::new(Action::Disable, "20240101", None)).await.unwrap_err();
        assert_eq!(*err, ErrorKind::NotFound("package with date '20240101' was not found".to_string()));
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn test_toggle_rejects_invalid_request() {
        let service = service().await;
        seed(&service, "20230101-arm").await;
        let request = PackageRequest { action: "delete".into(), date: "20230101".into(), platform: None };
        let err = service.toggle(&request).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Validation(_)));
        let (key, _) = service.store().latest(Platform::Arm).await.unwrap().unwrap();
        assert_eq!(key.to_string(), "20230101-arm");
    }

    #[tokio::test]
    async fn test_download_stamps_current_time() {
        let service = service().await;
        let before = OffsetDateTime::now_utc().unix_timestamp();
        let response = service.download(&DownloadQuery::new("x86", "8.1", "full", "20230101")).unwrap();
        let ts: i64 = response.zip.split("ts=").nth(1).unwrap().split('&').next().unwrap().parse().unwrap();
        assert!(ts >= before);
        assert!(!response.zip_mirrors.contains("ts="));
    }

    #[tokio::test]
    async fn test_history() {
        let service = service().await;
        seed(&service, "20230101-arm").await;
        seed(&service, "20230101-x86").await;
        assert_eq!(service.history(None).await.unwrap().len(), 2);
        assert_eq!(service.history(Some(Platform::X86)).await.unwrap().len(), 1);
    }
}
