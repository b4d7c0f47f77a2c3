//! Periodic release poller.

use crate::error::{ErrorKind, Result};
use crate::source::SourceHandle;
use exn::ResultExt;
use pkgapi_models::{ListResponse, Platform};
use pkgapi_store::{Store, StoreKey};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// Where the poller is in its cycle.
///
/// The outcome of the last cycle stays visible until the next one starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStatus {
    /// Not started yet, or stopped.
    Idle,
    Polling,
    /// The last cycle fetched every platform; `written` new releases were stored.
    Success { written: usize },
    Failed,
}

/// Release poller: fetches every platform on a fixed interval and stores
/// releases it hasn't seen before.
///
/// Built unstarted; [`Watcher::start`] consumes it, so a poller can only be
/// started once.
pub struct Watcher {
    source: SourceHandle,
    store: Store,
    interval: Duration,
    status: watch::Sender<PollStatus>,
}

impl Watcher {
    pub fn new(source: SourceHandle, store: Store, interval: Duration) -> Self {
        let (status, _) = watch::channel(PollStatus::Idle);
        Self { source, store, interval, status }
    }

    pub fn status(&self) -> watch::Receiver<PollStatus> {
        self.status.subscribe()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Spawn the polling loop: one cycle immediately, then one per interval,
    /// until `cancel` fires.
    pub fn start(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }

    async fn run(self, cancel: CancellationToken) {
        tracing::info!(source = self.source.name(), interval = ?self.interval, "release watcher started");
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {},
            }
            self.cycle(&cancel).await;
        }
        self.status.send_replace(PollStatus::Idle);
        tracing::info!("release watcher stopped");
    }

    async fn cycle(&self, cancel: &CancellationToken) {
        self.status.send_replace(PollStatus::Polling);
        let status = match self.check_release(cancel).await {
            Ok(written) => {
                match written {
                    0 => tracing::debug!("no new releases"),
                    _ => tracing::info!(written, "stored new releases"),
                }
                PollStatus::Success { written }
            },
            Err(err) if *err == ErrorKind::Cancelled => {
                tracing::debug!("release check cancelled");
                PollStatus::Failed
            },
            Err(err) => {
                tracing::error!(error = ?err, "release check failed");
                PollStatus::Failed
            },
        };
        self.status.send_replace(status);
    }

    /// Run one poll cycle and return how many new releases were stored.
    ///
    /// Every platform is fetched concurrently. The first failure cancels the
    /// remaining fetches and fails the whole cycle before anything is
    /// written. Releases already in the store are left untouched.
    #[instrument(skip_all, fields(source = self.source.name()))]
    pub async fn check_release(&self, cancel: &CancellationToken) -> Result<usize> {
        let list = self.fetch_all(cancel).await?;
        let mut written = 0;
        let mut failed = 0;
        for (platform, record) in list.snapshot() {
            let date = record.release_date().or_raise(|| ErrorKind::Parse(platform))?;
            let key = StoreKey::new(date, platform);
            match self.store.ingest(&key, record).await {
                Ok(true) => written += 1,
                Ok(false) => tracing::debug!(key = %key, "release already stored"),
                Err(err) => {
                    tracing::error!(key = %key, error = ?err, "unable to store release");
                    failed += 1;
                },
            }
        }
        if failed > 0 {
            exn::bail!(ErrorKind::Store);
        }
        Ok(written)
    }

    async fn fetch_all(&self, cancel: &CancellationToken) -> Result<Arc<ListResponse>> {
        let list = Arc::new(ListResponse::new());
        let scope = cancel.child_token();
        let mut tasks: JoinSet<Result<Platform>> = JoinSet::new();
        for platform in Platform::ALL {
            let source = Arc::clone(&self.source);
            let list = Arc::clone(&list);
            let scope = scope.clone();
            tasks.spawn(async move {
                let manifest = tokio::select! {
                    _ = scope.cancelled() => exn::bail!(ErrorKind::Cancelled),
                    manifest = source.latest(platform) => manifest?,
                };
                let added = manifest.aggregate_into(platform, &list).or_raise(|| ErrorKind::Parse(platform))?;
                tracing::debug!(%platform, date = %manifest.date, packages = added, "fetched manifest");
                Ok(platform)
            });
        }
        while let Some(joined) = tasks.join_next().await {
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(err) => Err(err).or_raise(|| ErrorKind::Task),
            };
            if let Err(err) = outcome {
                scope.cancel();
                tasks.shutdown().await;
                return Err(err);
            }
        }
        Ok(list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MockSource;
    use pkgapi_store::StoredRecord;

    const PICO: &[&str] = &["pico", "nano"];

    fn source() -> Arc<MockSource> {
        Arc::new(MockSource::with_release("20230101", [("9.0", PICO), ("10.0", PICO)]))
    }

    async fn watcher(source: &Arc<MockSource>) -> (Watcher, Store) {
        let store = Store::open_in_memory().await.unwrap();
        let handle: SourceHandle = source.clone();
        (Watcher::new(handle, store.clone(), Duration::from_millis(50)), store)
    }

    #[tokio::test]
    async fn test_cycle_ingests_every_platform() {
        let source = source();
        let (watcher, store) = watcher(&source).await;
        let cancel = CancellationToken::new();
        assert_eq!(watcher.check_release(&cancel).await.unwrap(), 4);
        assert_eq!(store.keys().await.unwrap(), [
            "20230101-arm",
            "20230101-arm64",
            "20230101-x86",
            "20230101-x86_64"
        ]);
        let bytes = store.get("20230101-arm64").await.unwrap();
        let record = StoredRecord::from_slice("20230101-arm64", &bytes).unwrap();
        assert_eq!(record.record.variant_count(), 4);
        assert!(!record.disabled);
    }

    #[tokio::test]
    async fn test_repeated_cycles_are_idempotent() {
        let source = source();
        let (watcher, store) = watcher(&source).await;
        let cancel = CancellationToken::new();
        watcher.check_release(&cancel).await.unwrap();
        let before = store.get("20230101-x86").await.unwrap();
        assert_eq!(watcher.check_release(&cancel).await.unwrap(), 0);
        assert_eq!(store.get("20230101-x86").await.unwrap(), before);
        assert_eq!(store.keys().await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_one_failure_writes_nothing() {
        let source = source();
        source.fail(Platform::X86).await;
        let (watcher, store) = watcher(&source).await;
        let err = watcher.check_release(&CancellationToken::new()).await.unwrap_err();
        assert_eq!(*err, ErrorKind::Fetch(Platform::X86));
        assert!(store.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_manifest_aborts_cycle() {
        let source = source();
        let bad = MockSource::manifest(Platform::Arm, "20230101", [("9.0", &["huge"][..])]);
        source.set_manifest(Platform::Arm, bad).await;
        let (watcher, store) = watcher(&source).await;
        let err = watcher.check_release(&CancellationToken::new()).await.unwrap_err();
        assert_eq!(*err, ErrorKind::Parse(Platform::Arm));
        assert!(store.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_interrupts_fetches() {
        let source = Arc::new(
            MockSource::with_release("20230101", [("9.0", PICO)]).with_delay(Duration::from_secs(30)),
        );
        let (watcher, store) = watcher(&source).await;
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });
        let outcome = tokio::time::timeout(Duration::from_secs(5), watcher.check_release(&cancel)).await;
        let err = outcome.expect("cancelled cycle should return promptly").unwrap_err();
        assert_eq!(*err, ErrorKind::Cancelled);
        assert!(store.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_fails_cycle() {
        let source = source();
        let (watcher, store) = watcher(&source).await;
        store.close(false, Duration::from_secs(1)).await.unwrap();
        let err = watcher.check_release(&CancellationToken::new()).await.unwrap_err();
        assert_eq!(*err, ErrorKind::Store);
    }

    async fn wait_for_status(status: &mut watch::Receiver<PollStatus>, expected: PollStatus) {
        let reached = tokio::time::timeout(Duration::from_secs(5), status.wait_for(|s| *s == expected)).await;
        assert!(matches!(reached, Ok(Ok(_))), "never reached {expected:?}");
    }

    #[tokio::test]
    async fn test_started_watcher_reports_status() {
        let source = source();
        let (watcher, store) = watcher(&source).await;
        let mut status = watcher.status();
        assert_eq!(*status.borrow(), PollStatus::Idle);

        let cancel = CancellationToken::new();
        let handle = watcher.start(cancel.clone());
        wait_for_status(&mut status, PollStatus::Success { written: 4 }).await;
        assert_eq!(store.keys().await.unwrap().len(), 4);

        // Later cycles keep polling but find nothing new.
        wait_for_status(&mut status, PollStatus::Success { written: 0 }).await;
        assert!(source.calls() >= 8);

        cancel.cancel();
        handle.await.unwrap();
        assert_eq!(*status.borrow(), PollStatus::Idle);
    }

    #[tokio::test]
    async fn test_failed_cycle_status_then_recovery() {
        let source = source();
        source.fail(Platform::Arm64).await;
        let (watcher, store) = watcher(&source).await;
        let mut status = watcher.status();
        let cancel = CancellationToken::new();
        let handle = watcher.start(cancel.clone());

        wait_for_status(&mut status, PollStatus::Failed).await;
        assert!(store.keys().await.unwrap().is_empty());

        source.recover(Platform::Arm64).await;
        wait_for_status(&mut status, PollStatus::Success { written: 4 }).await;

        cancel.cancel();
        handle.await.unwrap();
    }
}
