//! Latest-enabled-record resolution.

use pkgapi_models::Platform;
use tracing::instrument;

use crate::error::Result;
use crate::{Store, StoreKey, StoredRecord};

/// Keys in `keys` that belong to `platform`, newest first.
fn candidates(keys: &[String], platform: Platform) -> Vec<StoreKey> {
    let mut candidates: Vec<StoreKey> = keys
        .iter()
        .filter_map(|key| match key.parse::<StoreKey>() {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                tracing::trace!(key = %key, error = %err, "skipping foreign key");
                None
            },
        })
        .filter(|key| key.platform == platform)
        .collect();
    candidates.sort_unstable_by(|a, b| b.cmp(a));
    candidates
}

impl Store {
    /// Newest record for `platform` that isn't disabled.
    ///
    /// `keys` is a listing previously taken with [`Store::keys`]. Keys that
    /// were removed or nilled since then are skipped, as are disabled
    /// records. Returns `None` when no enabled record remains.
    #[instrument(level = "debug", skip(self, keys), fields(keys = keys.len()))]
    pub async fn latest_enabled(
        &self,
        keys: &[String],
        platform: Platform,
    ) -> Result<Option<(StoreKey, StoredRecord)>> {
        for key in candidates(keys, platform) {
            let name = key.to_string();
            let bytes = match self.get(&name).await {
                Ok(bytes) => bytes,
                Err(err) if err.is_missing() => {
                    tracing::debug!(key = %name, "candidate vanished since listing");
                    continue;
                },
                Err(err) => return Err(err),
            };
            let record = StoredRecord::from_slice(&name, &bytes)?;
            if record.disabled {
                tracing::trace!(key = %name, "skipping disabled record");
                continue;
            }
            return Ok(Some((key, record)));
        }
        Ok(None)
    }

    /// Lists the keys and resolves `platform` in one go.
    pub async fn latest(&self, platform: Platform) -> Result<Option<(StoreKey, StoredRecord)>> {
        let keys = self.keys().await?;
        self.latest_enabled(&keys, platform).await
    }
}

#[cfg(test)]
mod tests {
    use pkgapi_models::ArchRecord;

    use super::*;

    async fn seed(store: &Store, key: &str, disabled: bool) {
        let key: StoreKey = key.parse().unwrap();
        let mut record = StoredRecord::new(ArchRecord::new(key.date));
        record.disabled = disabled;
        store.put(&key.to_string(), &record.to_vec().unwrap()).await.unwrap();
    }

    #[test]
    fn test_candidates_filter_and_order() {
        let keys: Vec<String> =
            ["20221201-arm", "20230101-arm", "20230101-arm64", "garbage", "20230201-x86", "20220101-arm"]
                .map(String::from)
                .to_vec();
        let found: Vec<_> = candidates(&keys, Platform::Arm).iter().map(ToString::to_string).collect();
        assert_eq!(found, ["20230101-arm", "20221201-arm", "20220101-arm"]);
    }

    #[tokio::test]
    async fn test_skips_disabled_newer_record() {
        let store = Store::open_in_memory().await.unwrap();
        seed(&store, "20230101-arm", true).await;
        seed(&store, "20221201-arm", false).await;
        let (key, record) = store.latest(Platform::Arm).await.unwrap().unwrap();
        assert_eq!(key.to_string(), "20221201-arm");
        assert_eq!(record.record.date, "20221201");
    }

    #[tokio::test]
    async fn test_all_disabled_is_none() {
        let store = Store::open_in_memory().await.unwrap();
        seed(&store, "20230101-arm", true).await;
        seed(&store, "20221201-arm", true).await;
        seed(&store, "20230101-x86", false).await;
        assert!(store.latest(Platform::Arm).await.unwrap().is_none());
        assert!(store.latest(Platform::Arm64).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_many_consecutive_disabled() {
        let store = Store::open_in_memory().await.unwrap();
        seed(&store, "20200101-x86_64", false).await;
        for day in 1..=28 {
            seed(&store, &format!("202102{day:02}-x86_64"), true).await;
        }
        let (key, _) = store.latest(Platform::X86_64).await.unwrap().unwrap();
        assert_eq!(key.to_string(), "20200101-x86_64");
    }

    #[tokio::test]
    async fn test_vanished_key_is_skipped() {
        let store = Store::open_in_memory().await.unwrap();
        seed(&store, "20230101-arm", false).await;
        seed(&store, "20221201-arm", false).await;
        let keys = store.keys().await.unwrap();
        store.delete("20230101-arm").await.unwrap();
        let (key, _) = store.latest_enabled(&keys, Platform::Arm).await.unwrap().unwrap();
        assert_eq!(key.to_string(), "20221201-arm");
    }

    #[tokio::test]
    async fn test_corrupt_record_is_an_error() {
        let store = Store::open_in_memory().await.unwrap();
        store.put("20230101-arm", b"not json").await.unwrap();
        let err = store.latest(Platform::Arm).await.unwrap_err();
        assert!(matches!(&*err, crate::ErrorKind::InvalidData(_)));
    }
}
