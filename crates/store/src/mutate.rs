//! Ingestion, enable/disable and history over stored records.

use exn::ResultExt;
use pkgapi_models::{ArchRecord, Platform, ReleaseDate};
use tracing::instrument;

use crate::error::{ErrorKind, Result};
use crate::{Store, StoreKey, StoredRecord};

impl Store {
    /// Persist a freshly discovered release.
    ///
    /// Written only when the key is missing or nil; an existing record is
    /// never overwritten, so repeated ingestion keeps the original timestamp.
    /// Returns whether a write happened.
    #[instrument(level = "debug", skip(self, record), fields(key = %key))]
    pub async fn ingest(&self, key: &StoreKey, record: ArchRecord) -> Result<bool> {
        let stored = StoredRecord::new(record);
        let written = self.put_if_vacant(&key.to_string(), &stored.to_vec()?).await?;
        if written {
            tracing::info!(key = %key, ts = stored.ts, "ingested release");
        }
        Ok(written)
    }

    /// Set the `disabled` flag on every record for `date`, optionally limited to one platform.
    ///
    /// All matching records are rewritten inside a single transaction: if any
    /// of them fails to decode or write, none of them change. Returns how many
    /// records matched; no match at all is [`ErrorKind::NotFound`].
    #[instrument(skip(self))]
    pub async fn set_disabled(&self, date: ReleaseDate, platform: Option<Platform>, disabled: bool) -> Result<usize> {
        let prefix = StoreKey::prefix(date, platform);
        // Take the write lock up front: a deferred transaction that reads and then writes fails
        // outright with SQLITE_BUSY_SNAPSHOT if another writer commits in between.
        let mut tx = self.pool().begin_with("BEGIN IMMEDIATE").await.or_raise(|| ErrorKind::Database)?;
        let rows: Vec<(String, Vec<u8>)> = sqlx::query_as(include_str!("../queries/scan_prefix.sql"))
            .bind(&prefix)
            .fetch_all(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        // A platform-scoped prefix is the whole key; "-arm" must not pick up "-arm64".
        let rows: Vec<_> = rows.into_iter().filter(|(key, _)| platform.is_none() || *key == prefix).collect();
        if rows.is_empty() {
            exn::bail!(ErrorKind::NotFound(prefix));
        }
        for (key, bytes) in &rows {
            let mut record = StoredRecord::from_slice(key, bytes)?;
            record.disabled = disabled;
            sqlx::query(include_str!("../queries/put.sql"))
                .bind(key)
                .bind(record.to_vec()?)
                .execute(&mut *tx)
                .await
                .or_raise(|| ErrorKind::Database)?;
        }
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        tracing::info!(prefix = %prefix, disabled, count = rows.len(), "updated release records");
        Ok(rows.len())
    }

    /// Every stored record, optionally for one platform, oldest ingestion first.
    #[instrument(level = "debug", skip(self))]
    pub async fn history(&self, platform: Option<Platform>) -> Result<Vec<(StoreKey, StoredRecord)>> {
        let suffix = platform.map(|p| format!("-{p}")).unwrap_or_default();
        let mut history = Vec::new();
        for (name, bytes) in self.get_by_suffix(&suffix).await? {
            let Ok(key) = name.parse::<StoreKey>() else {
                tracing::warn!(key = %name, "skipping foreign key in history");
                continue;
            };
            history.push((key, StoredRecord::from_slice(&name, &bytes)?));
        }
        history.sort_by(|(ka, a), (kb, b)| a.ts.cmp(&b.ts).then_with(|| ka.cmp(kb)));
        Ok(history)
    }
}
