//! Store connection management and raw key-value access.

use exn::ResultExt;
use sqlx::SqliteConnection;
use sqlx::pool::PoolConnectionMetadata;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::instrument;

use crate::error::{ErrorKind, Result};

/// Embedded migrations that are run automatically on open.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
// One writer at a time under WAL; the rest are readers.
const MAX_CONNECTIONS: u32 = 4;
const IN_MEMORY_TIMEOUT: Duration = Duration::from_secs(1);

/// Single ordered key-value namespace backed by an SQLite file.
///
/// Every call is its own transaction. A sequence of [`Store::keys`] followed
/// by [`Store::get`] may observe writes made in between, so callers must
/// treat [`ErrorKind::NotFound`] and [`ErrorKind::NilValue`] as ordinary
/// outcomes.
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
    path: Option<PathBuf>,
}

impl Store {
    async fn new(options: SqliteConnectOptions, max: u32, timeout: Duration, path: Option<PathBuf>) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            // Apply the query-based PRAGMAs to every pooled connection, not only the first.
            .after_connect(|conn, meta| Box::pin(async move { Self::apply_pragmas(conn, meta).await }))
            .max_connections(max)
            .acquire_timeout(timeout)
            .connect_with(options)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let store = Self { pool, path };
        store.migrate().await?;
        Ok(store)
    }

    /// Open (or create) the store file at `path`.
    ///
    /// Fails with [`ErrorKind::Open`] if the file can't be opened and
    /// migrated within `timeout`, e.g. because another process holds it.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub async fn open(path: impl AsRef<Path>, timeout: Duration) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let options = Self::base_options(timeout).filename(&path).create_if_missing(true);
        let opening = Self::new(options, MAX_CONNECTIONS, timeout, Some(path.clone()));
        let store = tokio::time::timeout(timeout, opening)
            .await
            .or_raise(|| ErrorKind::Open(path.clone()))?
            .or_raise(|| ErrorKind::Open(path.clone()))?;
        tracing::debug!("store opened");
        Ok(store)
    }

    /// Open an in-memory store (useful for testing).
    ///
    /// Not gated behind `#[cfg(test)]` so that other crates can use it in their tests.
    pub async fn open_in_memory() -> Result<Self> {
        let options = Self::base_options(IN_MEMORY_TIMEOUT).filename(":memory:");
        // Each in-memory connection is its own database, so stick to exactly one.
        Self::new(options, 1, IN_MEMORY_TIMEOUT, None).await
    }

    fn base_options(timeout: Duration) -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            // Waiting on a lock held by another writer counts against the open timeout.
            .busy_timeout(timeout)
            .auto_vacuum(sqlx::sqlite::SqliteAutoVacuum::None)
    }

    async fn apply_pragmas(conn: &mut SqliteConnection, _meta: PoolConnectionMetadata) -> sqlx::Result<()> {
        sqlx::query(
            r#"
                PRAGMA locking_mode = NORMAL;
                PRAGMA wal_autocheckpoint = 800;
                PRAGMA temp_store = MEMORY;
            "#,
        )
        .execute(conn)
        .await?;
        Ok(())
    }

    #[instrument("performing store migrations", skip(self))]
    async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await.or_raise(|| ErrorKind::Migration)
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Backing file, or `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Every key holding a non-nil value, in ascending byte order.
    #[instrument(level = "trace", skip(self))]
    pub async fn keys(&self) -> Result<Vec<String>> {
        sqlx::query_scalar(include_str!("../queries/keys.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)
    }

    /// Point lookup, distinguishing a missing key from a nil value.
    #[instrument(level = "trace", skip(self))]
    pub async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let row: Option<Option<Vec<u8>>> = sqlx::query_scalar(include_str!("../queries/get.sql"))
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        match row {
            None => exn::bail!(ErrorKind::NotFound(key.to_string())),
            Some(None) => exn::bail!(ErrorKind::NilValue(key.to_string())),
            Some(Some(value)) if value.is_empty() => exn::bail!(ErrorKind::NilValue(key.to_string())),
            Some(Some(value)) => Ok(value),
        }
    }

    /// Every non-nil entry whose key ends with `suffix`, in scan order.
    ///
    /// An empty suffix returns everything.
    #[instrument(level = "trace", skip(self))]
    pub async fn get_by_suffix(&self, suffix: &str) -> Result<Vec<(String, Vec<u8>)>> {
        let rows: Vec<(String, Vec<u8>)> = sqlx::query_as(include_str!("../queries/scan.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(rows.into_iter().filter(|(key, _)| key.ends_with(suffix)).collect())
    }

    /// Insert or replace the value under `key`.
    #[instrument(level = "debug", skip(self, value), fields(len = value.len()))]
    pub async fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        sqlx::query(include_str!("../queries/put.sql"))
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    /// Write `value` only when `key` is missing or nil. Returns whether a write happened.
    #[instrument(level = "debug", skip(self, value), fields(len = value.len()))]
    pub async fn put_if_vacant(&self, key: &str, value: &[u8]) -> Result<bool> {
        let result = sqlx::query(include_str!("../queries/put_if_vacant.sql"))
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query(include_str!("../queries/delete.sql"))
            .bind(key)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    /// Drop every entry in the namespace. Returns how many were removed.
    #[instrument(skip(self))]
    pub async fn purge(&self) -> Result<u64> {
        let result = sqlx::query(include_str!("../queries/purge.sql"))
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        tracing::info!(removed = result.rows_affected(), "store purged");
        Ok(result.rows_affected())
    }

    /// Close every connection, giving up after `timeout`.
    ///
    /// With `delete_file`, the backing file and its WAL sidecars are removed
    /// once the pool is closed.
    #[instrument(skip(self))]
    pub async fn close(&self, delete_file: bool, timeout: Duration) -> Result<()> {
        let closing = async {
            // Let SQLite update query planner statistics
            _ = sqlx::query("PRAGMA optimize").execute(&self.pool).await;
            self.pool.close().await;
        };
        tokio::time::timeout(timeout, closing).await.or_raise(|| ErrorKind::CloseTimeout)?;
        tracing::debug!("store closed");
        if let (true, Some(path)) = (delete_file, &self.path) {
            for file in [path.clone(), sidecar(path, "-wal"), sidecar(path, "-shm")] {
                match tokio::fs::remove_file(&file).await {
                    Ok(()) => {},
                    Err(err) if err.kind() == IoErrorKind::NotFound => {},
                    Err(err) => return Err(err).or_raise(|| ErrorKind::Remove(file)),
                }
            }
        }
        Ok(())
    }
}

fn sidecar(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}
