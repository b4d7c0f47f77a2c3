use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::Fingerprint;
use crate::error::{ErrorKind, Result};

#[derive(Debug)]
struct Entry {
    value: Arc<[u8]>,
    /// Insertion sequence; with `expires_at`, the key into the expiry index.
    seq: u64,
    expires_at: Instant,
    /// Last access tick; key into the recency index.
    touched: u64,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<Fingerprint, Entry>,
    /// Access tick to key, least recently used first.
    recency: BTreeMap<u64, Fingerprint>,
    /// Expiry instant and insertion sequence to key, soonest first. Holds exactly one slot per entry.
    expiry: BTreeMap<(Instant, u64), Fingerprint>,
    tick: u64,
}
impl Inner {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn unlink(&mut self, key: &Fingerprint) -> Option<Entry> {
        let entry = self.entries.remove(key)?;
        self.recency.remove(&entry.touched);
        self.expiry.remove(&(entry.expires_at, entry.seq));
        Some(entry)
    }

    /// Drop every entry due at `now`. Returns how many were dropped.
    fn expire(&mut self, now: Instant) -> usize {
        let mut expired = 0;
        while let Some(entry) = self.expiry.first_entry() {
            if entry.key().0 > now {
                break;
            }
            let key = entry.remove();
            if self.unlink(&key).is_some() {
                expired += 1;
            }
        }
        expired
    }
}

/// Bounded response cache with least-recently-used eviction and a fixed TTL.
///
/// Both limits apply independently: an entry leaves when it is the least
/// recently used one at capacity, or when its TTL runs out, whichever comes
/// first. Reads refresh recency but never extend the TTL.
#[derive(Debug)]
pub struct ResponseCache {
    inner: Mutex<Inner>,
    capacity: usize,
    ttl: Duration,
}
impl ResponseCache {
    pub fn new(capacity: usize, ttl: Duration) -> Result<Self> {
        if capacity == 0 {
            exn::bail!(ErrorKind::InvalidConfig("capacity"));
        }
        if ttl.is_zero() {
            exn::bail!(ErrorKind::InvalidConfig("ttl"));
        }
        Ok(Self { inner: Mutex::default(), capacity, ttl })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Insert or replace `key`, restarting its TTL.
    pub fn add(&self, key: Fingerprint, value: impl Into<Arc<[u8]>>) {
        let now = Instant::now();
        let mut inner = self.lock();
        inner.expire(now);
        inner.unlink(&key);
        let seq = inner.next_tick();
        let expires_at = now + self.ttl;
        inner.entries.insert(key, Entry { value: value.into(), seq, expires_at, touched: seq });
        inner.recency.insert(seq, key);
        inner.expiry.insert((expires_at, seq), key);
        while inner.entries.len() > self.capacity {
            let Some(&lru) = inner.recency.values().next() else {
                break;
            };
            inner.unlink(&lru);
            tracing::trace!(key = %lru, "evicted least recently used entry");
        }
    }

    pub fn get(&self, key: &Fingerprint) -> Option<Arc<[u8]>> {
        let mut inner = self.lock();
        inner.expire(Instant::now());
        let touched = inner.next_tick();
        let entry = inner.entries.get_mut(key)?;
        let previous = std::mem::replace(&mut entry.touched, touched);
        let value = Arc::clone(&entry.value);
        inner.recency.remove(&previous);
        inner.recency.insert(touched, *key);
        Some(value)
    }

    pub fn remove(&self, key: &Fingerprint) -> bool {
        self.lock().unlink(key).is_some()
    }

    pub fn clear(&self) {
        *self.lock() = Inner::default();
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let mut inner = self.lock();
        inner.expire(Instant::now());
        inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry whose TTL has run out. Returns how many were dropped.
    pub fn sweep(&self) -> usize {
        self.lock().expire(Instant::now())
    }

    /// Run [`ResponseCache::sweep`] every `period` until `cancel` fires.
    pub fn spawn_sweeper(self: &Arc<Self>, period: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => {
                        let swept = cache.sweep();
                        if swept > 0 {
                            tracing::debug!(swept, "expired cache entries");
                        }
                    },
                }
            }
        })
    }
}
