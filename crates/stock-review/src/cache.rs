//! Process-wide ticker to filer identifier cache

use cached::{Cached, TimedSizedCache};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// Thread-safe, time-bounded and size-bounded CIK cache
///
/// Cloning yields another handle onto the same storage, so one cache can be
/// shared by every request-scoped filings client.
#[derive(Clone)]
pub struct CikCache {
    cache: Arc<RwLock<TimedSizedCache<String, String>>>,
}

impl CikCache {
    /// Create a new cache holding at most `capacity` entries for `ttl` each
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            cache: Arc::new(RwLock::new(TimedSizedCache::with_size_and_lifespan(
                capacity.max(1),
                ttl,
            ))),
        }
    }

    /// Look up the identifier for an upper-case ticker
    pub async fn get(&self, ticker: &str) -> Option<String> {
        let mut cache = self.cache.write().await;
        let hit = cache.cache_get(ticker).cloned();
        debug!(ticker, hit = hit.is_some(), "CIK cache lookup");
        hit
    }

    /// Insert or refresh one entry
    pub async fn insert(&self, ticker: impl Into<String>, cik: impl Into<String>) {
        let mut cache = self.cache.write().await;
        let _ = cache.cache_set(ticker.into(), cik.into());
    }

    /// Insert many entries under a single lock acquisition
    pub async fn insert_many<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut cache = self.cache.write().await;
        for (ticker, cik) in entries {
            let _ = cache.cache_set(ticker, cik);
        }
    }

    /// Number of stored entries (expired ones may still be counted)
    pub async fn len(&self) -> usize {
        self.cache.read().await.cache_size()
    }

    /// Whether the cache holds no entries
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Remove every entry
    pub async fn clear(&self) {
        self.cache.write().await.cache_clear();
    }
}

impl std::fmt::Debug for CikCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CikCache").finish_non_exhaustive()
    }
}
