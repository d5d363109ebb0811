//! Cache abstraction for provider results
//!
//! The pipeline only needs "get by key", "set with TTL", "miss returns
//! absent". Keys are opaque strings built by [`cache_key`]; values are JSON
//! so `StockInfo`, `FinancialMetrics` and computed valuations all round-trip
//! through the same store.

use async_trait::async_trait;
use cached::{CanExpire, Cached, ExpiringValueCache};
use fairval_core::error::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Build the canonical cache key for a provider operation.
///
/// Format: `"{provider_name}:{operation}:{TICKER_UPPER}"`. The ticker is
/// case-normalized so "aapl" and "AAPL" share an entry.
pub fn cache_key(provider: &str, operation: &str, ticker: &str) -> String {
    format!("{provider}:{operation}:{}", ticker.to_uppercase())
}

/// Key-value store with per-entry TTL.
///
/// Implementations may be backed by anything reachable over I/O, so both
/// operations can fail; callers in this workspace always swallow those
/// failures (a broken cache must never break a request).
#[async_trait]
pub trait ValuationCache: Send + Sync {
    /// Look up a value. Expired or absent entries return `Ok(None)`.
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>>;

    /// Store a value for `ttl`.
    async fn set(&self, key: &str, value: serde_json::Value, ttl: Duration) -> Result<()>;
}

#[derive(Debug, Clone)]
struct ExpiringEntry {
    value: serde_json::Value,
    expires_at: Instant,
}

impl CanExpire for ExpiringEntry {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// In-process cache with per-entry expiry.
///
/// Bounded in size; least-recently-used entries are evicted once `capacity`
/// is reached. Cloning shares the underlying store.
pub struct MemoryCache {
    inner: Arc<RwLock<ExpiringValueCache<String, ExpiringEntry>>>,
}

impl MemoryCache {
    /// Create a cache holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ExpiringValueCache::with_size(capacity))),
        }
    }

    /// Number of live entries (expired entries may still be counted until
    /// their next lookup).
    pub async fn len(&self) -> usize {
        let cache = self.inner.read().await;
        cache.cache_size()
    }

    /// Whether the cache currently holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop all entries.
    pub async fn clear(&self) {
        let mut cache = self.inner.write().await;
        cache.cache_clear();
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        // Plenty for a per-ticker working set
        Self::new(10_000)
    }
}

impl Clone for MemoryCache {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl ValuationCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let mut cache = self.inner.write().await;
        Ok(cache
            .cache_get(&key.to_string())
            .map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: serde_json::Value, ttl: Duration) -> Result<()> {
        let entry = ExpiringEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        let mut cache = self.inner.write().await;
        let _ = cache.cache_set(key.to_string(), entry);
        Ok(())
    }
}
