//! Caching decorator around a provider
//!
//! Explicit wrapper object rather than an annotation on each method, so the
//! cache-failure policy is visible and testable in isolation: a cache-read
//! error is a miss, a cache-write error is logged and ignored. Either way the
//! caller gets a correct answer; a broken cache only costs the performance
//! benefit.

use crate::cache::{ValuationCache, cache_key};
use crate::provider::FinancialDataProvider;
use async_trait::async_trait;
use fairval_core::error::Result;
use fairval_core::types::{FinancialMetrics, StockInfo};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Cache operation names, fixed so keys stay deterministic
const OP_STOCK_INFO: &str = "stock_info";
const OP_FINANCIAL_METRICS: &str = "financial_metrics";

/// A [`FinancialDataProvider`] that consults a [`ValuationCache`] before
/// delegating to the wrapped provider.
pub struct CachedProvider {
    inner: Arc<dyn FinancialDataProvider>,
    cache: Arc<dyn ValuationCache>,
    ttl_stock_info: Duration,
    ttl_metrics: Duration,
}

impl CachedProvider {
    pub fn new(
        inner: Arc<dyn FinancialDataProvider>,
        cache: Arc<dyn ValuationCache>,
        ttl_stock_info: Duration,
        ttl_metrics: Duration,
    ) -> Self {
        Self {
            inner,
            cache,
            ttl_stock_info,
            ttl_metrics,
        }
    }

    /// Serve `operation` for `ticker` from the cache, falling back to
    /// `fetch` on any miss, decode failure or cache error.
    async fn get_or_fetch<T, F, Fut>(
        &self,
        operation: &str,
        ticker: &str,
        ttl: Duration,
        fetch: F,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut + Send,
        Fut: std::future::Future<Output = Result<T>> + Send,
    {
        let key = cache_key(self.inner.name(), operation, ticker);

        match self.cache.get(&key).await {
            Ok(Some(value)) => match serde_json::from_value::<T>(value) {
                Ok(decoded) => {
                    debug!(%key, "cache hit");
                    return Ok(decoded);
                }
                Err(e) => {
                    // Stale schema in the cache; refetch
                    warn!(%key, error = %e, "cached value failed to decode, treating as miss");
                }
            },
            Ok(None) => debug!(%key, "cache miss"),
            Err(e) => warn!(%key, error = %e, "cache read failed, treating as miss"),
        }

        let fresh = fetch().await?;

        match serde_json::to_value(&fresh) {
            Ok(value) => {
                if let Err(e) = self.cache.set(&key, value, ttl).await {
                    warn!(%key, error = %e, "cache write failed, returning fresh value");
                }
            }
            Err(e) => warn!(%key, error = %e, "failed to serialize value for caching"),
        }

        Ok(fresh)
    }
}

#[async_trait]
impl FinancialDataProvider for CachedProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn get_stock_info(&self, ticker: &str) -> Result<StockInfo> {
        self.get_or_fetch(OP_STOCK_INFO, ticker, self.ttl_stock_info, || {
            self.inner.get_stock_info(ticker)
        })
        .await
    }

    async fn get_financial_metrics(&self, ticker: &str) -> Result<FinancialMetrics> {
        self.get_or_fetch(OP_FINANCIAL_METRICS, ticker, self.ttl_metrics, || {
            self.inner.get_financial_metrics(ticker)
        })
        .await
    }
}
