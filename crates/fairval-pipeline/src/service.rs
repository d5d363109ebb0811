//! Valuation pipeline orchestration
//!
//! Resolves a provider, fetches stock info and cash-flow metrics through the
//! caching layer, validates the DCF inputs and invokes the engine. Any
//! failure along the way aborts the pipeline and surfaces the originating
//! error unmodified; there are no partial results.

use fairval_core::config::{ProviderKind, ValuationConfig};
use fairval_core::error::Result;
use fairval_core::types::{
    DcfInputs, FinancialMetrics, IntrinsicValue, StockInfo, normalize_ticker,
};
use fairval_providers::{
    AlphaVantageProvider, CachedProvider, FinancialDataProvider, MemoryCache, ValuationCache,
    YahooProvider, cache_key,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Cache operation name for computed valuations
const OP_INTRINSIC_VALUE: &str = "intrinsic_value";

/// Per-field overrides merged over the default assumption set
/// (8% growth, 10% discount, 2% terminal, 5-year horizon).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DcfAssumptionOverrides {
    pub growth_rate: Option<f64>,
    pub discount_rate: Option<f64>,
    pub terminal_growth_rate: Option<f64>,
    pub projection_years: Option<u32>,
}

impl DcfAssumptionOverrides {
    /// Whether every field is left at its default.
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    /// Merge over the defaults and validate against a base free cash flow.
    pub fn into_inputs(self, base_free_cash_flow: f64) -> Result<DcfInputs> {
        DcfInputs::new(
            self.growth_rate
                .unwrap_or(fairval_core::types::DEFAULT_GROWTH_RATE),
            self.discount_rate
                .unwrap_or(fairval_core::types::DEFAULT_DISCOUNT_RATE),
            self.terminal_growth_rate
                .unwrap_or(fairval_core::types::DEFAULT_TERMINAL_GROWTH_RATE),
            self.projection_years
                .unwrap_or(fairval_core::types::DEFAULT_PROJECTION_YEARS),
            base_free_cash_flow,
        )
    }
}

/// The valuation pipeline.
///
/// Holds a (cache-wrapped) provider and the cache handle for computed
/// results. Both are injected; nothing here reaches for process-global
/// state.
pub struct ValuationService {
    provider: Arc<dyn FinancialDataProvider>,
    cache: Arc<dyn ValuationCache>,
    config: Arc<ValuationConfig>,
}

impl ValuationService {
    /// Compose a service from explicit parts. The provider is used as given;
    /// wrap it in [`CachedProvider`] yourself if fetch-level caching is
    /// wanted.
    pub fn new(
        provider: Arc<dyn FinancialDataProvider>,
        cache: Arc<dyn ValuationCache>,
        config: Arc<ValuationConfig>,
    ) -> Self {
        Self {
            provider,
            cache,
            config,
        }
    }

    /// Compose the default stack from configuration: concrete provider by
    /// [`ProviderKind`], shared in-process cache, fetch-level caching
    /// decorator.
    pub fn from_config(config: ValuationConfig) -> Result<Self> {
        config.validate()?;

        let inner: Arc<dyn FinancialDataProvider> = match config.provider {
            ProviderKind::Yahoo => Arc::new(YahooProvider::new(config.request_timeout)?),
            ProviderKind::AlphaVantage => {
                let api_key = config.alpha_vantage_api_key.clone().ok_or_else(|| {
                    fairval_core::error::ValuationError::Config(
                        "Alpha Vantage API key required".to_string(),
                    )
                })?;
                Arc::new(AlphaVantageProvider::new(
                    api_key,
                    config.alpha_vantage_rate_limit,
                    config.request_timeout,
                )?)
            }
        };

        let cache: Arc<dyn ValuationCache> = Arc::new(MemoryCache::default());
        let provider = Arc::new(CachedProvider::new(
            inner,
            Arc::clone(&cache),
            config.cache_ttl_stock_info,
            config.cache_ttl_metrics,
        ));

        Ok(Self {
            provider,
            cache,
            config: Arc::new(config),
        })
    }

    /// Identity of the underlying data provider.
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Fetch descriptive stock info for a ticker.
    pub async fn get_stock_info(&self, ticker: &str) -> Result<StockInfo> {
        let ticker = normalize_ticker(ticker)?;
        self.provider.get_stock_info(&ticker).await
    }

    /// Fetch free-cash-flow metrics for a ticker.
    pub async fn get_financial_metrics(&self, ticker: &str) -> Result<FinancialMetrics> {
        let ticker = normalize_ticker(ticker)?;
        self.provider.get_financial_metrics(&ticker).await
    }

    /// Run the full pipeline with the default assumption set.
    pub async fn calculate_intrinsic_value(&self, ticker: &str) -> Result<IntrinsicValue> {
        self.calculate_intrinsic_value_with(ticker, DcfAssumptionOverrides::default())
            .await
    }

    /// Run the full pipeline with assumption overrides.
    ///
    /// Results computed under the default assumptions are cached for the
    /// configured valuation TTL; overridden runs always recompute, since the
    /// cache key identifies only {provider, operation, ticker}.
    pub async fn calculate_intrinsic_value_with(
        &self,
        ticker: &str,
        overrides: DcfAssumptionOverrides,
    ) -> Result<IntrinsicValue> {
        let ticker = normalize_ticker(ticker)?;
        let key = cache_key(self.provider.name(), OP_INTRINSIC_VALUE, &ticker);

        if overrides.is_default() {
            match self.cache.get(&key).await {
                Ok(Some(value)) => match serde_json::from_value::<IntrinsicValue>(value) {
                    Ok(cached) => {
                        debug!(%key, "valuation cache hit");
                        return Ok(cached);
                    }
                    Err(e) => warn!(%key, error = %e, "cached valuation failed to decode"),
                },
                Ok(None) => debug!(%key, "valuation cache miss"),
                Err(e) => warn!(%key, error = %e, "valuation cache read failed"),
            }
        }

        // Independent fetches; issued concurrently, correctness does not
        // depend on it
        let (stock_info, metrics) = tokio::join!(
            self.provider.get_stock_info(&ticker),
            self.provider.get_financial_metrics(&ticker)
        );
        let stock_info = stock_info?;
        let metrics = metrics?;

        let inputs = overrides.into_inputs(metrics.free_cash_flow)?;
        let result = fairval_engine::intrinsic_value(&inputs, stock_info.current_price)?;

        info!(
            ticker,
            intrinsic_value = result.intrinsic_value,
            current_price = result.current_price,
            upside = result.upside,
            valuation = %result.valuation,
            "valuation complete"
        );

        if overrides.is_default() {
            match serde_json::to_value(&result) {
                Ok(value) => {
                    if let Err(e) = self
                        .cache
                        .set(&key, value, self.config.cache_ttl_valuation)
                        .await
                    {
                        warn!(%key, error = %e, "valuation cache write failed");
                    }
                }
                Err(e) => warn!(%key, error = %e, "failed to serialize valuation for caching"),
            }
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use fairval_core::error::ValuationError;
    use fairval_core::types::ValuationLabel;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct ScriptedProvider {
        price: f64,
        fcf: f64,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new(price: f64, fcf: f64) -> Self {
            Self {
                price,
                fcf,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl FinancialDataProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn get_stock_info(&self, ticker: &str) -> Result<StockInfo> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(StockInfo {
                ticker: ticker.to_string(),
                name: "Scripted Corp".to_string(),
                current_price: self.price,
                currency: "USD".to_string(),
                sector: "Technology".to_string(),
                industry: "Software".to_string(),
            })
        }

        async fn get_financial_metrics(&self, _ticker: &str) -> Result<FinancialMetrics> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(FinancialMetrics {
                free_cash_flow: self.fcf,
                fiscal_year_end: "2024-12-31".to_string(),
            })
        }
    }

    struct FailingCache;

    #[async_trait]
    impl ValuationCache for FailingCache {
        async fn get(&self, _key: &str) -> Result<Option<serde_json::Value>> {
            Err(ValuationError::Cache("backend unreachable".to_string()))
        }

        async fn set(
            &self,
            _key: &str,
            _value: serde_json::Value,
            _ttl: Duration,
        ) -> Result<()> {
            Err(ValuationError::Cache("backend unreachable".to_string()))
        }
    }

    fn service(provider: Arc<dyn FinancialDataProvider>) -> ValuationService {
        ValuationService::new(
            provider,
            Arc::new(MemoryCache::new(64)),
            Arc::new(ValuationConfig::default()),
        )
    }

    #[tokio::test]
    async fn test_pipeline_labels_rich_price_overvalued() {
        let svc = service(Arc::new(ScriptedProvider::new(10_000_000.0, 1_000_000.0)));
        let result = svc.calculate_intrinsic_value("AAPL").await.unwrap();

        assert_eq!(result.valuation, ValuationLabel::Overvalued);
        assert!(result.upside < 0.0);
        assert_eq!(result.calculation_rows.len(), 5);
        assert_eq!(result.methodology, "DCF");
    }

    #[tokio::test]
    async fn test_pipeline_labels_cheap_price_undervalued() {
        let svc = service(Arc::new(ScriptedProvider::new(1_000_000.0, 1_000_000.0)));
        let result = svc.calculate_intrinsic_value("AAPL").await.unwrap();
        assert_eq!(result.valuation, ValuationLabel::Undervalued);
        assert!(result.upside > 0.0);
    }

    #[tokio::test]
    async fn test_default_valuation_is_cached() {
        let provider = Arc::new(ScriptedProvider::new(10_000_000.0, 1_000_000.0));
        let svc = service(Arc::clone(&provider) as Arc<dyn FinancialDataProvider>);

        let first = svc.calculate_intrinsic_value("AAPL").await.unwrap();
        let calls_after_first = provider.calls();
        let second = svc.calculate_intrinsic_value("AAPL").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(provider.calls(), calls_after_first);
    }

    #[tokio::test]
    async fn test_overridden_valuation_bypasses_cache() {
        let provider = Arc::new(ScriptedProvider::new(10_000_000.0, 1_000_000.0));
        let svc = service(Arc::clone(&provider) as Arc<dyn FinancialDataProvider>);

        svc.calculate_intrinsic_value("AAPL").await.unwrap();
        let calls_after_first = provider.calls();

        let overrides = DcfAssumptionOverrides {
            growth_rate: Some(0.12),
            ..DcfAssumptionOverrides::default()
        };
        svc.calculate_intrinsic_value_with("AAPL", overrides)
            .await
            .unwrap();

        assert!(provider.calls() > calls_after_first);
    }

    #[tokio::test]
    async fn test_higher_growth_override_raises_value() {
        let svc = service(Arc::new(ScriptedProvider::new(10_000_000.0, 1_000_000.0)));

        let base = svc.calculate_intrinsic_value("AAPL").await.unwrap();
        let bullish = svc
            .calculate_intrinsic_value_with(
                "AAPL",
                DcfAssumptionOverrides {
                    growth_rate: Some(0.15),
                    ..DcfAssumptionOverrides::default()
                },
            )
            .await
            .unwrap();

        assert!(bullish.intrinsic_value > base.intrinsic_value);
    }

    #[tokio::test]
    async fn test_cache_failure_still_produces_result() {
        let provider = Arc::new(ScriptedProvider::new(10_000_000.0, 1_000_000.0));
        let svc = ValuationService::new(
            Arc::clone(&provider) as Arc<dyn FinancialDataProvider>,
            Arc::new(FailingCache),
            Arc::new(ValuationConfig::default()),
        );

        let result = svc.calculate_intrinsic_value("AAPL").await.unwrap();
        assert_eq!(result.valuation, ValuationLabel::Overvalued);
    }

    #[tokio::test]
    async fn test_provider_error_aborts_pipeline() {
        struct NoCashFlow;

        #[async_trait]
        impl FinancialDataProvider for NoCashFlow {
            fn name(&self) -> &str {
                "nocash"
            }

            async fn get_stock_info(&self, ticker: &str) -> Result<StockInfo> {
                Ok(StockInfo {
                    ticker: ticker.to_string(),
                    name: "No Cash Corp".to_string(),
                    current_price: 10.0,
                    currency: "USD".to_string(),
                    sector: "Unknown".to_string(),
                    industry: "Unknown".to_string(),
                })
            }

            async fn get_financial_metrics(&self, ticker: &str) -> Result<FinancialMetrics> {
                Err(ValuationError::NotFound {
                    ticker: ticker.to_string(),
                })
            }
        }

        let svc = service(Arc::new(NoCashFlow));
        let err = svc.calculate_intrinsic_value("AAPL").await.unwrap_err();
        assert!(matches!(err, ValuationError::NotFound { ref ticker } if ticker == "AAPL"));
    }

    #[tokio::test]
    async fn test_negative_fcf_is_rejected_as_invalid_assumptions() {
        let svc = service(Arc::new(ScriptedProvider::new(1_000_000.0, -500_000.0)));
        let err = svc.calculate_intrinsic_value("BURN").await.unwrap_err();
        assert!(matches!(err, ValuationError::InvalidAssumptions(_)));
    }

    #[tokio::test]
    async fn test_zero_price_surfaces_calculation_error() {
        // A provider may legitimately degrade a missing price to 0.0
        let svc = service(Arc::new(ScriptedProvider::new(0.0, 1_000_000.0)));
        let err = svc.calculate_intrinsic_value("AAPL").await.unwrap_err();
        assert!(matches!(err, ValuationError::Calculation(_)));
    }

    #[tokio::test]
    async fn test_invalid_ticker_is_rejected_before_fetch() {
        let provider = Arc::new(ScriptedProvider::new(1.0, 1.0));
        let svc = service(Arc::clone(&provider) as Arc<dyn FinancialDataProvider>);

        let err = svc.get_stock_info("BRK.B").await.unwrap_err();
        assert!(matches!(err, ValuationError::InvalidTicker(_)));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_entry_points_normalize_case() {
        let svc = service(Arc::new(ScriptedProvider::new(5.0, 1_000.0)));
        let info = svc.get_stock_info("aapl").await.unwrap();
        assert_eq!(info.ticker, "AAPL");

        let metrics = svc.get_financial_metrics(" msft ").await.unwrap();
        assert_eq!(metrics.fiscal_year_end, "2024-12-31");
    }
}
