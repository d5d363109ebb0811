//! Configuration for the valuation pipeline

use crate::error::{Result, ValuationError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Data provider selection, resolved at composition time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ProviderKind {
    /// Yahoo Finance (default, no API key required)
    #[default]
    Yahoo,
    /// Alpha Vantage (requires API key)
    AlphaVantage,
}

/// Configuration for the valuation pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationConfig {
    /// Data provider to use
    pub provider: ProviderKind,

    /// Cache TTL for descriptive stock info
    pub cache_ttl_stock_info: Duration,

    /// Cache TTL for cash-flow metrics
    pub cache_ttl_metrics: Duration,

    /// Cache TTL for a computed intrinsic value
    pub cache_ttl_valuation: Duration,

    /// Cache TTL for expensive, slow-changing analyses
    pub cache_ttl_analysis: Duration,

    /// Bounded timeout applied to every outbound HTTP call
    pub request_timeout: Duration,

    /// Alpha Vantage API key (optional)
    pub alpha_vantage_api_key: Option<String>,

    /// Alpha Vantage requests per minute (free tier allows 5)
    pub alpha_vantage_rate_limit: u32,
}

impl Default for ValuationConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Yahoo,
            cache_ttl_stock_info: Duration::from_secs(3600), // 1 hour
            cache_ttl_metrics: Duration::from_secs(3600),    // 1 hour
            cache_ttl_valuation: Duration::from_secs(1800),  // 30 minutes
            cache_ttl_analysis: Duration::from_secs(86400),  // 24 hours
            request_timeout: Duration::from_secs(10),
            alpha_vantage_api_key: None,
            alpha_vantage_rate_limit: 5,
        }
    }
}

impl ValuationConfig {
    /// Create a new configuration builder
    pub fn builder() -> ValuationConfigBuilder {
        ValuationConfigBuilder::default()
    }

    /// Load the Alpha Vantage API key from `ALPHA_VANTAGE_API_KEY` if set
    pub fn with_env_api_key(mut self) -> Self {
        if let Ok(key) = std::env::var("ALPHA_VANTAGE_API_KEY") {
            self.alpha_vantage_api_key = Some(key);
        }
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.provider == ProviderKind::AlphaVantage && self.alpha_vantage_api_key.is_none() {
            return Err(ValuationError::Config(
                "Alpha Vantage API key required when using the AlphaVantage provider".to_string(),
            ));
        }

        if self.alpha_vantage_rate_limit == 0 {
            return Err(ValuationError::Config(
                "alpha_vantage_rate_limit must be greater than 0".to_string(),
            ));
        }

        if self.request_timeout.is_zero() {
            return Err(ValuationError::Config(
                "request_timeout must be non-zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for [`ValuationConfig`]
#[derive(Debug, Default)]
pub struct ValuationConfigBuilder {
    provider: Option<ProviderKind>,
    cache_ttl_stock_info: Option<Duration>,
    cache_ttl_metrics: Option<Duration>,
    cache_ttl_valuation: Option<Duration>,
    cache_ttl_analysis: Option<Duration>,
    request_timeout: Option<Duration>,
    alpha_vantage_api_key: Option<String>,
    alpha_vantage_rate_limit: Option<u32>,
}

impl ValuationConfigBuilder {
    /// Set the data provider
    pub fn provider(mut self, provider: ProviderKind) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set the stock-info cache TTL
    pub fn cache_ttl_stock_info(mut self, ttl: Duration) -> Self {
        self.cache_ttl_stock_info = Some(ttl);
        self
    }

    /// Set the financial-metrics cache TTL
    pub fn cache_ttl_metrics(mut self, ttl: Duration) -> Self {
        self.cache_ttl_metrics = Some(ttl);
        self
    }

    /// Set the intrinsic-value cache TTL
    pub fn cache_ttl_valuation(mut self, ttl: Duration) -> Self {
        self.cache_ttl_valuation = Some(ttl);
        self
    }

    /// Set the expensive-analysis cache TTL
    pub fn cache_ttl_analysis(mut self, ttl: Duration) -> Self {
        self.cache_ttl_analysis = Some(ttl);
        self
    }

    /// Set the outbound request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Set the Alpha Vantage API key
    pub fn alpha_vantage_api_key(mut self, key: impl Into<String>) -> Self {
        self.alpha_vantage_api_key = Some(key.into());
        self
    }

    /// Set the Alpha Vantage requests-per-minute budget
    pub fn alpha_vantage_rate_limit(mut self, limit: u32) -> Self {
        self.alpha_vantage_rate_limit = Some(limit);
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<ValuationConfig> {
        let defaults = ValuationConfig::default();
        let config = ValuationConfig {
            provider: self.provider.unwrap_or(defaults.provider),
            cache_ttl_stock_info: self
                .cache_ttl_stock_info
                .unwrap_or(defaults.cache_ttl_stock_info),
            cache_ttl_metrics: self.cache_ttl_metrics.unwrap_or(defaults.cache_ttl_metrics),
            cache_ttl_valuation: self
                .cache_ttl_valuation
                .unwrap_or(defaults.cache_ttl_valuation),
            cache_ttl_analysis: self
                .cache_ttl_analysis
                .unwrap_or(defaults.cache_ttl_analysis),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            alpha_vantage_api_key: self.alpha_vantage_api_key,
            alpha_vantage_rate_limit: self
                .alpha_vantage_rate_limit
                .unwrap_or(defaults.alpha_vantage_rate_limit),
        };
        config.validate()?;
        Ok(config)
    }
}
