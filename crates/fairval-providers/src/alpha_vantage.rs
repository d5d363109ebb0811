//! Alpha Vantage data provider

use crate::provider::FinancialDataProvider;
use async_trait::async_trait;
use fairval_core::error::{Result, ValuationError};
use fairval_core::types::{FinancialMetrics, StockInfo};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const BASE_URL: &str = "https://www.alphavantage.co/query";

const PROVIDER_NAME: &str = "alpha_vantage";

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Alpha Vantage provider
///
/// Company overview, global quote and cash-flow endpoints, throttled
/// client-side to the account's requests-per-minute budget (the free tier
/// allows 5).
pub struct AlphaVantageProvider {
    client: Client,
    api_key: String,
    rate_limiter: SharedRateLimiter,
}

impl AlphaVantageProvider {
    /// Create a provider with an API key, per-minute budget and request
    /// timeout.
    pub fn new(api_key: impl Into<String>, rate_limit: u32, timeout: Duration) -> Result<Self> {
        let quota =
            Quota::per_minute(NonZeroU32::new(rate_limit).unwrap_or(NonZeroU32::new(5).expect("5 is non-zero")));
        let rate_limiter = Arc::new(RateLimiter::direct(quota));

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ValuationError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            rate_limiter,
        })
    }

    /// Issue one API call and apply the upstream's in-band error reporting.
    async fn fetch(&self, function: &str, symbol: &str) -> Result<serde_json::Value> {
        // Wait for rate limiter
        self.rate_limiter.until_ready().await;

        let mut params = HashMap::new();
        params.insert("function", function);
        params.insert("symbol", symbol);
        params.insert("apikey", &self.api_key);

        debug!(function, symbol, "calling Alpha Vantage");
        let response = self
            .client
            .get(BASE_URL)
            .query(&params)
            .send()
            .await
            .map_err(|e| ValuationError::from_upstream(PROVIDER_NAME, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ValuationError::from_upstream(
                PROVIDER_NAME,
                format!("HTTP error: {status}"),
            ));
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ValuationError::from_upstream(PROVIDER_NAME, e.to_string()))?;

        // In-band error reporting: "Error Message" for bad requests, "Note"
        // when the per-minute quota is exhausted
        if let Some(error) = data.get("Error Message") {
            return Err(ValuationError::Upstream(format!(
                "{PROVIDER_NAME}: {error}"
            )));
        }

        if data.get("Note").is_some() {
            return Err(ValuationError::RateLimited {
                provider: PROVIDER_NAME.to_string(),
            });
        }

        Ok(data)
    }

    /// Current price via GLOBAL_QUOTE.
    ///
    /// Degrades to 0.0 when the quote is absent or the call fails; this is
    /// the one documented place a provider swallows an upstream problem, so
    /// that an overview without a quote still yields usable stock info.
    /// Callers must treat a 0.0 price as a degraded signal.
    async fn get_current_price(&self, ticker: &str) -> f64 {
        match self.fetch("GLOBAL_QUOTE", ticker).await {
            Ok(data) => {
                let price = quote_price(&data);
                if price == 0.0 {
                    warn!(ticker, "no price data in Global Quote, degrading to 0.0");
                }
                price
            }
            Err(e) => {
                warn!(ticker, error = %e, "price lookup failed, degrading to 0.0");
                0.0
            }
        }
    }
}

/// Extract the price from a GLOBAL_QUOTE payload, 0.0 when absent.
fn quote_price(data: &serde_json::Value) -> f64 {
    data.get("Global Quote")
        .and_then(|quote| quote.get("05. price"))
        .and_then(|price| price.as_str())
        .and_then(|price| price.parse().ok())
        .unwrap_or(0.0)
}

/// Build [`StockInfo`] from an OVERVIEW payload plus a separately fetched
/// price.
fn overview_info(ticker: &str, data: &serde_json::Value, current_price: f64) -> StockInfo {
    let field = |name: &str, default: &str| {
        data.get(name)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty() && *s != "None")
            .unwrap_or(default)
            .to_string()
    };

    StockInfo {
        ticker: ticker.to_string(),
        name: field("Name", "Unknown"),
        current_price,
        currency: field("Currency", "USD"),
        sector: field("Sector", "Unknown"),
        industry: field("Industry", "Unknown"),
    }
}

/// Derive [`FinancialMetrics`] from a CASH_FLOW payload.
///
/// Alpha Vantage reports figures as decimal strings; the most recent annual
/// report is first in the list.
fn metrics_from_cash_flow(ticker: &str, data: &serde_json::Value) -> Result<FinancialMetrics> {
    let latest = data
        .get("annualReports")
        .and_then(|reports| reports.as_array())
        .and_then(|reports| reports.first())
        .ok_or_else(|| ValuationError::NotFound {
            ticker: ticker.to_string(),
        })?;

    let figure = |name: &str| {
        latest
            .get(name)
            .and_then(|v| v.as_str())
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(0.0)
    };

    let operating_cash_flow = figure("operatingCashflow");
    let capex = figure("capitalExpenditures");
    let free_cash_flow = operating_cash_flow - capex.abs();

    let fiscal_year_end = latest
        .get("fiscalDateEnding")
        .and_then(|v| v.as_str())
        .unwrap_or("Unknown")
        .to_string();

    debug!(
        ticker,
        operating_cash_flow, capex, free_cash_flow, "derived free cash flow"
    );

    Ok(FinancialMetrics {
        free_cash_flow,
        fiscal_year_end,
    })
}

#[async_trait]
impl FinancialDataProvider for AlphaVantageProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn get_stock_info(&self, ticker: &str) -> Result<StockInfo> {
        let data = self.fetch("OVERVIEW", ticker).await?;

        // An unknown symbol returns an empty object rather than an error
        if data.get("Name").is_none() {
            return Err(ValuationError::NotFound {
                ticker: ticker.to_string(),
            });
        }

        let current_price = self.get_current_price(ticker).await;
        let stock_info = overview_info(ticker, &data, current_price);
        info!(ticker, price = current_price, "retrieved stock info");
        Ok(stock_info)
    }

    async fn get_financial_metrics(&self, ticker: &str) -> Result<FinancialMetrics> {
        let data = self.fetch("CASH_FLOW", ticker).await?;
        let metrics = metrics_from_cash_flow(ticker, &data)?;
        info!(
            ticker,
            fcf = metrics.free_cash_flow,
            fiscal_year_end = %metrics.fiscal_year_end,
            "retrieved financial metrics"
        );
        Ok(metrics)
    }
}
