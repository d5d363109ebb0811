//! Yahoo Finance data provider

use crate::provider::FinancialDataProvider;
use async_trait::async_trait;
use chrono::DateTime;
use fairval_core::error::{Result, ValuationError};
use fairval_core::types::{FinancialMetrics, StockInfo};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, info, warn};
use yahoo_finance_api as yahoo;

const QUOTE_SUMMARY_URL: &str = "https://query2.finance.yahoo.com/v10/finance/quoteSummary";

const PROVIDER_NAME: &str = "yahoo_finance";

/// Yahoo Finance provider
///
/// Company info and cash-flow statements come from the `quoteSummary`
/// endpoint; when the summary carries no usable price field the latest daily
/// close from the quote API is used as a final fallback.
pub struct YahooProvider {
    client: Client,
}

impl YahooProvider {
    /// Create a provider with a bounded request timeout.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            // Yahoo rejects requests without a browser-ish user agent
            .user_agent("Mozilla/5.0 (compatible; fairval/0.1)")
            .build()
            .map_err(|e| ValuationError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Fetch the requested quoteSummary modules for a ticker.
    async fn fetch_summary(&self, ticker: &str, modules: &str) -> Result<serde_json::Value> {
        let url = format!("{QUOTE_SUMMARY_URL}/{ticker}");

        debug!(ticker, modules, "calling Yahoo Finance quoteSummary");
        let response = self
            .client
            .get(&url)
            .query(&[("modules", modules), ("formatted", "false")])
            .send()
            .await
            .map_err(|e| ValuationError::from_upstream(PROVIDER_NAME, e.to_string()))?;

        let status = response.status();
        match status {
            StatusCode::NOT_FOUND => {
                return Err(ValuationError::NotFound {
                    ticker: ticker.to_string(),
                });
            }
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(ValuationError::RateLimited {
                    provider: PROVIDER_NAME.to_string(),
                });
            }
            s if !s.is_success() => {
                return Err(ValuationError::from_upstream(
                    PROVIDER_NAME,
                    format!("HTTP error: {s}"),
                ));
            }
            _ => {}
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ValuationError::from_upstream(PROVIDER_NAME, e.to_string()))?;

        summary_result(ticker, &data)
    }

    /// Latest daily close via the quote API; the price fallback of last
    /// resort. Degrades to 0.0 so a summary without price fields still
    /// yields usable stock info; callers must treat 0.0 as a degraded
    /// signal, not a real price.
    async fn latest_close(&self, ticker: &str) -> f64 {
        let connector = match yahoo::YahooConnector::new() {
            Ok(connector) => connector,
            Err(e) => {
                warn!(ticker, error = %e, "quote connector unavailable, degrading price to 0.0");
                return 0.0;
            }
        };

        match connector.get_latest_quotes(ticker, "1d").await {
            Ok(response) => match response.last_quote() {
                Ok(quote) => quote.close,
                Err(e) => {
                    warn!(ticker, error = %e, "no last quote, degrading price to 0.0");
                    0.0
                }
            },
            Err(e) => {
                warn!(ticker, error = %e, "quote lookup failed, degrading price to 0.0");
                0.0
            }
        }
    }
}

/// Unwrap the `quoteSummary.result[0]` envelope, mapping the endpoint's
/// in-band error object to the taxonomy.
fn summary_result(ticker: &str, data: &serde_json::Value) -> Result<serde_json::Value> {
    let envelope = data
        .get("quoteSummary")
        .ok_or_else(|| ValuationError::from_upstream(PROVIDER_NAME, "missing quoteSummary envelope"))?;

    if let Some(error) = envelope.get("error").filter(|e| !e.is_null()) {
        let description = error
            .get("description")
            .and_then(|d| d.as_str())
            .unwrap_or("unknown error");
        if description.to_lowercase().contains("not found") {
            return Err(ValuationError::NotFound {
                ticker: ticker.to_string(),
            });
        }
        return Err(ValuationError::from_upstream(PROVIDER_NAME, description));
    }

    envelope
        .get("result")
        .and_then(|r| r.as_array())
        .and_then(|r| r.first())
        .cloned()
        .ok_or_else(|| ValuationError::NotFound {
            ticker: ticker.to_string(),
        })
}

/// Read a numeric field that may be a plain number or a `{ "raw": n }`
/// object, depending on the formatting mode.
fn num(value: Option<&serde_json::Value>) -> Option<f64> {
    let value = value?;
    if let Some(n) = value.as_f64() {
        return Some(n);
    }
    value.get("raw").and_then(|raw| raw.as_f64())
}

/// Resolve the price from the summary's fields.
///
/// Preference order: the explicit current price, then the regular market
/// price, then the previous close. `None` means the caller should fall back
/// to a quote lookup.
fn resolve_price(summary: &serde_json::Value) -> Option<f64> {
    let financial_data = summary.get("financialData");
    let price = summary.get("price");

    num(financial_data.and_then(|d| d.get("currentPrice")))
        .or_else(|| num(price.and_then(|p| p.get("regularMarketPrice"))))
        .or_else(|| num(price.and_then(|p| p.get("previousClose"))))
}

/// Build [`StockInfo`] from `price` + `assetProfile` modules.
fn info_from_summary(ticker: &str, summary: &serde_json::Value, current_price: f64) -> StockInfo {
    let price = summary.get("price");
    let profile = summary.get("assetProfile");

    let text = |value: Option<&serde_json::Value>, default: &str| {
        value
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .unwrap_or(default)
            .to_string()
    };

    let name = price
        .and_then(|p| p.get("longName"))
        .and_then(|n| n.as_str())
        .or_else(|| {
            price
                .and_then(|p| p.get("shortName"))
                .and_then(|n| n.as_str())
        })
        .unwrap_or("Unknown")
        .to_string();

    StockInfo {
        ticker: ticker.to_string(),
        name,
        current_price,
        currency: text(price.and_then(|p| p.get("currency")), "USD"),
        sector: text(profile.and_then(|p| p.get("sector")), "Unknown"),
        industry: text(profile.and_then(|p| p.get("industry")), "Unknown"),
    }
}

/// Derive [`FinancialMetrics`] from the `cashflowStatementHistory` module.
fn metrics_from_summary(ticker: &str, summary: &serde_json::Value) -> Result<FinancialMetrics> {
    let latest = summary
        .get("cashflowStatementHistory")
        .and_then(|h| h.get("cashflowStatements"))
        .and_then(|s| s.as_array())
        .and_then(|s| s.first())
        .ok_or_else(|| ValuationError::NotFound {
            ticker: ticker.to_string(),
        })?;

    let operating_cash_flow = num(latest.get("totalCashFromOperatingActivities")).ok_or_else(|| {
        ValuationError::NotFound {
            ticker: ticker.to_string(),
        }
    })?;
    // capex is usually reported as a negative outflow
    let capex = num(latest.get("capitalExpenditures")).unwrap_or(0.0);
    let free_cash_flow = operating_cash_flow - capex.abs();

    let fiscal_year_end = num(latest.get("endDate"))
        .and_then(|epoch| DateTime::from_timestamp(epoch as i64, 0))
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "Unknown".to_string());

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
impl FinancialDataProvider for YahooProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn get_stock_info(&self, ticker: &str) -> Result<StockInfo> {
        let summary = self
            .fetch_summary(ticker, "price,financialData,assetProfile")
            .await?;

        let current_price = match resolve_price(&summary) {
            Some(price) => price,
            None => {
                warn!(ticker, "no price fields in summary, falling back to quote API");
                self.latest_close(ticker).await
            }
        };

        let stock_info = info_from_summary(ticker, &summary, current_price);
        info!(ticker, price = current_price, "retrieved stock info");
        Ok(stock_info)
    }

    async fn get_financial_metrics(&self, ticker: &str) -> Result<FinancialMetrics> {
        let summary = self
            .fetch_summary(ticker, "cashflowStatementHistory")
            .await?;
        let metrics = metrics_from_summary(ticker, &summary)?;
        info!(
            ticker,
            fcf = metrics.free_cash_flow,
            fiscal_year_end = %metrics.fiscal_year_end,
            "retrieved financial metrics"
        );
        Ok(metrics)
    }
}
