//! The financial data provider contract

use async_trait::async_trait;
use fairval_core::error::Result;
use fairval_core::types::{FinancialMetrics, StockInfo};

/// Uniform contract every upstream data source implements.
///
/// Concrete providers normalize their upstream's schema and error reporting
/// into [`StockInfo`] / [`FinancialMetrics`] and the shared taxonomy:
/// `NotFound` when the upstream has no record, `RateLimited` when it signals
/// throttling, `Upstream` for network and parse failures. Providers are
/// selected at composition time; nothing downstream inspects their concrete
/// type.
#[async_trait]
pub trait FinancialDataProvider: Send + Sync {
    /// Stable provider identity, used in cache keys and error messages.
    fn name(&self) -> &str;

    /// Fetch descriptive company information for a ticker.
    async fn get_stock_info(&self, ticker: &str) -> Result<StockInfo>;

    /// Fetch free-cash-flow metrics for the most recent reporting period.
    ///
    /// Free cash flow is derived as
    /// `operating_cash_flow - |capital_expenditure|`.
    async fn get_financial_metrics(&self, ticker: &str) -> Result<FinancialMetrics>;
}
