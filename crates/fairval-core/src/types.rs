//! Value objects for the valuation pipeline
//!
//! Everything here is a plain value: no identity beyond the fields, no
//! mutation after construction. All of it serializes, because provider
//! results round-trip through the cache as JSON.

use crate::error::{Result, ValuationError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Methodology tag carried on every valuation result.
pub const METHODOLOGY_DCF: &str = "DCF";

/// Maximum ticker length accepted at the pipeline boundary.
pub const MAX_TICKER_LEN: usize = 10;

/// Normalize a ticker to its canonical uppercase form.
///
/// Accepts 1-10 ASCII alphanumeric characters (surrounding whitespace is
/// trimmed); anything else is rejected before an upstream call is made.
pub fn normalize_ticker(ticker: &str) -> Result<String> {
    let trimmed = ticker.trim();
    if trimmed.is_empty()
        || trimmed.len() > MAX_TICKER_LEN
        || !trimmed.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return Err(ValuationError::InvalidTicker(ticker.to_string()));
    }
    Ok(trimmed.to_ascii_uppercase())
}

/// Descriptive company information from a data provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockInfo {
    pub ticker: String,
    pub name: String,
    /// Latest known price. May legitimately be 0.0 when the upstream exposed
    /// no price field at all; callers must treat that as a degraded signal.
    pub current_price: f64,
    pub currency: String,
    pub sector: String,
    pub industry: String,
}

/// Free-cash-flow figures for the most recent reporting period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialMetrics {
    /// Operating cash flow minus the absolute value of capital expenditure.
    /// Negative for cash-burning companies.
    pub free_cash_flow: f64,
    /// Fiscal period label, e.g. "2024-09-30"
    pub fiscal_year_end: String,
}

/// Validated inputs to the DCF calculation.
///
/// Constructed once per valuation request via [`DcfInputs::new`]; the ranges
/// and cross-field invariants are rejected with
/// [`ValuationError::InvalidAssumptions`] before any computation happens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DcfInputs {
    growth_rate: f64,
    discount_rate: f64,
    terminal_growth_rate: f64,
    projection_years: u32,
    base_free_cash_flow: f64,
}

/// Default assumption set used when the caller supplies no overrides.
pub const DEFAULT_GROWTH_RATE: f64 = 0.08;
pub const DEFAULT_DISCOUNT_RATE: f64 = 0.10;
pub const DEFAULT_TERMINAL_GROWTH_RATE: f64 = 0.02;
pub const DEFAULT_PROJECTION_YEARS: u32 = 5;

impl DcfInputs {
    pub fn new(
        growth_rate: f64,
        discount_rate: f64,
        terminal_growth_rate: f64,
        projection_years: u32,
        base_free_cash_flow: f64,
    ) -> Result<Self> {
        if !(0.0..=0.5).contains(&growth_rate) {
            return Err(ValuationError::InvalidAssumptions(format!(
                "growth_rate {growth_rate} outside [0, 0.5]"
            )));
        }
        if !(0.05..=0.25).contains(&discount_rate) {
            return Err(ValuationError::InvalidAssumptions(format!(
                "discount_rate {discount_rate} outside [0.05, 0.25]"
            )));
        }
        if !(0.01..=0.05).contains(&terminal_growth_rate) {
            return Err(ValuationError::InvalidAssumptions(format!(
                "terminal_growth_rate {terminal_growth_rate} outside [0.01, 0.05]"
            )));
        }
        if !(3..=10).contains(&projection_years) {
            return Err(ValuationError::InvalidAssumptions(format!(
                "projection_years {projection_years} outside [3, 10]"
            )));
        }
        if base_free_cash_flow <= 0.0 {
            return Err(ValuationError::InvalidAssumptions(format!(
                "base_free_cash_flow {base_free_cash_flow} must be positive"
            )));
        }
        if terminal_growth_rate >= growth_rate {
            return Err(ValuationError::InvalidAssumptions(format!(
                "terminal_growth_rate {terminal_growth_rate} must be below growth_rate {growth_rate}"
            )));
        }
        if discount_rate <= terminal_growth_rate {
            return Err(ValuationError::InvalidAssumptions(format!(
                "discount_rate {discount_rate} must exceed terminal_growth_rate {terminal_growth_rate}"
            )));
        }

        Ok(Self {
            growth_rate,
            discount_rate,
            terminal_growth_rate,
            projection_years,
            base_free_cash_flow,
        })
    }

    /// Build inputs from a base free cash flow and the default assumption set
    /// (8% growth, 10% discount, 2% terminal, 5-year horizon).
    pub fn with_defaults(base_free_cash_flow: f64) -> Result<Self> {
        Self::new(
            DEFAULT_GROWTH_RATE,
            DEFAULT_DISCOUNT_RATE,
            DEFAULT_TERMINAL_GROWTH_RATE,
            DEFAULT_PROJECTION_YEARS,
            base_free_cash_flow,
        )
    }

    pub fn growth_rate(&self) -> f64 {
        self.growth_rate
    }

    pub fn discount_rate(&self) -> f64 {
        self.discount_rate
    }

    pub fn terminal_growth_rate(&self) -> f64 {
        self.terminal_growth_rate
    }

    pub fn projection_years(&self) -> u32 {
        self.projection_years
    }

    pub fn base_free_cash_flow(&self) -> f64 {
        self.base_free_cash_flow
    }
}

/// One projection year of the DCF table, in chronological order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DcfCalculationRow {
    /// 1-based projection year
    pub year: u32,
    pub projected_fcf: f64,
    pub present_value: f64,
}

/// Explanatory note attached to a single assumption; never used for
/// computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DcfAssumption {
    pub value: f64,
    pub rationale: String,
    pub supporting_data_points: Vec<String>,
}

/// Verdict relative to the current market price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValuationLabel {
    Undervalued,
    Overvalued,
}

impl std::fmt::Display for ValuationLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Undervalued => write!(f, "Undervalued"),
            Self::Overvalued => write!(f, "Overvalued"),
        }
    }
}

/// Terminal artifact of the valuation pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntrinsicValue {
    pub intrinsic_value: f64,
    pub current_price: f64,
    /// Fractional upside: (intrinsic - price) / price
    pub upside: f64,
    pub valuation: ValuationLabel,
    /// Always [`METHODOLOGY_DCF`]
    pub methodology: String,
    pub assumptions: BTreeMap<String, DcfAssumption>,
    pub calculation_rows: Vec<DcfCalculationRow>,
}
