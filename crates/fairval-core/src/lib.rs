//! Core value objects, error taxonomy and configuration for fairval
//!
//! This crate holds everything the rest of the workspace agrees on:
//!
//! - The data model of the valuation pipeline ([`StockInfo`],
//!   [`FinancialMetrics`], [`DcfInputs`], [`IntrinsicValue`])
//! - The single error taxonomy ([`ValuationError`]) shared by providers,
//!   engine and pipeline
//! - Pipeline configuration ([`ValuationConfig`])
//!
//! It performs no I/O and depends on nothing async.

pub mod config;
pub mod error;
pub mod types;

// Re-export main types for convenience
pub use config::{ProviderKind, ValuationConfig, ValuationConfigBuilder};
pub use error::{Result, ValuationError};
pub use types::{
    DcfAssumption, DcfCalculationRow, DcfInputs, FinancialMetrics, IntrinsicValue, StockInfo,
    ValuationLabel, normalize_ticker,
};
