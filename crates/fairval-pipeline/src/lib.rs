//! Valuation pipeline: provider resolution, caching and DCF orchestration
//!
//! The [`ValuationService`] is the composition root the outer layers (CLI,
//! HTTP handlers) talk to. It exposes three entry points:
//!
//! - [`ValuationService::get_stock_info`]
//! - [`ValuationService::get_financial_metrics`]
//! - [`ValuationService::calculate_intrinsic_value`]
//!
//! Each surfaces an error from the shared taxonomy rather than a sentinel
//! value; mapping those to transport status codes is the caller's business.
//!
//! # Example
//!
//! ```rust,ignore
//! use fairval_core::ValuationConfig;
//! use fairval_pipeline::ValuationService;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let service = ValuationService::from_config(ValuationConfig::default())?;
//!     let valuation = service.calculate_intrinsic_value("AAPL").await?;
//!     println!("{} ({:.1}% upside)", valuation.valuation, valuation.upside * 100.0);
//!     Ok(())
//! }
//! ```

pub mod service;

pub use service::{DcfAssumptionOverrides, ValuationService};
