//! Pure DCF valuation engine
//!
//! Turns validated [`fairval_core::types::DcfInputs`] and a current market
//! price into a structured [`fairval_core::types::IntrinsicValue`]. The crate
//! does no I/O; fetching and caching live in `fairval-providers` and
//! `fairval-pipeline`.

pub mod dcf;

pub use dcf::{intrinsic_value, project_cash_flows, terminal_value, wacc};
