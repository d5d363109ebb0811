//! Discounted-cash-flow mathematics
//!
//! Every function here is a pure computation over its arguments: no I/O, no
//! shared state, deterministic for identical inputs. Validation of the input
//! ranges happens in [`DcfInputs::new`]; the terminal-value precondition is
//! re-checked here because [`terminal_value`] is also usable on its own.

use fairval_core::error::{Result, ValuationError};
use fairval_core::types::{
    DcfAssumption, DcfCalculationRow, DcfInputs, IntrinsicValue, METHODOLOGY_DCF, ValuationLabel,
};
use std::collections::BTreeMap;
use tracing::debug;

/// Project free cash flows forward with compound growth.
///
/// Returns `years` flows in chronological order where
/// `flow_i = base_fcf * (1 + growth_rate)^i` for i = 1..=years.
pub fn project_cash_flows(base_fcf: f64, growth_rate: f64, years: u32) -> Vec<f64> {
    let mut flows = Vec::with_capacity(years as usize);
    let mut current = base_fcf;
    for _ in 0..years {
        current *= 1.0 + growth_rate;
        flows.push(current);
    }
    flows
}

/// Gordon-growth terminal value of the final projected year.
///
/// Fails with [`ValuationError::InvalidAssumptions`] when
/// `discount_rate <= terminal_growth_rate`; the denominator would be zero or
/// negative.
pub fn terminal_value(
    final_year_fcf: f64,
    terminal_growth_rate: f64,
    discount_rate: f64,
) -> Result<f64> {
    if discount_rate <= terminal_growth_rate {
        return Err(ValuationError::InvalidAssumptions(format!(
            "discount_rate {discount_rate} must exceed terminal_growth_rate {terminal_growth_rate}"
        )));
    }
    Ok(final_year_fcf * (1.0 + terminal_growth_rate) / (discount_rate - terminal_growth_rate))
}

/// Weighted average cost of capital.
///
/// `cost_of_equity = risk_free_rate + beta * market_premium`, debt priced
/// after tax, weighted by the capital structure. Exposed as a building block
/// for callers that derive their own discount rate; the default pipeline uses
/// a fixed discount assumption instead.
pub fn wacc(
    risk_free_rate: f64,
    market_premium: f64,
    beta: f64,
    cost_of_debt: f64,
    tax_rate: f64,
    debt_weight: f64,
) -> f64 {
    let cost_of_equity = risk_free_rate + beta * market_premium;
    let after_tax_cost_of_debt = cost_of_debt * (1.0 - tax_rate);
    let equity_weight = 1.0 - debt_weight;

    cost_of_equity * equity_weight + after_tax_cost_of_debt * debt_weight
}

/// Full DCF intrinsic-value calculation over validated inputs.
///
/// Each projected flow is discounted by `(1 + discount_rate)^year`; the
/// terminal value is discounted over the whole horizon and added. Upside is
/// measured against `current_price`, which must be non-zero — providers may
/// degrade a missing price to 0.0, and that case is rejected here as a named
/// [`ValuationError::Calculation`] instead of dividing by zero.
///
/// The boundary is strict: `upside > 0` is "Undervalued", `upside == 0`
/// classifies as "Overvalued".
pub fn intrinsic_value(inputs: &DcfInputs, current_price: f64) -> Result<IntrinsicValue> {
    if current_price == 0.0 {
        return Err(ValuationError::Calculation(
            "current price is zero; upside against a zero price is undefined".to_string(),
        ));
    }

    let discount_rate = inputs.discount_rate();
    let projected = project_cash_flows(
        inputs.base_free_cash_flow(),
        inputs.growth_rate(),
        inputs.projection_years(),
    );
    debug!(years = projected.len(), "projected cash flows");

    let mut rows = Vec::with_capacity(projected.len());
    for (i, fcf) in projected.iter().enumerate() {
        let year = i as u32 + 1;
        let present_value = fcf / (1.0 + discount_rate).powi(year as i32);
        rows.push(DcfCalculationRow {
            year,
            projected_fcf: *fcf,
            present_value,
        });
    }

    // projection_years >= 3, so the final flow always exists
    let final_fcf = projected.last().copied().ok_or_else(|| {
        ValuationError::Calculation("no projected cash flows produced".to_string())
    })?;
    let terminal = terminal_value(final_fcf, inputs.terminal_growth_rate(), discount_rate)?;
    let terminal_present =
        terminal / (1.0 + discount_rate).powi(inputs.projection_years() as i32);

    let explicit_present: f64 = rows.iter().map(|row| row.present_value).sum();
    let value = explicit_present + terminal_present;

    let upside = (value - current_price) / current_price;
    let valuation = if upside > 0.0 {
        ValuationLabel::Undervalued
    } else {
        ValuationLabel::Overvalued
    };

    debug!(
        intrinsic_value = value,
        current_price, upside, "dcf calculation complete"
    );

    Ok(IntrinsicValue {
        intrinsic_value: value,
        current_price,
        upside,
        valuation,
        methodology: METHODOLOGY_DCF.to_string(),
        assumptions: default_assumption_notes(inputs),
        calculation_rows: rows,
    })
}

/// Explanatory notes attached to the result; not used for computation.
fn default_assumption_notes(inputs: &DcfInputs) -> BTreeMap<String, DcfAssumption> {
    let mut notes = BTreeMap::new();
    notes.insert(
        "growth_rate".to_string(),
        DcfAssumption {
            value: inputs.growth_rate(),
            rationale: "Based on historical growth and industry outlook".to_string(),
            supporting_data_points: vec![
                "Historical CAGR".to_string(),
                "Industry average".to_string(),
            ],
        },
    );
    notes.insert(
        "discount_rate".to_string(),
        DcfAssumption {
            value: inputs.discount_rate(),
            rationale: "Based on WACC calculation".to_string(),
            supporting_data_points: vec![
                "Risk-free rate".to_string(),
                "Market premium".to_string(),
                "Beta".to_string(),
            ],
        },
    );
    notes.insert(
        "terminal_growth_rate".to_string(),
        DcfAssumption {
            value: inputs.terminal_growth_rate(),
            rationale: "Based on long-term GDP growth".to_string(),
            supporting_data_points: vec!["GDP growth".to_string(), "Inflation".to_string()],
        },
    );
    notes
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < EPS * b.abs().max(1.0)
    }

    #[test]
    fn test_project_cash_flows_compound_growth() {
        let flows = project_cash_flows(100.0, 0.10, 3);
        assert_eq!(flows.len(), 3);
        assert!(close(flows[0], 110.0));
        assert!(close(flows[1], 121.0));
        assert!(close(flows[2], 133.1));
    }

    #[test]
    fn test_project_cash_flows_is_restartable() {
        let first = project_cash_flows(1_000.0, 0.08, 5);
        let second = project_cash_flows(1_000.0, 0.08, 5);
        assert_eq!(first, second);
    }

    #[test]
    fn test_terminal_value_gordon_growth() {
        let tv = terminal_value(100.0, 0.02, 0.10).unwrap();
        assert!(close(tv, 100.0 * 1.02 / 0.08));
    }

    #[test]
    fn test_terminal_value_rejects_equal_rates() {
        let err = terminal_value(100.0, 0.05, 0.05).unwrap_err();
        assert!(matches!(err, ValuationError::InvalidAssumptions(_)));

        let err = terminal_value(100.0, 0.06, 0.05).unwrap_err();
        assert!(matches!(err, ValuationError::InvalidAssumptions(_)));
    }

    #[test]
    fn test_wacc() {
        // 4% risk-free, 5% premium, beta 1.2, 6% debt at 25% tax, 40% debt
        let got = wacc(0.04, 0.05, 1.2, 0.06, 0.25, 0.4);
        let cost_of_equity = 0.04 + 1.2 * 0.05;
        let after_tax_debt = 0.06 * 0.75;
        assert!(close(got, cost_of_equity * 0.6 + after_tax_debt * 0.4));
    }

    #[test]
    fn test_wacc_all_equity() {
        let got = wacc(0.03, 0.05, 1.0, 0.07, 0.3, 0.0);
        assert!(close(got, 0.08));
    }

    /// Reference computation written out independently of the engine's loop.
    fn reference_intrinsic_value(
        base_fcf: f64,
        growth: f64,
        discount: f64,
        terminal_growth: f64,
        years: u32,
    ) -> f64 {
        let mut total = 0.0;
        let mut final_fcf = 0.0;
        for year in 1..=years {
            let fcf = base_fcf * (1.0 + growth).powi(year as i32);
            total += fcf / (1.0 + discount).powi(year as i32);
            final_fcf = fcf;
        }
        let tv = final_fcf * (1.0 + terminal_growth) / (discount - terminal_growth);
        total + tv / (1.0 + discount).powi(years as i32)
    }

    #[test]
    fn test_intrinsic_value_matches_reference_formula() {
        let inputs = DcfInputs::new(0.08, 0.10, 0.02, 5, 1_000_000.0).unwrap();
        let result = intrinsic_value(&inputs, 5_000_000.0).unwrap();

        let expected = reference_intrinsic_value(1_000_000.0, 0.08, 0.10, 0.02, 5);
        assert!(
            close(result.intrinsic_value, expected),
            "{} vs {}",
            result.intrinsic_value,
            expected
        );
        assert_eq!(result.calculation_rows.len(), 5);
        assert_eq!(result.methodology, "DCF");
    }

    #[test]
    fn test_intrinsic_value_is_deterministic() {
        let inputs = DcfInputs::new(0.12, 0.11, 0.03, 7, 250_000.0).unwrap();
        let a = intrinsic_value(&inputs, 1_000_000.0).unwrap();
        let b = intrinsic_value(&inputs, 1_000_000.0).unwrap();
        assert_eq!(a.intrinsic_value.to_bits(), b.intrinsic_value.to_bits());
        assert_eq!(a.upside.to_bits(), b.upside.to_bits());
    }

    #[test]
    fn test_growth_rate_monotonicity() {
        let mut previous = f64::MIN;
        for growth in [0.03, 0.05, 0.08, 0.12, 0.20, 0.35] {
            let inputs = DcfInputs::new(growth, 0.10, 0.02, 5, 1_000_000.0).unwrap();
            let value = intrinsic_value(&inputs, 1_000_000.0)
                .unwrap()
                .intrinsic_value;
            assert!(
                value >= previous,
                "intrinsic value decreased when growth rose to {growth}"
            );
            previous = value;
        }
    }

    #[test]
    fn test_zero_current_price_is_guarded() {
        let inputs = DcfInputs::with_defaults(1_000_000.0).unwrap();
        let err = intrinsic_value(&inputs, 0.0).unwrap_err();
        match err {
            ValuationError::Calculation(msg) => assert!(msg.contains("zero")),
            other => panic!("expected Calculation, got {other:?}"),
        }
    }

    #[test]
    fn test_rows_are_chronological_and_discounted() {
        let inputs = DcfInputs::new(0.08, 0.10, 0.02, 5, 1_000_000.0).unwrap();
        let result = intrinsic_value(&inputs, 2_000_000.0).unwrap();
        for (i, row) in result.calculation_rows.iter().enumerate() {
            assert_eq!(row.year, i as u32 + 1);
            // present value is always below the undiscounted projection
            assert!(row.present_value < row.projected_fcf);
            let expected_fcf = 1_000_000.0 * 1.08_f64.powi(row.year as i32);
            assert!(close(row.projected_fcf, expected_fcf));
        }
    }

    /// Scenario from the product description: a company producing 1M of free
    /// cash flow priced at 10M should come out overvalued under the default
    /// assumption set.
    #[test]
    fn test_default_assumptions_against_rich_price() {
        let inputs = DcfInputs::new(0.08, 0.10, 0.02, 5, 1_000_000.0).unwrap();
        let current_price = 10_000_000.0;
        let result = intrinsic_value(&inputs, current_price).unwrap();

        let expected = reference_intrinsic_value(1_000_000.0, 0.08, 0.10, 0.02, 5);
        assert!(close(result.intrinsic_value, expected));
        assert!(expected < current_price);
        assert_eq!(result.valuation, ValuationLabel::Overvalued);
        assert!(result.upside < 0.0);
    }

    #[test]
    fn test_upside_boundary_is_strictly_positive() {
        let inputs = DcfInputs::new(0.08, 0.10, 0.02, 5, 1_000_000.0).unwrap();
        let value = intrinsic_value(&inputs, 1.0).unwrap().intrinsic_value;

        // priced exactly at intrinsic value: zero upside classifies Overvalued
        let at_par = intrinsic_value(&inputs, value).unwrap();
        assert_eq!(at_par.upside, 0.0);
        assert_eq!(at_par.valuation, ValuationLabel::Overvalued);

        // a hair below par flips to Undervalued
        let below = intrinsic_value(&inputs, value * 0.999).unwrap();
        assert_eq!(below.valuation, ValuationLabel::Undervalued);
    }

    #[test]
    fn test_assumption_notes_carry_input_values() {
        let inputs = DcfInputs::new(0.09, 0.12, 0.03, 6, 500_000.0).unwrap();
        let result = intrinsic_value(&inputs, 1_000_000.0).unwrap();
        assert_eq!(result.assumptions["growth_rate"].value, 0.09);
        assert_eq!(result.assumptions["discount_rate"].value, 0.12);
        assert_eq!(result.assumptions["terminal_growth_rate"].value, 0.03);
        assert!(!result.assumptions["growth_rate"].supporting_data_points.is_empty());
    }
}
