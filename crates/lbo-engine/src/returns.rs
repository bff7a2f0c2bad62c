use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::time_value::bisection_irr;
use crate::types::{Money, Multiple, Rate, Years};
use crate::validation::ValidationFinding;

/// Exit bridge and headline returns (§3, §4.7). `irr` is `None` only when
/// the bisection solver could not find a sign change or converge within
/// tolerance — surfaced as an `irr_not_found` finding, never a halting error
/// (§7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnsSummary {
    pub exit_ebitda: Money,
    pub exit_ev: Money,
    pub exit_net_debt: Money,
    pub exit_equity: Money,
    pub sponsor_equity: Money,
    pub holding_period_years: Years,
    pub moic: Multiple,
    pub irr: Option<Rate>,
}

/// Compute MOIC/IRR off the exit bridge. `interim_distributions` holds any
/// intra-hold cash returned to the sponsor (dividend recaps); when empty,
/// IRR reduces to the closed-form `moic^(1/T) - 1` rather than a bisection
/// solve over a two-point series (§4.7/§9).
pub fn compute_returns(
    exit_ebitda: Money,
    exit_multiple: Multiple,
    exit_cash: Money,
    exit_total_debt: Money,
    sponsor_equity: Money,
    holding_period_years: u32,
    interim_distributions: &[Money],
    findings: &mut Vec<ValidationFinding>,
) -> ReturnsSummary {
    let exit_ev = exit_ebitda * exit_multiple;
    let exit_net_debt = exit_total_debt - exit_cash;
    // Not clamped at zero: a deal can genuinely exit underwater, and MOIC/IRR
    // need to reflect that rather than floor at a false break-even.
    let exit_equity = exit_ev - exit_net_debt;

    let moic = if sponsor_equity.is_zero() {
        Money::ZERO
    } else {
        exit_equity / sponsor_equity
    };

    let years = Years::from(holding_period_years);

    let irr = if interim_distributions.iter().all(|d| d.is_zero()) && moic > Money::ZERO {
        if years.is_zero() {
            None
        } else {
            // (exit_equity / sponsor_equity)^(1/T) - 1
            let exponent = Rate::ONE / years;
            Some(moic.powd(exponent) - Rate::ONE)
        }
    } else if !sponsor_equity.is_zero() {
        let mut cash_flows = Vec::with_capacity(interim_distributions.len() + 2);
        cash_flows.push(-sponsor_equity);
        cash_flows.extend_from_slice(interim_distributions);
        cash_flows.push(exit_equity);
        bisection_irr(&cash_flows)
    } else {
        None
    };

    if irr.is_none() {
        findings.push(ValidationFinding::warning(
            "irr_not_found",
            "IRR could not be solved for this cash flow series within the bisection bounds [-99%, 1000%]".to_string(),
        ));
    }

    ReturnsSummary {
        exit_ebitda,
        exit_ev,
        exit_net_debt,
        exit_equity,
        sponsor_equity,
        holding_period_years: years,
        moic,
        irr,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_form_irr_matches_moic_relationship() {
        let mut findings = Vec::new();
        let summary = compute_returns(
            dec!(150_000),
            dec!(8.0),
            dec!(50_000),
            dec!(300_000),
            dec!(500_000),
            5,
            &[],
            &mut findings,
        );
        assert_eq!(summary.moic, summary.exit_equity / dec!(500_000));
        let irr = summary.irr.unwrap();
        let recomposed = (Rate::ONE + irr).powd(dec!(5));
        assert!((recomposed - summary.moic).abs() < dec!(0.001));
    }

    #[test]
    fn interim_distributions_use_bisection_solver() {
        let mut findings = Vec::new();
        let summary = compute_returns(
            dec!(150_000),
            dec!(8.0),
            dec!(50_000),
            dec!(300_000),
            dec!(500_000),
            5,
            &[dec!(20_000), dec!(20_000)],
            &mut findings,
        );
        assert!(summary.irr.is_some());
    }

    #[test]
    fn zero_sponsor_equity_yields_zero_moic() {
        let mut findings = Vec::new();
        let summary = compute_returns(
            dec!(150_000),
            dec!(8.0),
            dec!(50_000),
            dec!(300_000),
            dec!(0),
            5,
            &[],
            &mut findings,
        );
        assert_eq!(summary.moic, Money::ZERO);
        assert!(summary.irr.is_none());
        assert!(findings.iter().any(|f| f.code == "irr_not_found"));
    }
}
