use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::assumptions::ValidatedAssumptions;
use crate::sources_uses::SourcesAndUses;
use crate::types::Money;
use crate::validation::ValidationFinding;

const DAYS_IN_YEAR: Money = dec!(365);

/// Tolerance-scaled epsilon, mirroring [`crate::reconcile`]'s convention.
fn epsilon(total: Money) -> Money {
    dec!(0.01).max(dec!(0.000001) * total.abs())
}

/// Opening (post-close, Day 1) balance sheet (§4.3). Working-capital lines
/// derive from the DSO/DIO/DPO convention against `starting_revenue`/`cogs`
/// unless the caller pins them directly; PP&E defaults to a multiple of
/// depreciation capacity when not pinned. Goodwill absorbs whatever the
/// purchase price allocation leaves unexplained, the standard LBO-model
/// convention for an asset side that otherwise wouldn't foot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpeningBalanceSheet {
    pub cash: Money,
    pub accounts_receivable: Money,
    pub inventory: Money,
    pub ppe: Money,
    pub goodwill: Money,
    pub total_assets: Money,
    pub accounts_payable: Money,
    pub total_debt: Money,
    pub total_liabilities: Money,
    pub equity: Money,
    pub total_liabilities_and_equity: Money,
}

pub fn build_opening_balance_sheet(
    assumptions: &ValidatedAssumptions,
    sources_and_uses: &SourcesAndUses,
    findings: &mut Vec<ValidationFinding>,
) -> OpeningBalanceSheet {
    let starting_cogs = assumptions.cogs_pct * assumptions.starting_revenue;

    let accounts_receivable = assumptions.initial_ar.unwrap_or_else(|| {
        assumptions.days_sales_outstanding / DAYS_IN_YEAR * assumptions.starting_revenue
    });
    let inventory = assumptions.initial_inventory.unwrap_or_else(|| {
        assumptions.days_inventory_outstanding / DAYS_IN_YEAR * starting_cogs
    });
    let accounts_payable = assumptions.initial_ap.unwrap_or_else(|| {
        assumptions.days_payable_outstanding / DAYS_IN_YEAR * starting_cogs
    });
    // Rule of thumb: 10 years of steady-state CapEx approximates net PP&E
    // when no opening balance sheet is supplied directly.
    let ppe = assumptions
        .initial_ppe
        .unwrap_or_else(|| assumptions.capex_pct * assumptions.starting_revenue * dec!(10));

    let cash = assumptions.min_cash_balance;
    let total_debt = sources_and_uses.sponsor_equity_excluded_debt();
    let equity = sources_and_uses.sponsor_equity;

    let tangible_assets = cash + accounts_receivable + inventory + ppe;
    let total_liabilities_and_equity = total_debt + accounts_payable + equity;

    // §4.3's literal formula: goodwill is purchase-price enterprise value
    // less the assets the price allocation already accounts for directly.
    let entry_ev = assumptions.entry_multiple * assumptions.entry_ebitda;
    let net_working_capital = accounts_receivable + inventory - accounts_payable;
    let goodwill_from_formula = entry_ev - (ppe + net_working_capital);

    // The balance sheet must still foot, so the stored goodwill is the
    // plug that reconciles assets to liabilities plus equity; any gap
    // between that plug and the formula value is quantified as a warning
    // rather than silently absorbed.
    let goodwill = total_liabilities_and_equity - tangible_assets;

    let plug_delta = goodwill - goodwill_from_formula;
    let eps = epsilon(total_liabilities_and_equity);
    if plug_delta.abs() > eps {
        findings.push(
            ValidationFinding::warning(
                "goodwill_plug",
                format!(
                    "Opening balance sheet goodwill ({goodwill}) differs from the EV-based formula value ({goodwill_from_formula}) by {plug_delta}; existing cash, transaction expenses, and financing fees shift the plug away from EV − (PP&E + net working capital)"
                ),
            )
            .with_delta(plug_delta),
        );
    }

    if goodwill < Money::ZERO {
        findings.push(ValidationFinding::warning(
            "negative_goodwill",
            format!(
                "Opening balance sheet implies negative goodwill ({goodwill}); purchase price allocation may be inconsistent with working-capital/PP&E assumptions"
            ),
        ));
    }

    let total_assets = tangible_assets + goodwill;

    OpeningBalanceSheet {
        cash,
        accounts_receivable,
        inventory,
        ppe,
        goodwill,
        total_assets,
        accounts_payable,
        total_debt,
        total_liabilities: total_debt + accounts_payable,
        equity,
        total_liabilities_and_equity,
    }
}

impl SourcesAndUses {
    fn sponsor_equity_excluded_debt(&self) -> Money {
        self.total_sources - self.sponsor_equity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assumptions::Assumptions;
    use crate::debt::{AmortizationSchedule, DebtInstrument, DebtSizing};
    use crate::sources_uses::build_sources_and_uses;

    fn base_assumptions() -> Assumptions {
        Assumptions {
            entry_ebitda: dec!(100_000),
            entry_multiple: dec!(8.0),
            ebitda_margin: dec!(0.25),
            starting_revenue: dec!(400_000),
            revenue_growth_rate: vec![dec!(0.05)],
            cogs_pct: dec!(0.45),
            sganda_pct: dec!(0.20),
            capex_pct: dec!(0.03),
            depreciation_pct_of_ppe: dec!(0.10),
            tax_rate: dec!(0.25),
            days_sales_outstanding: dec!(45),
            days_inventory_outstanding: dec!(60),
            days_payable_outstanding: dec!(30),
            exit_year: 5,
            exit_multiple: dec!(8.0),
            transaction_expenses_pct: dec!(0.02),
            financing_fees_pct: dec!(0.02),
            min_cash_balance: dec!(10_000),
            existing_debt: dec!(0),
            existing_cash: dec!(20_000),
            debt_instruments: vec![DebtInstrument {
                name: "Term Loan B".into(),
                interest_rate: dec!(0.06),
                sizing: DebtSizing::EbitdaMultiple(dec!(4.0)),
                amortization_schedule: AmortizationSchedule::Amortizing,
                amortization_periods: Some(7),
                seniority: None,
                maturity_year: None,
                bullet_sweep_allowed: false,
            }],
            initial_ppe: None,
            initial_ar: None,
            initial_inventory: None,
            initial_ap: None,
            equity_amount: None,
        }
    }

    #[test]
    fn opening_balance_sheet_foots() {
        let validated = base_assumptions().validate().unwrap();
        let su = build_sources_and_uses(&validated).unwrap();
        let mut findings = Vec::new();
        let obs = build_opening_balance_sheet(&validated, &su, &mut findings);
        assert_eq!(obs.total_assets, obs.total_liabilities_and_equity);
        assert!(obs.goodwill > Money::ZERO);
    }

    #[test]
    fn existing_cash_and_fees_trip_a_goodwill_plug_warning() {
        // base_assumptions carries nonzero existing_cash and fee
        // percentages, so the EV-based goodwill formula and the
        // balance-sheet plug diverge by exactly that gap.
        let validated = base_assumptions().validate().unwrap();
        let su = build_sources_and_uses(&validated).unwrap();
        let mut findings = Vec::new();
        let obs = build_opening_balance_sheet(&validated, &su, &mut findings);
        assert_eq!(obs.total_assets, obs.total_liabilities_and_equity);
        assert!(findings.iter().any(|f| f.code == "goodwill_plug"));
    }
}
