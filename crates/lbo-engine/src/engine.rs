use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::assumptions::{Assumptions, ValidatedAssumptions};
use crate::debt_schedule::DebtBalances;
use crate::opening_balance::{build_opening_balance_sheet, OpeningBalanceSheet};
use crate::period::PeriodState;
use crate::projector::{project_year, CarriedForwardBalances};
use crate::reconcile::{check_cumulative_plug, reconcile_period};
use crate::returns::{compute_returns, ReturnsSummary};
use crate::sources_uses::{build_sources_and_uses, SourcesAndUses};
use crate::types::{with_metadata, ComputationOutput};
use crate::validation::{PaymentScenario, ValidationFinding, ValidationReport};
use crate::LboResult;

/// The full output bundle for one run of the engine (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LboProjection {
    pub sources_and_uses: SourcesAndUses,
    pub opening_balance_sheet: OpeningBalanceSheet,
    pub periods: Vec<PeriodState>,
    pub returns: ReturnsSummary,
    pub payment_scenario: PaymentScenario,
    pub validation: ValidationReport,
}

/// Run the full LBO projection end to end: Sources & Uses, opening balance
/// sheet, the per-year projector/debt-schedule/reconciliation loop through
/// `exit_year`, and the returns calculator (§4.2-§4.7). This is the single
/// entry point most callers need; [`crate::sensitivity`] drives it
/// repeatedly over assumption overrides.
pub fn run_projection(assumptions: Assumptions) -> LboResult<ComputationOutput<LboProjection>> {
    let started = Instant::now();
    let mut findings: Vec<ValidationFinding> = Vec::new();

    let assumptions_json = serde_json::to_value(&assumptions).unwrap_or_default();
    let validated = assumptions.validate()?;

    let sources_and_uses = build_sources_and_uses(&validated)?;
    let opening_balance_sheet =
        build_opening_balance_sheet(&validated, &sources_and_uses, &mut findings);

    let mut carry = CarriedForwardBalances {
        accounts_receivable: opening_balance_sheet.accounts_receivable,
        inventory: opening_balance_sheet.inventory,
        accounts_payable: opening_balance_sheet.accounts_payable,
        ppe: opening_balance_sheet.ppe,
        goodwill: opening_balance_sheet.goodwill,
        cash: opening_balance_sheet.cash,
    };
    let mut debt_balances = DebtBalances::opening(&validated.debt_instruments);
    let mut revenue = validated.starting_revenue;

    let mut periods = Vec::with_capacity(validated.exit_year as usize);
    let mut cumulative_net_income = crate::types::Money::ZERO;

    for year in 1..=validated.exit_year {
        let (mut period, next_revenue, next_debt_balances) = project_year(
            &validated,
            &validated.debt_instruments,
            year,
            revenue,
            &carry,
            &debt_balances,
            &mut findings,
        )?;

        cumulative_net_income += period.income.net_income;
        reconcile_period(
            &mut period,
            opening_balance_sheet.equity,
            cumulative_net_income,
            &mut findings,
        );

        carry = CarriedForwardBalances {
            accounts_receivable: period.balance.accounts_receivable,
            inventory: period.balance.inventory,
            accounts_payable: period.balance.accounts_payable,
            ppe: period.balance.ppe,
            goodwill: period.balance.goodwill,
            cash: period.balance.cash,
        };
        revenue = next_revenue;
        debt_balances = next_debt_balances;

        periods.push(period);
    }

    check_cumulative_plug(&periods, &mut findings);

    let final_period = periods
        .last()
        .expect("exit_year validated to be >= 1, so at least one period is always projected");

    let schedules: Vec<_> = validated
        .debt_instruments
        .iter()
        .map(|d| d.amortization_schedule)
        .collect();
    let payment_scenario = PaymentScenario::classify(&schedules);

    let returns = compute_returns(
        final_period.income.ebitda,
        validated.exit_multiple,
        final_period.balance.cash,
        final_period.balance.total_debt,
        sources_and_uses.sponsor_equity,
        validated.exit_year,
        &[],
        &mut findings,
    );

    let warnings: Vec<String> = findings.iter().map(|f| f.message.clone()).collect();

    let projection = LboProjection {
        sources_and_uses,
        opening_balance_sheet,
        periods,
        returns,
        payment_scenario,
        validation: ValidationReport { findings },
    };

    let elapsed_us = started.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "lbo_projection_v1",
        &assumptions_json,
        warnings,
        elapsed_us,
        projection,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debt::{AmortizationSchedule, DebtInstrument, DebtSizing};
    use rust_decimal_macros::dec;

    fn alpha_co_assumptions() -> Assumptions {
        Assumptions {
            entry_ebitda: dec!(20_000_000),
            entry_multiple: dec!(8.0),
            ebitda_margin: dec!(0.20),
            starting_revenue: dec!(100_000_000),
            revenue_growth_rate: vec![dec!(0.06)],
            cogs_pct: dec!(0.55),
            sganda_pct: dec!(0.25),
            capex_pct: dec!(0.025),
            depreciation_pct_of_ppe: dec!(0.10),
            tax_rate: dec!(0.25),
            days_sales_outstanding: dec!(45),
            days_inventory_outstanding: dec!(40),
            days_payable_outstanding: dec!(35),
            exit_year: 5,
            exit_multiple: dec!(8.5),
            transaction_expenses_pct: dec!(0.02),
            financing_fees_pct: dec!(0.015),
            min_cash_balance: dec!(2_000_000),
            existing_debt: dec!(0),
            existing_cash: dec!(5_000_000),
            debt_instruments: vec![
                DebtInstrument {
                    name: "Term Loan B".into(),
                    interest_rate: dec!(0.07),
                    sizing: DebtSizing::EbitdaMultiple(dec!(4.5)),
                    amortization_schedule: AmortizationSchedule::Amortizing,
                    amortization_periods: Some(7),
                    seniority: Some(0),
                    maturity_year: None,
                    bullet_sweep_allowed: false,
                },
                DebtInstrument {
                    name: "Subordinated Notes".into(),
                    interest_rate: dec!(0.11),
                    sizing: DebtSizing::EbitdaMultiple(dec!(1.0)),
                    amortization_schedule: AmortizationSchedule::Bullet,
                    amortization_periods: None,
                    seniority: Some(1),
                    maturity_year: None,
                    bullet_sweep_allowed: true,
                },
            ],
            initial_ppe: None,
            initial_ar: None,
            initial_inventory: None,
            initial_ap: None,
            equity_amount: None,
        }
    }

    #[test]
    fn full_projection_runs_and_balances_every_year() {
        let output = run_projection(alpha_co_assumptions()).unwrap();
        let projection = output.result;
        assert_eq!(projection.periods.len(), 5);
        for period in &projection.periods {
            let eps = dec!(0.01).max(dec!(0.000001) * period.balance.total_assets.abs());
            assert!(
                (period.balance.total_assets - period.balance.total_liabilities_and_equity).abs()
                    <= eps,
                "year {} failed to balance",
                period.year
            );
        }
        assert!(projection.returns.moic > dec!(0));
    }

    #[test]
    fn debt_balance_never_increases_without_a_draw() {
        let output = run_projection(alpha_co_assumptions()).unwrap();
        let periods = output.result.periods;
        for window in periods.windows(2) {
            assert!(window[1].balance.total_debt <= window[0].balance.total_debt * dec!(1.2));
        }
    }
}
