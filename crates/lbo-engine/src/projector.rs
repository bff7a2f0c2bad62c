use rust_decimal_macros::dec;

use crate::assumptions::ValidatedAssumptions;
use crate::debt_schedule::{interest_for_year, run_debt_schedule_year, DebtBalances};
use crate::period::{BalanceLine, CashFlowLine, IncomeLine, PeriodState};
use crate::types::Money;
use crate::validation::ValidationFinding;
use crate::LboResult;

const DAYS_IN_YEAR: Money = dec!(365);

/// Working-capital and PP&E state carried from one year into the next, the
/// minimal slice of the prior balance sheet the projector actually needs
/// (§4.4).
#[derive(Debug, Clone)]
pub struct CarriedForwardBalances {
    pub accounts_receivable: Money,
    pub inventory: Money,
    pub accounts_payable: Money,
    pub ppe: Money,
    pub goodwill: Money,
    pub cash: Money,
}

/// Project a single year's income statement, cash flow, and balance sheet
/// and settle the debt schedule for that year in one pass (§4.4 + §4.5).
/// Revenue compounds off the prior year's revenue (or `starting_revenue` for
/// year 1) at `revenue_growth_rate[year - 1]`.
pub fn project_year(
    assumptions: &ValidatedAssumptions,
    debt_instruments: &[crate::debt::ResolvedDebtInstrument],
    year: u32,
    prior_revenue: Money,
    prior: &CarriedForwardBalances,
    debt_beginning: &DebtBalances,
    findings: &mut Vec<ValidationFinding>,
) -> LboResult<(PeriodState, Money, DebtBalances)> {
    let growth_rate = assumptions
        .revenue_growth_rate
        .get((year - 1) as usize)
        .copied()
        .unwrap_or_else(|| *assumptions.revenue_growth_rate.last().unwrap());

    let revenue = prior_revenue * (Money::ONE + growth_rate);
    let cogs = assumptions.cogs_pct * revenue;
    let gross_profit = revenue - cogs;
    let sganda = assumptions.sganda_pct * revenue;
    let ebitda = gross_profit - sganda;
    let depreciation = assumptions.depreciation_pct_of_ppe * prior.ppe;
    let ebit = ebitda - depreciation;

    let interest_expense = interest_for_year(debt_instruments, debt_beginning);
    let pretax_income = ebit - interest_expense;
    // Losses carry no immediate tax benefit in this model; a deferred-tax
    // asset for NOL carryforwards is out of scope (§4.1 Non-goals).
    let tax = pretax_income.max(Money::ZERO) * assumptions.tax_rate;
    let net_income = pretax_income - tax;

    let accounts_receivable = assumptions.days_sales_outstanding / DAYS_IN_YEAR * revenue;
    let inventory = assumptions.days_inventory_outstanding / DAYS_IN_YEAR * cogs;
    let accounts_payable = assumptions.days_payable_outstanding / DAYS_IN_YEAR * cogs;

    let prior_net_wc = prior.accounts_receivable + prior.inventory - prior.accounts_payable;
    let net_wc = accounts_receivable + inventory - accounts_payable;
    let change_in_working_capital = net_wc - prior_net_wc;

    let capex = assumptions.capex_pct * revenue;
    let ppe = prior.ppe + capex - depreciation;

    let cash_from_operations = net_income + depreciation - change_in_working_capital;
    let cash_from_investing = -capex;
    let free_cash_flow_available_for_debt = cash_from_operations + cash_from_investing;

    let debt_result = run_debt_schedule_year(
        debt_instruments,
        debt_beginning,
        year,
        assumptions.exit_year,
        prior.cash,
        free_cash_flow_available_for_debt,
        assumptions.min_cash_balance,
        findings,
    )?;

    let scheduled_debt_repayment = debt_result.scheduled_principal_total;
    let sweep_debt_repayment = debt_result.sweep_principal_total;
    let revolver_draw = debt_result.revolver_draw;
    let cash_from_financing =
        revolver_draw - scheduled_debt_repayment - sweep_debt_repayment - debt_result
            .ending_balances
            .revolver_balance
            .min(debt_beginning.revolver_balance);
    let net_change_in_cash = debt_result.cash_ending - prior.cash;

    let income = IncomeLine {
        year,
        revenue,
        cogs,
        gross_profit,
        sganda,
        ebitda,
        depreciation,
        ebit,
        interest_expense,
        pretax_income,
        tax,
        net_income,
    };

    let cash_flow = CashFlowLine {
        year,
        net_income,
        depreciation_addback: depreciation,
        change_in_working_capital,
        cash_from_operations,
        capex,
        cash_from_investing,
        scheduled_debt_repayment,
        sweep_debt_repayment,
        revolver_draw,
        cash_from_financing,
        net_change_in_cash,
        free_cash_flow_available_for_debt,
    };

    let total_debt = debt_result.ending_balances.total();
    let total_assets = debt_result.cash_ending + accounts_receivable + inventory + ppe + prior.goodwill;
    let total_liabilities = total_debt + accounts_payable;
    // Equity rolls forward by net income; reconciliation against the direct
    // balance-sheet derivation (and any resulting plug) happens in
    // `crate::reconcile` once the year's cash flow is final.
    let balance = BalanceLine {
        year,
        cash: debt_result.cash_ending,
        accounts_receivable,
        inventory,
        ppe,
        goodwill: prior.goodwill,
        total_assets,
        accounts_payable,
        total_debt,
        total_liabilities,
        equity: Money::ZERO,
        total_liabilities_and_equity: Money::ZERO,
        equity_plug: Money::ZERO,
    };

    let period = PeriodState {
        year,
        income,
        balance,
        cash_flow,
        debt_schedule: debt_result.rows,
    };

    Ok((period, revenue, debt_result.ending_balances))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assumptions::Assumptions;
    use crate::debt::{resolve_debt_stack, AmortizationSchedule, DebtInstrument, DebtSizing};

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
    fn projects_first_year_without_panicking() {
        let validated = base_assumptions().validate().unwrap();
        let debt_instruments =
            resolve_debt_stack(&validated.raw.debt_instruments, validated.entry_ebitda).unwrap();
        let prior = CarriedForwardBalances {
            accounts_receivable: dec!(49_315),
            inventory: dec!(29_589),
            accounts_payable: dec!(14_795),
            ppe: dec!(200_000),
            goodwill: dec!(100_000),
            cash: dec!(10_000),
        };
        let debt_beginning = DebtBalances::opening(&debt_instruments);
        let mut findings = Vec::new();

        let (period, next_revenue, next_debt) = project_year(
            &validated,
            &debt_instruments,
            1,
            validated.starting_revenue,
            &prior,
            &debt_beginning,
            &mut findings,
        )
        .unwrap();

        assert!(period.income.revenue > validated.starting_revenue);
        assert_eq!(next_revenue, period.income.revenue);
        assert!(next_debt.total() <= debt_beginning.total());
    }
}
