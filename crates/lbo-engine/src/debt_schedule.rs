use rust_decimal_macros::dec;

use crate::debt::{AmortizationSchedule, DebtScheduleRow, ResolvedDebtInstrument};
use crate::error::LboError;
use crate::types::Money;
use crate::validation::ValidationFinding;
use crate::LboResult;

/// Synthetic tranche name for the revolver draw that covers a liquidity
/// shortfall. Carries a 0% rate and is repaid first out of any sweep —
/// the cheapest, most liquid form of the stack (§4.5/§9).
pub const REVOLVER_NAME: &str = "Revolver";

/// Per-instrument beginning balances for one projection year, carried
/// forward year over year by [`crate::engine`]. Indexed in lockstep with
/// the resolved debt stack; the revolver is tracked separately since it
/// isn't part of the caller-supplied instrument list.
#[derive(Debug, Clone, Default)]
pub struct DebtBalances {
    pub tranche_balances: Vec<Money>,
    pub revolver_balance: Money,
}

impl DebtBalances {
    pub fn opening(instruments: &[ResolvedDebtInstrument]) -> Self {
        Self {
            tranche_balances: instruments.iter().map(|d| d.original_amount).collect(),
            revolver_balance: Money::ZERO,
        }
    }

    pub fn total(&self) -> Money {
        self.tranche_balances.iter().sum::<Money>() + self.revolver_balance
    }
}

/// Result of running the debt schedule solver for a single year.
pub struct DebtYearResult {
    pub rows: Vec<DebtScheduleRow>,
    pub ending_balances: DebtBalances,
    pub interest_expense: Money,
    pub scheduled_principal_total: Money,
    pub sweep_principal_total: Money,
    pub revolver_draw: Money,
    pub cash_ending: Money,
}

fn scheduled_principal(
    instrument: &ResolvedDebtInstrument,
    beginning: Money,
    year: u32,
    exit_year: u32,
) -> Money {
    if beginning.is_zero() {
        return Money::ZERO;
    }
    match instrument.amortization_schedule {
        AmortizationSchedule::Bullet => {
            let due_year = instrument.maturity_year.unwrap_or(exit_year).min(exit_year);
            if year == due_year {
                beginning
            } else {
                Money::ZERO
            }
        }
        AmortizationSchedule::Amortizing => {
            let periods = instrument.amortization_periods.unwrap_or(1).max(1);
            if year > periods {
                return Money::ZERO;
            }
            let level = instrument.original_amount / Money::from(periods);
            level.min(beginning)
        }
        AmortizationSchedule::CashFlowSweep => Money::ZERO,
    }
}

/// Interest on beginning balances only (§4.5/§9): this is what keeps the
/// three-statement loop non-circular. Never interest on the balance after
/// this year's amortization or sweep.
pub fn interest_for_year(instruments: &[ResolvedDebtInstrument], balances: &DebtBalances) -> Money {
    instruments
        .iter()
        .zip(balances.tranche_balances.iter())
        .map(|(inst, bal)| inst.interest_rate * bal)
        .sum()
}

/// Run the sweep-aware debt schedule for a single year (§4.5): scheduled
/// principal first, then any free cash flow left after scheduled service and
/// the minimum cash requirement sweeps sweep-eligible tranches in seniority
/// order (lowest `seniority` first), revolver repaid ahead of the stack. A
/// shortfall against scheduled principal or the minimum cash balance draws
/// the revolver rather than halting — liquidity issues are warnings, not
/// errors (§7).
#[allow(clippy::too_many_arguments)]
pub fn run_debt_schedule_year(
    instruments: &[ResolvedDebtInstrument],
    beginning: &DebtBalances,
    year: u32,
    exit_year: u32,
    cash_beginning: Money,
    fcf_available_for_debt: Money,
    min_cash_balance: Money,
    findings: &mut Vec<ValidationFinding>,
) -> LboResult<DebtYearResult> {
    if instruments.len() != beginning.tranche_balances.len() {
        return Err(LboError::CalculationError {
            period: year,
            line_item: "debt_schedule".into(),
            reason: "instrument count does not match carried-forward balance count".into(),
        });
    }

    let mut ending_tranche_balances = beginning.tranche_balances.clone();
    let mut scheduled_by_tranche = vec![Money::ZERO; instruments.len()];

    for (idx, instrument) in instruments.iter().enumerate() {
        let begin = beginning.tranche_balances[idx];
        let scheduled = scheduled_principal(instrument, begin, year, exit_year);
        scheduled_by_tranche[idx] = scheduled;
        ending_tranche_balances[idx] = begin - scheduled;
    }

    let scheduled_principal_total: Money = scheduled_by_tranche.iter().sum();
    let fcf_after_scheduled = fcf_available_for_debt - scheduled_principal_total;

    let available_pre_sweep = cash_beginning + fcf_after_scheduled;

    // Three-tier minimum-cash policy (§4.5): a surplus above min_cash sweeps
    // as before; a dip that stays non-negative is tolerated and just
    // disclosed; only an actual cash deficit draws the revolver, sized to
    // the deficit itself rather than topped back up to the floor.
    let (revolver_draw, cash_before_sweep, mut excess_for_sweep) = if available_pre_sweep < Money::ZERO {
        (-available_pre_sweep, Money::ZERO, Money::ZERO)
    } else if available_pre_sweep < min_cash_balance {
        (Money::ZERO, available_pre_sweep, Money::ZERO)
    } else {
        (Money::ZERO, min_cash_balance, available_pre_sweep - min_cash_balance)
    };

    if revolver_draw > Money::ZERO {
        findings.push(
            ValidationFinding::warning(
                "revolver_draw",
                format!("Drew {revolver_draw} on the revolver to cover a cash shortfall in year {year}"),
            )
            .at_period(year)
            .with_delta(revolver_draw),
        );
    } else if available_pre_sweep < min_cash_balance {
        let shortfall = min_cash_balance - available_pre_sweep;
        findings.push(
            ValidationFinding::warning(
                "liquidity_shortfall",
                format!(
                    "Cash fell {shortfall} short of the minimum cash balance in year {year}; scheduled principal was paid in full and no revolver was drawn"
                ),
            )
            .at_period(year)
            .with_delta(shortfall),
        );
    }

    let mut revolver_balance = beginning.revolver_balance + revolver_draw;
    let revolver_repaid = excess_for_sweep.min(revolver_balance);
    revolver_balance -= revolver_repaid;
    excess_for_sweep -= revolver_repaid;

    let mut sweep_order: Vec<usize> = (0..instruments.len()).collect();
    sweep_order.sort_by_key(|&i| instruments[i].seniority);

    let mut sweep_by_tranche = vec![Money::ZERO; instruments.len()];
    for idx in sweep_order {
        if excess_for_sweep.is_zero() {
            break;
        }
        if !instruments[idx].is_sweep_eligible() {
            continue;
        }
        let remaining_balance = ending_tranche_balances[idx];
        let applied = excess_for_sweep.min(remaining_balance);
        sweep_by_tranche[idx] = applied;
        ending_tranche_balances[idx] -= applied;
        excess_for_sweep -= applied;
    }

    let sweep_principal_total: Money = sweep_by_tranche.iter().sum();
    if excess_for_sweep > Money::ZERO {
        findings.push(ValidationFinding::info(
            "sweep_excess_to_cash",
            format!(
                "No sweep-eligible debt remained to absorb {excess_for_sweep} of excess cash in year {year}; building cash balance instead"
            ),
        ).at_period(year));
    }

    let cash_ending = cash_before_sweep + excess_for_sweep;

    if year == exit_year {
        for (idx, instrument) in instruments.iter().enumerate() {
            let residual = ending_tranche_balances[idx];
            if residual > Money::ZERO {
                findings.push(
                    ValidationFinding::warning(
                        "exit_debt",
                        format!(
                            "{} still carries a balance of {residual} at exit in year {year}",
                            instrument.name
                        ),
                    )
                    .at_period(year)
                    .with_delta(residual),
                );
            }
        }
    }

    let interest_expense = interest_for_year(instruments, beginning);

    let mut rows: Vec<DebtScheduleRow> = instruments
        .iter()
        .enumerate()
        .map(|(idx, instrument)| DebtScheduleRow {
            year,
            instrument: instrument.name.clone(),
            beginning: beginning.tranche_balances[idx],
            interest: instrument.interest_rate * beginning.tranche_balances[idx],
            scheduled_principal: scheduled_by_tranche[idx],
            sweep_principal: sweep_by_tranche[idx],
            ending: ending_tranche_balances[idx],
        })
        .collect();

    if beginning.revolver_balance > Money::ZERO || revolver_draw > Money::ZERO {
        rows.push(DebtScheduleRow {
            year,
            instrument: REVOLVER_NAME.to_string(),
            beginning: beginning.revolver_balance,
            interest: Money::ZERO,
            scheduled_principal: dec!(0),
            sweep_principal: revolver_repaid,
            ending: revolver_balance,
        });
    }

    Ok(DebtYearResult {
        rows,
        ending_balances: DebtBalances {
            tranche_balances: ending_tranche_balances,
            revolver_balance,
        },
        interest_expense,
        scheduled_principal_total,
        sweep_principal_total,
        revolver_draw,
        cash_ending,
    })
}
