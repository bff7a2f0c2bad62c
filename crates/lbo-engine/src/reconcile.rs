use rust_decimal_macros::dec;

use crate::period::PeriodState;
use crate::types::Money;
use crate::validation::ValidationFinding;

/// Tolerance-scaled epsilon for balance-sheet reconciliation: the larger of
/// an absolute floor and a fraction of total assets, mirroring the Sources &
/// Uses tolerance convention (§4.6/§9).
fn epsilon(total_assets: Money) -> Money {
    dec!(0.01).max(dec!(0.000001) * total_assets.abs())
}

/// Cumulative plugs exceeding this fraction of final equity are flagged as
/// `suspect` rather than merely noted — the model likely has an upstream
/// bug, not just rounding (§4.6).
const SUSPECT_PLUG_FRACTION: Money = dec!(0.01);

/// Reconcile the rolled-forward balance sheet against the roll-forward
/// equity identity (opening equity + cumulative net income - cumulative net
/// distributions), plugging any residual into equity and recording a
/// `reconciliation_warning` finding whenever the plug exceeds tolerance
/// (§4.6).
pub fn reconcile_period(
    period: &mut PeriodState,
    opening_equity: Money,
    cumulative_net_income: Money,
    findings: &mut Vec<ValidationFinding>,
) -> Money {
    let derived_equity = period.balance.total_assets - period.balance.total_liabilities;
    let rolled_equity = opening_equity + cumulative_net_income;

    let plug = derived_equity - rolled_equity;
    let eps = epsilon(period.balance.total_assets);

    if plug.abs() > eps {
        findings.push(
            ValidationFinding::warning(
                "reconciliation_warning",
                format!(
                    "Balance sheet required an equity plug of {plug} in year {} to tie assets to liabilities plus rolled-forward equity",
                    period.year
                ),
            )
            .at_period(period.year)
            .with_delta(plug),
        );
    }

    period.balance.equity = derived_equity;
    period.balance.total_liabilities_and_equity = period.balance.total_liabilities + derived_equity;
    period.balance.equity_plug = plug;

    derived_equity
}

/// Check the running total of plugs against the suspect threshold once the
/// full projection is built (§4.6).
pub fn check_cumulative_plug(periods: &[PeriodState], findings: &mut Vec<ValidationFinding>) {
    let cumulative_plug: Money = periods.iter().map(|p| p.balance.equity_plug.abs()).sum();
    let Some(final_period) = periods.last() else {
        return;
    };
    if final_period.balance.equity.is_zero() {
        return;
    }
    let ratio = cumulative_plug / final_period.balance.equity.abs();
    if ratio > SUSPECT_PLUG_FRACTION {
        findings.push(ValidationFinding::warning(
            "reconciliation_plug_excessive",
            format!(
                "Cumulative equity plugs ({cumulative_plug}) exceed {}% of final equity ({}); treat this projection as suspect",
                SUSPECT_PLUG_FRACTION * dec!(100),
                final_period.balance.equity
            ),
        ));
    }
}
