use serde::{Deserialize, Serialize};

use crate::error::LboError;
use crate::types::{Money, Rate};
use crate::LboResult;

/// Repayment shape for a debt tranche.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmortizationSchedule {
    /// No scheduled principal; full balance due at maturity/exit.
    Bullet,
    /// Level principal of `original_amount / amortization_periods` per year.
    Amortizing,
    /// No scheduled principal; repaid only through the cash sweep.
    CashFlowSweep,
}

/// Either side of the "exactly one of amount / ebitda_multiple" input rule
/// (§3, §4.1). Resolved against `entry_ebitda` at construction time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebtSizing {
    Amount(Money),
    EbitdaMultiple(Money),
}

/// A single debt tranche as supplied by the caller, before resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebtInstrument {
    pub name: String,
    pub interest_rate: Rate,
    pub sizing: DebtSizing,
    pub amortization_schedule: AmortizationSchedule,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amortization_periods: Option<u32>,
    /// Lower sorts first in the sweep order; ties broken by insertion order.
    /// Defaults to insertion order when left unset (§9, debt-tranche ordering).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seniority: Option<i32>,
    /// Final maturity year for `bullet` tranches, if earlier than the exit
    /// year; bullet principal falls due at `min(maturity_year, exit_year)`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maturity_year: Option<u32>,
    /// Allows a bullet tranche to still receive sweep principal ahead of its
    /// maturity, overriding the default sweep-eligible-by-type rule (§4.5).
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub bullet_sweep_allowed: bool,
}

/// A debt instrument after `amount`/`ebitda_multiple` resolution and input
/// validation — the shape the projector and debt solver actually consume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedDebtInstrument {
    pub name: String,
    pub interest_rate: Rate,
    pub original_amount: Money,
    pub amortization_schedule: AmortizationSchedule,
    pub amortization_periods: Option<u32>,
    pub seniority: i32,
    pub maturity_year: Option<u32>,
    pub bullet_sweep_allowed: bool,
}

impl ResolvedDebtInstrument {
    pub fn is_sweep_eligible(&self) -> bool {
        match self.amortization_schedule {
            AmortizationSchedule::Amortizing | AmortizationSchedule::CashFlowSweep => true,
            AmortizationSchedule::Bullet => self.bullet_sweep_allowed,
        }
    }
}

/// Resolve a caller-supplied debt stack against `entry_ebitda`, validating
/// the per-instrument invariants of §3/§4.1. Insertion order is preserved so
/// that unset `seniority` falls back to it (§9).
pub fn resolve_debt_stack(
    instruments: &[DebtInstrument],
    entry_ebitda: Money,
) -> LboResult<Vec<ResolvedDebtInstrument>> {
    let mut resolved = Vec::with_capacity(instruments.len());

    for (idx, instrument) in instruments.iter().enumerate() {
        let original_amount = match &instrument.sizing {
            DebtSizing::Amount(amount) => *amount,
            DebtSizing::EbitdaMultiple(multiple) => *multiple * entry_ebitda,
        };

        if original_amount <= Money::ZERO {
            return Err(LboError::InvalidInput {
                field: format!("debt_instrument[{idx}].sizing"),
                reason: "Resolved debt amount must be positive".into(),
                code: "invalid_debt_sizing",
            });
        }

        if matches!(
            instrument.amortization_schedule,
            AmortizationSchedule::Amortizing
        ) {
            match instrument.amortization_periods {
                Some(periods) if periods >= 1 => {}
                _ => {
                    return Err(LboError::InvalidInput {
                        field: format!("debt_instrument[{idx}].amortization_periods"),
                        reason: "Amortizing tranches require amortization_periods >= 1".into(),
                        code: "invalid_amortization_periods",
                    });
                }
            }
        }

        if instrument.interest_rate < Rate::ZERO {
            return Err(LboError::InvalidInput {
                field: format!("debt_instrument[{idx}].interest_rate"),
                reason: "Interest rate cannot be negative".into(),
                code: "invalid_interest_rate",
            });
        }

        resolved.push(ResolvedDebtInstrument {
            name: instrument.name.clone(),
            interest_rate: instrument.interest_rate,
            original_amount,
            amortization_schedule: instrument.amortization_schedule,
            amortization_periods: instrument.amortization_periods,
            seniority: instrument.seniority.unwrap_or(idx as i32),
            maturity_year: instrument.maturity_year,
            bullet_sweep_allowed: instrument.bullet_sweep_allowed,
        });
    }

    Ok(resolved)
}

/// One (instrument, year) row of the debt schedule (§3, §4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebtScheduleRow {
    pub year: u32,
    pub instrument: String,
    pub beginning: Money,
    pub interest: Money,
    pub scheduled_principal: Money,
    pub sweep_principal: Money,
    pub ending: Money,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn amount_instrument(amount: Money, schedule: AmortizationSchedule) -> DebtInstrument {
        DebtInstrument {
            name: "Senior".into(),
            interest_rate: dec!(0.06),
            sizing: DebtSizing::Amount(amount),
            amortization_schedule: schedule,
            amortization_periods: Some(5),
            seniority: None,
            maturity_year: None,
            bullet_sweep_allowed: false,
        }
    }

    #[test]
    fn resolves_fixed_amount() {
        let instruments = vec![amount_instrument(
            dec!(400_000),
            AmortizationSchedule::Amortizing,
        )];
        let resolved = resolve_debt_stack(&instruments, dec!(100_000)).unwrap();
        assert_eq!(resolved[0].original_amount, dec!(400_000));
    }

    #[test]
    fn resolves_ebitda_multiple() {
        let mut instrument = amount_instrument(dec!(0), AmortizationSchedule::Bullet);
        instrument.sizing = DebtSizing::EbitdaMultiple(dec!(4.0));
        let resolved = resolve_debt_stack(&[instrument], dec!(100_000)).unwrap();
        assert_eq!(resolved[0].original_amount, dec!(400_000));
    }

    #[test]
    fn defaults_seniority_to_insertion_order() {
        let instruments = vec![
            amount_instrument(dec!(100), AmortizationSchedule::Bullet),
            amount_instrument(dec!(200), AmortizationSchedule::Bullet),
        ];
        let resolved = resolve_debt_stack(&instruments, dec!(100_000)).unwrap();
        assert_eq!(resolved[0].seniority, 0);
        assert_eq!(resolved[1].seniority, 1);
    }

    #[test]
    fn amortizing_without_periods_is_rejected() {
        let mut instrument = amount_instrument(dec!(100), AmortizationSchedule::Amortizing);
        instrument.amortization_periods = None;
        assert!(resolve_debt_stack(&[instrument], dec!(100_000)).is_err());
    }

    #[test]
    fn zero_resolved_amount_is_rejected() {
        let instrument = amount_instrument(dec!(0), AmortizationSchedule::Bullet);
        assert!(resolve_debt_stack(&[instrument], dec!(100_000)).is_err());
    }
}
