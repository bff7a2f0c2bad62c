use serde::{Deserialize, Serialize};

use crate::debt::{resolve_debt_stack, DebtInstrument, ResolvedDebtInstrument};
use crate::error::LboError;
use crate::types::{Money, Rate};
use crate::LboResult;

/// Caller-supplied deal assumptions (§3). Percentages are always fractions
/// in `[0, 1]`, never `[0, 100]` — validated at construction via [`Assumptions::validate`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assumptions {
    pub entry_ebitda: Money,
    pub entry_multiple: Money,
    pub ebitda_margin: Rate,
    pub starting_revenue: Money,
    /// One growth rate per projection year; extended by repeating the last
    /// value if shorter than the hold period (§4.1).
    pub revenue_growth_rate: Vec<Rate>,
    pub cogs_pct: Rate,
    pub sganda_pct: Rate,
    pub capex_pct: Rate,
    pub depreciation_pct_of_ppe: Rate,
    pub tax_rate: Rate,
    pub days_sales_outstanding: Money,
    pub days_inventory_outstanding: Money,
    pub days_payable_outstanding: Money,
    pub exit_year: u32,
    pub exit_multiple: Money,
    pub transaction_expenses_pct: Rate,
    pub financing_fees_pct: Rate,
    pub min_cash_balance: Money,
    pub existing_debt: Money,
    pub existing_cash: Money,
    pub debt_instruments: Vec<DebtInstrument>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_ppe: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_ar: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_inventory: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_ap: Option<Money>,
    /// Overrides the equity contribution implied by Sources & Uses, if the
    /// caller wants to pin it rather than let it plug (§4.2).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equity_amount: Option<Money>,
}

/// Assumptions after per-field and cross-field validation, with the debt
/// stack resolved against `entry_ebitda`. Every downstream module consumes
/// this, never the raw [`Assumptions`].
#[derive(Debug, Clone)]
pub struct ValidatedAssumptions {
    pub raw: Assumptions,
    pub debt_instruments: Vec<ResolvedDebtInstrument>,
}

impl std::ops::Deref for ValidatedAssumptions {
    type Target = Assumptions;
    fn deref(&self) -> &Assumptions {
        &self.raw
    }
}

fn check_fraction(name: &str, value: Rate) -> LboResult<()> {
    if value < Rate::ZERO || value > Rate::from(10u32) {
        return Err(LboError::InvalidInput {
            field: name.into(),
            reason: format!(
                "{name} must be a fraction in a sane [0, 10] range, got {value}; did you mean a percentage (e.g. 0.21 instead of 21)?"
            ),
            code: "invalid_percentage",
        });
    }
    if value > Rate::ONE {
        return Err(LboError::InvalidInput {
            field: name.into(),
            reason: format!(
                "{name} = {value} looks like a percentage entered as a whole number; did you mean {}?",
                value / Rate::from(100u32)
            ),
            code: "invalid_percentage",
        });
    }
    Ok(())
}

fn check_nonnegative(name: &str, value: Money) -> LboResult<()> {
    if value < Money::ZERO {
        return Err(LboError::InvalidInput {
            field: name.into(),
            reason: format!("{name} cannot be negative, got {value}"),
            code: "negative_value",
        });
    }
    Ok(())
}

impl Assumptions {
    /// Validate and resolve into a [`ValidatedAssumptions`] ready for the
    /// rest of the engine. Mirrors the input-validation rules of §4.1.
    pub fn validate(mut self) -> LboResult<ValidatedAssumptions> {
        check_nonnegative("entry_ebitda", self.entry_ebitda)?;
        if self.entry_ebitda.is_zero() {
            return Err(LboError::InvalidInput {
                field: "entry_ebitda".into(),
                reason: "entry_ebitda must be positive".into(),
                code: "invalid_entry_ebitda",
            });
        }
        check_nonnegative("entry_multiple", self.entry_multiple)?;
        check_nonnegative("starting_revenue", self.starting_revenue)?;
        check_fraction("ebitda_margin", self.ebitda_margin)?;

        // starting_revenue of 0 means "derive it from margin" (§3) rather
        // than "this business has no revenue".
        if self.starting_revenue.is_zero() {
            if self.ebitda_margin.is_zero() {
                return Err(LboError::InvalidInput {
                    field: "starting_revenue".into(),
                    reason: "starting_revenue is 0 and ebitda_margin is 0, so revenue cannot be derived from entry_ebitda".into(),
                    code: "invalid_starting_revenue",
                });
            }
            self.starting_revenue = self.entry_ebitda / self.ebitda_margin;
        }
        check_fraction("cogs_pct", self.cogs_pct)?;
        check_fraction("sganda_pct", self.sganda_pct)?;
        check_fraction("capex_pct", self.capex_pct)?;
        check_fraction("depreciation_pct_of_ppe", self.depreciation_pct_of_ppe)?;
        check_fraction("tax_rate", self.tax_rate)?;
        check_fraction("transaction_expenses_pct", self.transaction_expenses_pct)?;
        check_fraction("financing_fees_pct", self.financing_fees_pct)?;
        check_nonnegative("days_sales_outstanding", self.days_sales_outstanding)?;
        check_nonnegative("days_inventory_outstanding", self.days_inventory_outstanding)?;
        check_nonnegative("days_payable_outstanding", self.days_payable_outstanding)?;
        check_nonnegative("min_cash_balance", self.min_cash_balance)?;
        check_nonnegative("existing_debt", self.existing_debt)?;
        check_nonnegative("existing_cash", self.existing_cash)?;

        if self.exit_year == 0 {
            return Err(LboError::InvalidInput {
                field: "exit_year".into(),
                reason: "exit_year must be at least 1".into(),
                code: "invalid_exit_year",
            });
        }

        if self.revenue_growth_rate.is_empty() {
            return Err(LboError::InvalidInput {
                field: "revenue_growth_rate".into(),
                reason: "revenue_growth_rate must contain at least one entry".into(),
                code: "invalid_revenue_growth_rate",
            });
        }
        for rate in &self.revenue_growth_rate {
            if *rate < Rate::from(-1i32) {
                return Err(LboError::InvalidInput {
                    field: "revenue_growth_rate".into(),
                    reason: format!("growth rate {rate} implies negative revenue"),
                    code: "invalid_revenue_growth_rate",
                });
            }
        }
        // Extend a shorter series by repeating the last year's rate (§4.1).
        let exit_year = self.exit_year as usize;
        if self.revenue_growth_rate.len() < exit_year {
            let last = *self.revenue_growth_rate.last().unwrap();
            self.revenue_growth_rate
                .resize(exit_year, last);
        }

        let entry_ev = self.entry_multiple * self.entry_ebitda;
        if entry_ev <= Money::ZERO {
            return Err(LboError::InvalidInput {
                field: "entry_multiple".into(),
                reason: "entry_multiple * entry_ebitda must be positive".into(),
                code: "invalid_entry_ev",
            });
        }

        let debt_instruments = resolve_debt_stack(&self.debt_instruments, self.entry_ebitda)?;

        let total_debt: Money = debt_instruments.iter().map(|d| d.original_amount).sum();
        if total_debt > entry_ev {
            return Err(LboError::SourcesUsesImbalance {
                sources: total_debt,
                uses: entry_ev,
                tolerance: Money::ZERO,
            });
        }

        Ok(ValidatedAssumptions {
            raw: self,
            debt_instruments,
        })
    }
}
