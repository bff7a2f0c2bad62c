use serde::{Deserialize, Serialize};

use crate::assumptions::ValidatedAssumptions;
use crate::error::LboError;
use crate::types::Money;
use crate::LboResult;

/// Balance tolerance for Sources & Uses: the larger of an absolute floor and
/// a relative fraction of total uses, so a billion-dollar deal isn't held to
/// the same penny as a five-million-dollar one (§4.2/§9).
const ABSOLUTE_TOLERANCE: Money = rust_decimal_macros::dec!(0.01);
const RELATIVE_TOLERANCE: Money = rust_decimal_macros::dec!(0.000001);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesUsesLine {
    pub label: String,
    pub amount: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesAndUses {
    pub sources: Vec<SourcesUsesLine>,
    pub uses: Vec<SourcesUsesLine>,
    pub total_sources: Money,
    pub total_uses: Money,
    pub sponsor_equity: Money,
}

/// Build the Sources & Uses table (§4.2). Equity purchase price bridges EV
/// to equity value the standard way (EV − existing debt + existing cash);
/// existing debt is then refinanced as a separate use, so the net effect of
/// existing cash is to reduce the buyer's total funding need once existing
/// debt is retired in full. Financing fees are a percentage of new debt
/// raised, not of EV. Sources are the resolved debt stack plus a sponsor
/// equity plug sized to balance, or the caller-pinned `equity_amount` when
/// supplied.
pub fn build_sources_and_uses(assumptions: &ValidatedAssumptions) -> LboResult<SourcesAndUses> {
    let entry_ev = assumptions.entry_multiple * assumptions.entry_ebitda;
    let transaction_expenses = assumptions.transaction_expenses_pct * entry_ev;

    let total_new_debt: Money = assumptions
        .debt_instruments
        .iter()
        .map(|d| d.original_amount)
        .sum();
    let financing_fees = assumptions.financing_fees_pct * total_new_debt;

    let equity_purchase_price = entry_ev - assumptions.existing_debt + assumptions.existing_cash;

    let mut uses = vec![SourcesUsesLine {
        label: "Purchase of equity".into(),
        amount: equity_purchase_price,
    }];
    if assumptions.existing_debt > Money::ZERO {
        uses.push(SourcesUsesLine {
            label: "Refinance existing debt".into(),
            amount: assumptions.existing_debt,
        });
    }
    uses.push(SourcesUsesLine {
        label: "Transaction expenses".into(),
        amount: transaction_expenses,
    });
    uses.push(SourcesUsesLine {
        label: "Financing fees".into(),
        amount: financing_fees,
    });

    let total_uses: Money = uses.iter().map(|l| l.amount).sum();

    let mut sources: Vec<SourcesUsesLine> = assumptions
        .debt_instruments
        .iter()
        .map(|d| SourcesUsesLine {
            label: d.name.clone(),
            amount: d.original_amount,
        })
        .collect();

    let sponsor_equity = match assumptions.equity_amount {
        Some(pinned) => pinned,
        None => total_uses - total_new_debt,
    };

    if sponsor_equity < Money::ZERO {
        return Err(LboError::SourcesUsesImbalance {
            sources: total_new_debt,
            uses: total_uses,
            tolerance: ABSOLUTE_TOLERANCE,
        });
    }

    sources.push(SourcesUsesLine {
        label: "Sponsor equity".into(),
        amount: sponsor_equity,
    });

    let total_sources: Money = sources.iter().map(|l| l.amount).sum();

    let tolerance = ABSOLUTE_TOLERANCE.max(total_uses.abs() * RELATIVE_TOLERANCE);
    if (total_sources - total_uses).abs() > tolerance {
        return Err(LboError::SourcesUsesImbalance {
            sources: total_sources,
            uses: total_uses,
            tolerance,
        });
    }

    Ok(SourcesAndUses {
        sources,
        uses,
        total_sources,
        total_uses,
        sponsor_equity,
    })
}
