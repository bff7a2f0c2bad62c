use serde::{Deserialize, Serialize};

use crate::debt::DebtScheduleRow;
use crate::types::Money;

/// Income statement for a single projection year (§3, §4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomeLine {
    pub year: u32,
    pub revenue: Money,
    pub cogs: Money,
    pub gross_profit: Money,
    pub sganda: Money,
    pub ebitda: Money,
    pub depreciation: Money,
    pub ebit: Money,
    pub interest_expense: Money,
    pub pretax_income: Money,
    pub tax: Money,
    pub net_income: Money,
}

/// Balance sheet as of the end of a projection year (§3, §4.3/§4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceLine {
    pub year: u32,
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
    /// Non-zero only when the balance sheet needed a plug to tie out (§4.6).
    pub equity_plug: Money,
}

/// Cash flow statement for a single projection year (§3, §4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashFlowLine {
    pub year: u32,
    pub net_income: Money,
    pub depreciation_addback: Money,
    pub change_in_working_capital: Money,
    pub cash_from_operations: Money,
    pub capex: Money,
    pub cash_from_investing: Money,
    pub scheduled_debt_repayment: Money,
    pub sweep_debt_repayment: Money,
    pub revolver_draw: Money,
    pub cash_from_financing: Money,
    pub net_change_in_cash: Money,
    pub free_cash_flow_available_for_debt: Money,
}

/// The complete state of one projection year — the unit the projector and
/// debt solver hand back and forth (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodState {
    pub year: u32,
    pub income: IncomeLine,
    pub balance: BalanceLine,
    pub cash_flow: CashFlowLine,
    pub debt_schedule: Vec<DebtScheduleRow>,
}
