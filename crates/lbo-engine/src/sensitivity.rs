use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::assumptions::Assumptions;
use crate::engine::run_projection;
use crate::error::LboError;
use crate::types::{Multiple, Rate};

/// One axis of a sensitivity grid: an assumption overridden across a set of
/// values. Only the two drivers named in the spec's sensitivity scope —
/// entry/exit multiple and exit year — are modeled as first-class axes;
/// anything else is out of scope for the grid runner (§4.9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SensitivityAxis {
    ExitMultiple(Vec<Multiple>),
    RevenueGrowthRate(Vec<Rate>),
    ExitYear(Vec<u32>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityCell {
    pub row_value: String,
    pub column_value: String,
    pub moic: Option<Multiple>,
    pub irr: Option<Rate>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityGrid {
    pub rows: Vec<String>,
    pub columns: Vec<String>,
    pub cells: Vec<SensitivityCell>,
}

fn apply_axis(mut assumptions: Assumptions, axis: &SensitivityAxis, index: usize) -> (Assumptions, String) {
    match axis {
        SensitivityAxis::ExitMultiple(values) => {
            let value = values[index];
            assumptions.exit_multiple = value;
            (assumptions, value.to_string())
        }
        SensitivityAxis::RevenueGrowthRate(values) => {
            let value = values[index];
            assumptions.revenue_growth_rate = vec![value];
            (assumptions, value.to_string())
        }
        SensitivityAxis::ExitYear(values) => {
            let value = values[index];
            assumptions.exit_year = value;
            (assumptions, value.to_string())
        }
    }
}

fn axis_len(axis: &SensitivityAxis) -> usize {
    match axis {
        SensitivityAxis::ExitMultiple(v) => v.len(),
        SensitivityAxis::RevenueGrowthRate(v) => v.len(),
        SensitivityAxis::ExitYear(v) => v.len(),
    }
}

/// Evaluate a two-dimensional sensitivity grid, running each cell's
/// projection on its own scoped thread (§4.9, §9). A `cancel` flag shared
/// across cells lets a caller abort the remaining grid — e.g. after a
/// timeout — without tearing down threads that are still mid-computation;
/// cells observed after cancellation come back with an `indeterminate`
/// error rather than a partial result.
pub fn evaluate_grid(
    base: &Assumptions,
    row_axis: &SensitivityAxis,
    column_axis: &SensitivityAxis,
    cancel: Arc<AtomicBool>,
) -> SensitivityGrid {
    let row_count = axis_len(row_axis);
    let column_count = axis_len(column_axis);

    let mut cells: Vec<Option<SensitivityCell>> = vec![None; row_count * column_count];
    let mut row_labels = vec![String::new(); row_count];
    let mut column_labels = vec![String::new(); column_count];

    std::thread::scope(|scope| {
        let mut handles = Vec::with_capacity(row_count * column_count);

        for row in 0..row_count {
            for column in 0..column_count {
                let cancel = Arc::clone(&cancel);
                let base = base.clone();
                let row_axis = row_axis.clone();
                let column_axis = column_axis.clone();

                let handle = scope.spawn(move || {
                    let (with_row, row_label) = apply_axis(base, &row_axis, row);
                    let (with_both, column_label) = apply_axis(with_row, &column_axis, column);

                    if cancel.load(Ordering::Relaxed) {
                        return (
                            row,
                            column,
                            row_label,
                            column_label,
                            SensitivityCell {
                                row_value: String::new(),
                                column_value: String::new(),
                                moic: None,
                                irr: None,
                                error: Some("indeterminate: grid evaluation was cancelled".into()),
                            },
                        );
                    }

                    let cell = match run_projection(with_both) {
                        Ok(output) => SensitivityCell {
                            row_value: row_label.clone(),
                            column_value: column_label.clone(),
                            moic: Some(output.result.returns.moic),
                            irr: output.result.returns.irr,
                            error: None,
                        },
                        Err(err) => SensitivityCell {
                            row_value: row_label.clone(),
                            column_value: column_label.clone(),
                            moic: None,
                            irr: None,
                            error: Some(describe_error(&err)),
                        },
                    };

                    (row, column, row_label, column_label, cell)
                });
                handles.push(handle);
            }
        }

        for handle in handles {
            let (row, column, row_label, column_label, cell) =
                handle.join().unwrap_or_else(|_| {
                    (
                        0,
                        0,
                        String::new(),
                        String::new(),
                        SensitivityCell {
                            row_value: String::new(),
                            column_value: String::new(),
                            moic: None,
                            irr: None,
                            error: Some("indeterminate: worker thread panicked".into()),
                        },
                    )
                });
            row_labels[row] = row_label;
            column_labels[column] = column_label;
            cells[row * column_count + column] = Some(cell);
        }
    });

    SensitivityGrid {
        rows: row_labels,
        columns: column_labels,
        cells: cells.into_iter().map(|c| c.expect("every grid cell is populated exactly once")).collect(),
    }
}

fn describe_error(err: &LboError) -> String {
    format!("{}: {err}", err.code())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debt::{AmortizationSchedule, DebtInstrument, DebtSizing};
    use rust_decimal_macros::dec;

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
    fn grid_populates_every_cell() {
        let row_axis = SensitivityAxis::ExitMultiple(vec![dec!(7.0), dec!(8.0)]);
        let column_axis = SensitivityAxis::ExitYear(vec![4, 5, 6]);
        let grid = evaluate_grid(
            &base_assumptions(),
            &row_axis,
            &column_axis,
            Arc::new(AtomicBool::new(false)),
        );
        assert_eq!(grid.cells.len(), 6);
        assert!(grid.cells.iter().all(|c| c.error.is_none()));
    }

    #[test]
    fn cancelled_grid_returns_indeterminate_cells() {
        let row_axis = SensitivityAxis::ExitMultiple(vec![dec!(7.0)]);
        let column_axis = SensitivityAxis::ExitYear(vec![4]);
        let grid = evaluate_grid(
            &base_assumptions(),
            &row_axis,
            &column_axis,
            Arc::new(AtomicBool::new(true)),
        );
        assert!(grid.cells[0].error.as_ref().unwrap().contains("indeterminate"));
    }
}
