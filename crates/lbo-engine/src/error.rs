use rust_decimal::Decimal;
use thiserror::Error;

/// Halting errors: configuration errors (raised before any projection runs)
/// and calculation errors (raised mid-run on a degenerate input the
/// validator missed). Everything else — reconciliation, liquidity,
/// debt-schedule, and returns warnings — is collected by the validation
/// reporter instead of propagating here; see [`crate::validation::ValidationFinding`].
#[derive(Debug, Error)]
pub enum LboError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput {
        field: String,
        reason: String,
        code: &'static str,
    },

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Sources & Uses do not balance: sources={sources} uses={uses} (tolerance={tolerance})")]
    SourcesUsesImbalance {
        sources: Decimal,
        uses: Decimal,
        tolerance: Decimal,
    },

    #[error("Calculation error in period {period}, {line_item}: {reason}")]
    CalculationError {
        period: u32,
        line_item: String,
        reason: String,
    },

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Convergence failure: {function} did not converge after {iterations} iterations (delta: {last_delta})")]
    ConvergenceFailure {
        function: String,
        iterations: u32,
        last_delta: Decimal,
    },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl LboError {
    /// Stable `code` string for the error surface (§6): consumers map these
    /// to localized messages rather than parsing `Display` output.
    pub fn code(&self) -> &'static str {
        match self {
            LboError::InvalidInput { code, .. } => code,
            LboError::UnknownField(_) => "unknown_field",
            LboError::SourcesUsesImbalance { .. } => "debt_exceeds_sources",
            LboError::CalculationError { .. } => "calculation_error",
            LboError::DivisionByZero { .. } => "division_by_zero",
            LboError::InsufficientData(_) => "insufficient_data",
            LboError::ConvergenceFailure { .. } => "convergence_failure",
            LboError::SerializationError(_) => "serialization_error",
        }
    }
}

impl From<serde_json::Error> for LboError {
    fn from(e: serde_json::Error) -> Self {
        LboError::SerializationError(e.to_string())
    }
}
