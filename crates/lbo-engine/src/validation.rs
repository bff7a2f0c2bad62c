use serde::{Deserialize, Serialize};

use crate::types::Money;

/// Severity of a non-halting finding (§4.8, §7). Findings never stop a run —
/// only [`crate::error::LboError`] does that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// A single non-halting observation raised during a run: a reconciliation
/// plug, a liquidity shortfall, a sweep oddity, a returns calculation that
/// could not converge, and so on (§4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationFinding {
    pub severity: Severity,
    /// Stable string for programmatic matching, mirroring `LboError::code`
    /// (§6) but for findings that never propagate as errors.
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<Money>,
}

impl ValidationFinding {
    pub fn info(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            code,
            message: message.into(),
            period: None,
            delta: None,
        }
    }

    pub fn warning(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
            period: None,
            delta: None,
        }
    }

    pub fn error(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            period: None,
            delta: None,
        }
    }

    pub fn at_period(mut self, period: u32) -> Self {
        self.period = Some(period);
        self
    }

    pub fn with_delta(mut self, delta: Money) -> Self {
        self.delta = Some(delta);
        self
    }
}

/// One deal's qualitative debt-structure tag, used to annotate findings and
/// the returns bundle with what kind of repayment scenario produced them
/// (§4.8 payment-scenario tagging).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentScenario {
    Amortizing,
    Bullet,
    CashFlowSweep,
    MixedStructure,
}

impl PaymentScenario {
    pub fn classify(schedules: &[crate::debt::AmortizationSchedule]) -> Self {
        use crate::debt::AmortizationSchedule::*;
        let all_amortizing = schedules.iter().all(|s| matches!(s, Amortizing));
        let all_bullet = schedules.iter().all(|s| matches!(s, Bullet));
        let all_sweep = schedules.iter().all(|s| matches!(s, CashFlowSweep));

        if all_amortizing {
            PaymentScenario::Amortizing
        } else if all_bullet {
            PaymentScenario::Bullet
        } else if all_sweep {
            PaymentScenario::CashFlowSweep
        } else {
            PaymentScenario::MixedStructure
        }
    }
}

/// Aggregates every finding raised over a run (§4.8).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub findings: Vec<ValidationFinding>,
}

impl ValidationReport {
    pub fn push(&mut self, finding: ValidationFinding) {
        self.findings.push(finding);
    }

    pub fn has_errors(&self) -> bool {
        self.findings.iter().any(|f| f.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationFinding> {
        self.findings
            .iter()
            .filter(|f| f.severity == Severity::Warning)
    }
}
