mod policy;
mod rules;

pub use rules::{LOW_CONFIDENCE_CONCERN, MISMATCH_CONCERN};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::analysis::ExtractedAnalysis;
use super::domain::{ExpectedPayment, ReceiptStatus};

/// Cut-offs used by the triage rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriageThresholds {
    /// Scores below this raise a low-confidence concern.
    pub low_confidence: u8,
    /// Minimum score for auto-verification of a concern-free receipt.
    pub auto_verify_confidence: u8,
    /// Largest tolerated deviation from the expected amount, in percent.
    pub amount_tolerance_percent: Decimal,
    /// Flagged receipts scoring below this are marked urgent.
    pub urgent_confidence: u8,
}

impl Default for TriageThresholds {
    fn default() -> Self {
        Self {
            low_confidence: 70,
            auto_verify_confidence: 90,
            amount_tolerance_percent: Decimal::TEN,
            urgent_confidence: 50,
        }
    }
}

/// Stateless evaluator mapping an analysis and the expected payment to an initial status.
#[derive(Debug, Clone, Default)]
pub struct TriageEvaluator {
    thresholds: TriageThresholds,
}

impl TriageEvaluator {
    pub fn new(thresholds: TriageThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &TriageThresholds {
        &self.thresholds
    }

    pub fn evaluate(
        &self,
        analysis: &ExtractedAnalysis,
        expected: &ExpectedPayment,
    ) -> TriageResult {
        let concerns = rules::collect_concerns(analysis, expected, &self.thresholds);
        let (status, is_urgent) = policy::decide(analysis, &concerns, &self.thresholds);

        TriageResult {
            status,
            concerns,
            is_urgent,
        }
    }
}

/// Triage with the default thresholds.
pub fn evaluate(analysis: &ExtractedAnalysis, expected: &ExpectedPayment) -> TriageResult {
    TriageEvaluator::default().evaluate(analysis, expected)
}

/// Initial classification of a submitted receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriageStatus {
    Pending,
    Verified,
    Flagged,
}

impl From<TriageStatus> for ReceiptStatus {
    fn from(status: TriageStatus) -> Self {
        match status {
            TriageStatus::Pending => ReceiptStatus::Pending,
            TriageStatus::Verified => ReceiptStatus::Verified,
            TriageStatus::Flagged => ReceiptStatus::Flagged,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriageResult {
    pub status: TriageStatus,
    pub concerns: Vec<String>,
    pub is_urgent: bool,
}

impl TriageResult {
    pub fn is_flagged(&self) -> bool {
        self.status == TriageStatus::Flagged
    }
}

/// Reviewer-facing reading of a confidence score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceBand {
    High,
    Medium,
    Low,
    VeryLow,
}

impl ConfidenceBand {
    pub fn from_score(score: u8) -> Self {
        match score {
            90..=u8::MAX => Self::High,
            70..=89 => Self::Medium,
            50..=69 => Self::Low,
            _ => Self::VeryLow,
        }
    }
}
