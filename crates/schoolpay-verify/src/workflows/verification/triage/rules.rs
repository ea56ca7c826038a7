use rust_decimal::Decimal;

use super::super::analysis::ExtractedAnalysis;
use super::super::domain::ExpectedPayment;
use super::TriageThresholds;

pub const LOW_CONFIDENCE_CONCERN: &str = "Low confidence score in receipt analysis";
pub const MISMATCH_CONCERN: &str = "Receipt does not match expected payment details";

/// Concerns in display order: confidence, amount, analyzer-raised, match flag.
pub(crate) fn collect_concerns(
    analysis: &ExtractedAnalysis,
    expected: &ExpectedPayment,
    thresholds: &TriageThresholds,
) -> Vec<String> {
    let mut concerns = Vec::new();

    if analysis.confidence_score < thresholds.low_confidence {
        concerns.push(LOW_CONFIDENCE_CONCERN.to_string());
    }

    if let Some(concern) = amount_concern(analysis, expected, thresholds) {
        concerns.push(concern);
    }

    concerns.extend(analysis.concerns.iter().cloned());

    if analysis.matches_expected == Some(false) {
        concerns.push(MISMATCH_CONCERN.to_string());
    }

    concerns
}

fn amount_concern(
    analysis: &ExtractedAnalysis,
    expected: &ExpectedPayment,
    thresholds: &TriageThresholds,
) -> Option<String> {
    let expected_amount = expected.expected_amount?;
    let found = analysis.amount?;
    if expected_amount.is_zero() {
        return None;
    }

    let out_of_tolerance = match percent_difference(found, expected_amount) {
        Some(percent) => percent > thresholds.amount_tolerance_percent,
        // Only a ratio far past any tolerance can leave the Decimal range.
        None => true,
    };

    if out_of_tolerance {
        Some(format!(
            "Amount mismatch: Expected {}, Found {}",
            expected_amount.normalize(),
            found.normalize()
        ))
    } else {
        None
    }
}

/// `|found - expected| / expected * 100`, or `None` when any step overflows.
fn percent_difference(found: Decimal, expected: Decimal) -> Option<Decimal> {
    found
        .checked_sub(expected)?
        .abs()
        .checked_div(expected)?
        .checked_mul(Decimal::ONE_HUNDRED)
}
