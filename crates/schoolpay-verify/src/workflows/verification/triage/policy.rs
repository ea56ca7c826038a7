use super::super::analysis::ExtractedAnalysis;
use super::{TriageStatus, TriageThresholds};

/// Any concern flags the receipt; only a confident, confirmed match is auto-verified.
pub(crate) fn decide(
    analysis: &ExtractedAnalysis,
    concerns: &[String],
    thresholds: &TriageThresholds,
) -> (TriageStatus, bool) {
    let should_flag = !concerns.is_empty();

    let status = if should_flag {
        TriageStatus::Flagged
    } else if analysis.confidence_score >= thresholds.auto_verify_confidence
        && analysis.matches_expected == Some(true)
    {
        TriageStatus::Verified
    } else {
        TriageStatus::Pending
    };

    let is_urgent = should_flag && analysis.confidence_score < thresholds.urgent_confidence;

    (status, is_urgent)
}
