use clap::Args;
use rust_decimal::Decimal;
use schoolpay_verify::error::AppError;
use schoolpay_verify::workflows::verification::analysis::decode;
use schoolpay_verify::workflows::verification::{
    ConfidenceBand, ExpectedPayment, ExtractedAnalysis, TriageEvaluator, TriageResult,
    TriageThresholds,
};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct TriageArgs {
    /// File holding the raw analyzer reply (JSON, optionally inside a markdown fence)
    #[arg(long)]
    pub(crate) analysis: PathBuf,
    /// Amount the payment code was issued for
    #[arg(long)]
    pub(crate) expected_amount: Option<Decimal>,
    /// Student the code was issued to
    #[arg(long, default_value = "")]
    pub(crate) student_name: String,
    /// Academic session, e.g. 2024/2025
    #[arg(long, default_value = "")]
    pub(crate) session: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TriageReport {
    parsed: bool,
    confidence_band: ConfidenceBand,
    analysis: ExtractedAnalysis,
    triage: TriageResult,
    thresholds: TriageThresholds,
}

fn triage_report(raw: &str, expected: &ExpectedPayment) -> TriageReport {
    let evaluator = TriageEvaluator::default();
    let decoded = decode(raw);
    let parsed = decoded.is_parsed();
    let analysis = decoded.into_analysis();
    let triage = evaluator.evaluate(&analysis, expected);

    TriageReport {
        parsed,
        confidence_band: ConfidenceBand::from_score(analysis.confidence_score),
        analysis,
        triage,
        thresholds: evaluator.thresholds().clone(),
    }
}

pub(crate) fn run_triage(args: TriageArgs) -> Result<(), AppError> {
    let raw = std::fs::read_to_string(&args.analysis)?;
    let expected = ExpectedPayment {
        expected_amount: args.expected_amount,
        student_name: args.student_name,
        session: args.session,
    };

    let report = triage_report(&raw, &expected);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
