use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::common::*;
use crate::workflows::verification::analysis::decode;
use crate::workflows::verification::triage::{
    evaluate, ConfidenceBand, TriageStatus, LOW_CONFIDENCE_CONCERN, MISMATCH_CONCERN,
};

#[test]
fn confident_exact_match_is_verified() {
    let result = evaluate(
        &analysis(95, Some(dec!(100)), Some(true), &[]),
        &expected(Some(dec!(100))),
    );

    assert_eq!(result.status, TriageStatus::Verified);
    assert!(result.concerns.is_empty());
    assert!(!result.is_urgent);
}

#[test]
fn large_overpayment_flags_without_urgency() {
    let result = evaluate(
        &analysis(95, Some(dec!(150)), Some(true), &[]),
        &expected(Some(dec!(100))),
    );

    assert_eq!(result.status, TriageStatus::Flagged);
    assert_eq!(
        result.concerns,
        vec!["Amount mismatch: Expected 100, Found 150".to_string()]
    );
    assert!(!result.is_urgent);
}

#[test]
fn low_confidence_mismatch_is_urgent() {
    let result = evaluate(
        &analysis(40, None, Some(false), &[]),
        &expected(Some(dec!(100))),
    );

    assert_eq!(result.status, TriageStatus::Flagged);
    assert_eq!(
        result.concerns,
        vec![
            LOW_CONFIDENCE_CONCERN.to_string(),
            MISMATCH_CONCERN.to_string()
        ]
    );
    assert!(result.is_urgent);
}

#[test]
fn moderate_confidence_without_concerns_stays_pending() {
    let result = evaluate(
        &analysis(80, Some(dec!(100)), Some(true), &[]),
        &expected(Some(dec!(100))),
    );

    assert_eq!(result.status, TriageStatus::Pending);
    assert!(result.concerns.is_empty());
    assert!(!result.is_urgent);
}

#[test]
fn zero_expected_amount_skips_amount_rule() {
    let result = evaluate(
        &analysis(90, Some(dec!(100)), Some(true), &[]),
        &expected(Some(dec!(0))),
    );

    assert_eq!(result.status, TriageStatus::Verified);
    assert!(result.concerns.is_empty());
}

#[test]
fn amount_rule_is_symmetric_around_expected() {
    for found in [dec!(120), dec!(80)] {
        let result = evaluate(
            &analysis(95, Some(found), Some(true), &[]),
            &expected(Some(dec!(100))),
        );
        assert_eq!(result.status, TriageStatus::Flagged, "found {found}");
        assert!(result.concerns[0].starts_with("Amount mismatch"));
    }
}

#[test]
fn amounts_beyond_decimal_ratio_range_still_flag() {
    let cases = [
        (dec!(1000000000000000000000000000), dec!(1)),
        (Decimal::MAX, dec!(0.0000001)),
        (Decimal::MAX, dec!(100)),
    ];
    for (found, expected_amount) in cases {
        let result = evaluate(
            &analysis(95, Some(found), Some(true), &[]),
            &expected(Some(expected_amount)),
        );
        assert_eq!(result.status, TriageStatus::Flagged, "found {found}");
        assert_eq!(
            result.concerns,
            vec![format!(
                "Amount mismatch: Expected {}, Found {}",
                expected_amount.normalize(),
                found.normalize()
            )]
        );
    }
}

#[test]
fn negative_amounts_flag_without_panicking() {
    for found in [dec!(-50), Decimal::MIN] {
        let result = evaluate(
            &analysis(95, Some(found), Some(true), &[]),
            &expected(Some(dec!(100))),
        );
        assert_eq!(result.status, TriageStatus::Flagged, "found {found}");
        assert!(result.concerns[0].starts_with("Amount mismatch"));
        assert!(!result.is_urgent);
    }
}

#[test]
fn decoded_extreme_amounts_are_flagged() {
    let raws = [
        r#"{"amount":"1000000000000000000000000000","confidenceScore":95,"matchesExpected":true}"#,
        r#"{"amount":"-79228162514264337593543950335","confidenceScore":95,"matchesExpected":true}"#,
    ];
    for raw in raws {
        let analysis = decode(raw).into_analysis();
        assert!(analysis.amount.is_some(), "amount decoded for {raw}");

        let result = evaluate(&analysis, &expected(Some(dec!(100))));
        assert_eq!(result.status, TriageStatus::Flagged, "raw {raw}");
        assert!(result.concerns[0].starts_with("Amount mismatch"));
    }
}

#[test]
fn deviation_at_tolerance_boundary_is_accepted() {
    let result = evaluate(
        &analysis(95, Some(dec!(110.00)), Some(true), &[]),
        &expected(Some(dec!(100))),
    );
    assert_eq!(result.status, TriageStatus::Verified);

    let result = evaluate(
        &analysis(95, Some(dec!(110.01)), Some(true), &[]),
        &expected(Some(dec!(100))),
    );
    assert_eq!(result.status, TriageStatus::Flagged);
}

#[test]
fn concerns_keep_rule_order_and_duplicates() {
    let result = evaluate(
        &analysis(
            60,
            Some(dec!(50)),
            Some(false),
            &["Blurry stamp", "Blurry stamp"],
        ),
        &expected(Some(dec!(100))),
    );

    assert_eq!(
        result.concerns,
        vec![
            LOW_CONFIDENCE_CONCERN.to_string(),
            "Amount mismatch: Expected 100, Found 50".to_string(),
            "Blurry stamp".to_string(),
            "Blurry stamp".to_string(),
            MISMATCH_CONCERN.to_string(),
        ]
    );
    assert!(!result.is_urgent, "confidence 60 is not below the urgent cut-off");
}

#[test]
fn absent_match_flag_never_raises_mismatch_or_verifies() {
    let result = evaluate(&analysis(99, None, None, &[]), &expected(None));

    assert_eq!(result.status, TriageStatus::Pending);
    assert!(result.concerns.is_empty());
}

#[test]
fn status_urgency_and_concerns_stay_consistent() {
    let matches = [None, Some(true), Some(false)];
    let amounts = [None, Some(dec!(100)), Some(dec!(150))];
    let analyzer_concerns: [&[&str]; 2] = [&[], &["Edited total"]];

    for confidence in (0..=100).step_by(5) {
        for matches_expected in matches {
            for amount in amounts {
                for concerns in analyzer_concerns {
                    let input = analysis(confidence, amount, matches_expected, concerns);
                    let result = evaluate(&input, &expected(Some(dec!(100))));

                    if result.status == TriageStatus::Verified {
                        assert!(result.concerns.is_empty());
                    }
                    if result.concerns.is_empty() {
                        assert_ne!(result.status, TriageStatus::Flagged);
                    }
                    if result.is_urgent {
                        assert_eq!(result.status, TriageStatus::Flagged);
                        assert!(confidence < 50);
                    }
                }
            }
        }
    }
}

#[test]
fn lowering_confidence_only_adds_concerns() {
    let expected = expected(Some(dec!(100)));
    let high = evaluate(&analysis(85, Some(dec!(130)), Some(true), &["Smudged"]), &expected);
    let low = evaluate(&analysis(40, Some(dec!(130)), Some(true), &["Smudged"]), &expected);

    for concern in &high.concerns {
        assert!(low.concerns.contains(concern), "lost {concern}");
    }
    assert_eq!(low.concerns.len(), high.concerns.len() + 1);
    assert!(low.is_urgent);
}

#[test]
fn confidence_bands_follow_score_cut_offs() {
    assert_eq!(ConfidenceBand::from_score(100), ConfidenceBand::High);
    assert_eq!(ConfidenceBand::from_score(90), ConfidenceBand::High);
    assert_eq!(ConfidenceBand::from_score(89), ConfidenceBand::Medium);
    assert_eq!(ConfidenceBand::from_score(70), ConfidenceBand::Medium);
    assert_eq!(ConfidenceBand::from_score(50), ConfidenceBand::Low);
    assert_eq!(ConfidenceBand::from_score(49), ConfidenceBand::VeryLow);
}
