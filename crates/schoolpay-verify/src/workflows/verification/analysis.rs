use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::domain::{ExpectedPayment, ReceiptUpload};

pub const UNAVAILABLE_CONCERN: &str = "AI analysis unavailable";
pub const UNPARSEABLE_CONCERN: &str = "Unable to parse receipt data automatically";
const UNPARSEABLE_CONFIDENCE: u8 = 50;

/// Fields extracted from a receipt image. Produced only by [`decode`] or one of the fallbacks,
/// so every value is already inside its documented domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedAnalysis {
    pub amount: Option<Decimal>,
    pub date: Option<String>,
    pub payment_method: Option<String>,
    pub transaction_ref: Option<String>,
    pub payee: Option<String>,
    pub notes: Option<String>,
    pub confidence_score: u8,
    pub matches_expected: Option<bool>,
    pub concerns: Vec<String>,
    pub extracted_text: String,
}

impl ExtractedAnalysis {
    /// Substitute used when the analyzer itself failed.
    pub fn unavailable() -> Self {
        Self {
            amount: None,
            date: None,
            payment_method: Some("Unknown".to_string()),
            transaction_ref: None,
            payee: None,
            notes: Some("AI analysis failed. Manual review required.".to_string()),
            confidence_score: 0,
            matches_expected: Some(false),
            concerns: vec![UNAVAILABLE_CONCERN.to_string()],
            extracted_text: String::new(),
        }
    }

    /// Substitute used when the analyzer answered with text that is not an analysis object.
    pub fn unparseable(raw: &str) -> Self {
        Self {
            amount: None,
            date: None,
            payment_method: Some("Unknown".to_string()),
            transaction_ref: None,
            payee: None,
            notes: Some(raw.to_string()),
            confidence_score: UNPARSEABLE_CONFIDENCE,
            matches_expected: Some(false),
            concerns: vec![UNPARSEABLE_CONCERN.to_string()],
            extracted_text: raw.to_string(),
        }
    }
}

/// Outcome of decoding the analyzer's free-text response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisDecode {
    Parsed(ExtractedAnalysis),
    ParseError { error: String, raw: String },
}

impl AnalysisDecode {
    pub fn into_analysis(self) -> ExtractedAnalysis {
        match self {
            AnalysisDecode::Parsed(analysis) => analysis,
            AnalysisDecode::ParseError { raw, .. } => ExtractedAnalysis::unparseable(&raw),
        }
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self, AnalysisDecode::Parsed(_))
    }
}

/// Decode a model response, tolerating markdown fences and loosely typed fields.
pub fn decode(raw: &str) -> AnalysisDecode {
    let body = fenced_block(raw, "```json\n")
        .or_else(|| fenced_block(raw, "```\n"))
        .unwrap_or(raw)
        .trim();

    let object = match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(object)) => object,
        Ok(other) => {
            return AnalysisDecode::ParseError {
                error: format!("expected a JSON object, found {}", value_kind(&other)),
                raw: raw.to_string(),
            }
        }
        Err(err) => {
            return AnalysisDecode::ParseError {
                error: err.to_string(),
                raw: raw.to_string(),
            }
        }
    };

    AnalysisDecode::Parsed(analysis_from_object(&object))
}

fn fenced_block<'a>(raw: &'a str, opener: &str) -> Option<&'a str> {
    let start = raw.find(opener)? + opener.len();
    let rest = &raw[start..];
    let end = rest.find("\n```")?;
    Some(&rest[..end])
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn analysis_from_object(object: &Map<String, Value>) -> ExtractedAnalysis {
    ExtractedAnalysis {
        amount: object.get("amount").and_then(decimal_field),
        date: object.get("date").and_then(text_field),
        payment_method: object.get("paymentMethod").and_then(text_field),
        transaction_ref: object.get("transactionRef").and_then(text_field),
        payee: object.get("payee").and_then(text_field),
        notes: object.get("notes").and_then(text_field),
        confidence_score: object
            .get("confidenceScore")
            .and_then(confidence_field)
            .unwrap_or(0),
        matches_expected: object.get("matchesExpected").and_then(bool_field),
        concerns: object.get("concerns").map(concern_list).unwrap_or_default(),
        extracted_text: object
            .get("extractedText")
            .and_then(text_field)
            .unwrap_or_default(),
    }
}

fn decimal_field(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(number) => parse_decimal(&number.to_string()),
        Value::String(text) => {
            let cleaned: String = text
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();
            parse_decimal(&cleaned)
        }
        _ => None,
    }
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

fn confidence_field(value: &Value) -> Option<u8> {
    let score = match value {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => text.trim().trim_end_matches('%').parse::<f64>().ok()?,
        _ => return None,
    };
    if !score.is_finite() {
        return None;
    }
    Some(score.round().clamp(0.0, 100.0) as u8)
}

fn bool_field(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" => Some(true),
            "false" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn text_field(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn concern_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(text_field).collect(),
        Value::String(text) if !text.trim().is_empty() => vec![text.clone()],
        _ => Vec::new(),
    }
}

/// Outbound seam to the vision-analysis collaborator. Implementations return the raw model text.
pub trait ReceiptAnalyzer: Send + Sync {
    fn analyze(
        &self,
        upload: &ReceiptUpload,
        expected: &ExpectedPayment,
    ) -> Result<String, AnalyzerError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
    #[error("unsupported receipt format: {0}")]
    UnsupportedFormat(String),
    #[error("analysis transport unavailable: {0}")]
    Transport(String),
}

/// Stand-in analyzer for deployments without a vision model; every receipt goes to manual review.
#[derive(Debug, Default, Clone)]
pub struct SimulatedAnalyzer;

impl ReceiptAnalyzer for SimulatedAnalyzer {
    fn analyze(
        &self,
        upload: &ReceiptUpload,
        _expected: &ExpectedPayment,
    ) -> Result<String, AnalyzerError> {
        if upload.file_type.eq_ignore_ascii_case("application/pdf") {
            return Err(AnalyzerError::UnsupportedFormat(
                "PDF analysis requires additional processing".to_string(),
            ));
        }

        let payload = serde_json::json!({
            "amount": Value::Null,
            "date": Value::Null,
            "paymentMethod": "Manual Review Required",
            "transactionRef": Value::Null,
            "payee": Value::Null,
            "notes": "OCR processing simulated. Manual review required.",
            "confidenceScore": 30,
            "matchesExpected": false,
            "concerns": ["OCR not configured"],
            "extractedText": "OCR text extraction would appear here",
        });
        Ok(payload.to_string())
    }
}
