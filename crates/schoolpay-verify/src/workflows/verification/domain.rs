use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};

use super::analysis::ExtractedAnalysis;

/// Identifier wrapper for issued payment codes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PaymentCodeId(pub String);

/// Identifier wrapper for submitted receipts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReceiptId(pub String);

/// What the portal expects the student to have paid, as seen by the triage evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedPayment {
    pub expected_amount: Option<Decimal>,
    pub student_name: String,
    pub session: String,
}

/// Student supplied details used to issue a payment code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCodeRequest {
    pub student_name: String,
    pub student_id: String,
    pub student_email: String,
    pub session: String,
    #[serde(default)]
    pub payment_type: Option<String>,
    #[serde(default)]
    pub expected_amount: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentCodeStatus {
    Active,
}

/// Issued payment code correlating a later receipt with the expected payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCode {
    pub id: PaymentCodeId,
    pub code: String,
    pub reference_id: String,
    pub student_name: String,
    pub student_id: String,
    pub student_email: String,
    pub session: String,
    pub payment_type: Option<String>,
    pub expected_amount: Option<Decimal>,
    pub status: PaymentCodeStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl PaymentCode {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }

    pub fn expected_payment(&self) -> ExpectedPayment {
        ExpectedPayment {
            expected_amount: self.expected_amount,
            student_name: self.student_name.clone(),
            session: self.session.clone(),
        }
    }

    pub fn snapshot(&self) -> PaymentSnapshot {
        PaymentSnapshot {
            code: self.code.clone(),
            student_name: self.student_name.clone(),
            student_id: self.student_id.clone(),
            student_email: self.student_email.clone(),
            session: self.session.clone(),
            expected_amount: self.expected_amount,
        }
    }

    pub fn verification(&self, now: DateTime<Utc>, is_used: bool) -> CodeVerification {
        let is_expired = self.is_expired(now);
        CodeVerification {
            valid: self.status == PaymentCodeStatus::Active && !is_expired && !is_used,
            code: self.code.clone(),
            student_name: self.student_name.clone(),
            session: self.session.clone(),
            is_expired,
            is_used,
            expires_at: self.expires_at,
        }
    }
}

/// Public answer to "can this code still be used to upload a receipt?".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeVerification {
    pub valid: bool,
    pub code: String,
    pub student_name: String,
    pub session: String,
    pub is_expired: bool,
    pub is_used: bool,
    pub expires_at: DateTime<Utc>,
}

/// Payment code fields denormalized onto each receipt for listing and review screens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSnapshot {
    pub code: String,
    pub student_name: String,
    pub student_id: String,
    pub student_email: String,
    pub session: String,
    pub expected_amount: Option<Decimal>,
}

/// Inbound receipt submission. The image payload is handed to the analyzer and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptUpload {
    pub payment_code: String,
    pub file_name: String,
    pub file_size: u64,
    pub file_type: String,
    #[serde(default)]
    pub image_base64: Option<String>,
}

/// Review state of a stored receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptStatus {
    Pending,
    Verified,
    Flagged,
    Rejected,
}

impl ReceiptStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ReceiptStatus::Pending => "pending",
            ReceiptStatus::Verified => "verified",
            ReceiptStatus::Flagged => "flagged",
            ReceiptStatus::Rejected => "rejected",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "verified" => Some(Self::Verified),
            "flagged" => Some(Self::Flagged),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// Stored receipt row including the analysis trail shown to reviewers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptRecord {
    pub id: ReceiptId,
    pub reference_id: String,
    pub payment_code_id: PaymentCodeId,
    pub payment: PaymentSnapshot,
    pub file_name: String,
    pub file_size: u64,
    pub file_type: String,
    pub status: ReceiptStatus,
    pub extracted_text: String,
    pub analysis: ExtractedAnalysis,
    pub extracted_amount: Option<Decimal>,
    pub extracted_date: Option<NaiveDate>,
    pub confidence_score: u8,
    pub is_urgent: bool,
    pub concerns: Vec<String>,
    pub admin_notes: Option<String>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ReceiptRecord {
    pub fn submission_view(&self) -> ReceiptSubmissionView {
        let concerns = if self.status == ReceiptStatus::Flagged {
            self.concerns.clone()
        } else {
            Vec::new()
        };

        ReceiptSubmissionView {
            id: self.id.clone(),
            reference_id: self.reference_id.clone(),
            status: self.status,
            confidence_score: self.confidence_score,
            extracted_amount: self.extracted_amount,
            extracted_date: self.extracted_date,
            is_urgent: self.is_urgent,
            concerns,
            analysis: self.analysis.clone(),
            created_at: self.created_at,
        }
    }
}

/// Response returned to the student right after upload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptSubmissionView {
    pub id: ReceiptId,
    pub reference_id: String,
    pub status: ReceiptStatus,
    pub confidence_score: u8,
    pub extracted_amount: Option<Decimal>,
    pub extracted_date: Option<NaiveDate>,
    pub is_urgent: bool,
    pub concerns: Vec<String>,
    pub analysis: ExtractedAnalysis,
    pub created_at: DateTime<Utc>,
}

/// Admin decision on a single receipt. `status` is validated by the submission guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    pub status: String,
    #[serde(default)]
    pub admin_notes: Option<String>,
    #[serde(default)]
    pub reviewed_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkReviewRequest {
    pub ids: Vec<String>,
    pub status: String,
    #[serde(default)]
    pub admin_notes: Option<String>,
    #[serde(default)]
    pub reviewed_by: Option<String>,
}

/// Audit trail categories written by the portal service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    CodeGenerated,
    ReceiptSubmitted,
    ReceiptFlagged,
    ReceiptReviewed(ReceiptStatus),
    BulkAction,
}

impl ActivityKind {
    pub fn label(self) -> String {
        match self {
            ActivityKind::CodeGenerated => "code_generated".to_string(),
            ActivityKind::ReceiptSubmitted => "receipt_submitted".to_string(),
            ActivityKind::ReceiptFlagged => "receipt_flagged".to_string(),
            ActivityKind::ReceiptReviewed(status) => format!("receipt_{}", status.label()),
            ActivityKind::BulkAction => "bulk_action".to_string(),
        }
    }
}

impl Serialize for ActivityKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityActor {
    Student,
    Admin,
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum ActivityTarget {
    PaymentCode(PaymentCodeId),
    Receipt(ReceiptId),
}

/// Single activity feed row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub id: u64,
    pub kind: ActivityKind,
    pub actor: ActivityActor,
    pub actor_name: String,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<ActivityTarget>,
    pub metadata: BTreeMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
}
