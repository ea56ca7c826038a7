use rust_decimal::Decimal;
use serde::Serialize;

use super::codes::normalize_payment_code;
use super::domain::{
    BulkReviewRequest, PaymentCodeRequest, ReceiptId, ReceiptStatus, ReceiptUpload,
};

const ACCEPTED_FILE_TYPES: [&str; 3] = ["image/jpeg", "image/png", "application/pdf"];
const DEFAULT_MAX_RECEIPT_BYTES: u64 = 10 * 1024 * 1024;

/// One failed field rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: &'static str,
    pub message: String,
}

/// Every rule a request broke, reported together.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("request validation failed: {}", summarize(.0))]
pub struct ValidationErrors(pub Vec<FieldViolation>);

fn summarize(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|violation| format!("{} ({})", violation.message, violation.field))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    pub fn violations(&self) -> &[FieldViolation] {
        &self.0
    }
}

#[derive(Default)]
struct Violations(Vec<FieldViolation>);

impl Violations {
    fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldViolation {
            field,
            message: message.into(),
        });
    }

    fn finish<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.0.is_empty() {
            Ok(value)
        } else {
            Err(ValidationErrors(self.0))
        }
    }
}

/// Field rules for student and admin requests.
#[derive(Debug, Clone)]
pub struct SubmissionGuard {
    max_receipt_bytes: u64,
}

impl Default for SubmissionGuard {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RECEIPT_BYTES)
    }
}

impl SubmissionGuard {
    pub fn new(max_receipt_bytes: u64) -> Self {
        let max_receipt_bytes = if max_receipt_bytes == 0 {
            DEFAULT_MAX_RECEIPT_BYTES
        } else {
            max_receipt_bytes
        };
        Self { max_receipt_bytes }
    }

    pub fn max_receipt_bytes(&self) -> u64 {
        self.max_receipt_bytes
    }

    /// Trim and check a payment-code request.
    pub fn code_request(
        &self,
        request: PaymentCodeRequest,
    ) -> Result<PaymentCodeRequest, ValidationErrors> {
        let mut violations = Violations::default();

        let student_name = request.student_name.trim().to_string();
        if student_name.is_empty() {
            violations.push("studentName", "Student name is required");
        } else if student_name.chars().count() < 2 {
            violations.push("studentName", "Student name must be at least 2 characters");
        }

        let student_id = request.student_id.trim().to_string();
        if student_id.is_empty() {
            violations.push("studentId", "Student ID is required");
        } else if !student_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            violations.push("studentId", "Invalid student ID format");
        }

        let student_email = request.student_email.trim().to_string();
        if student_email.is_empty() {
            violations.push("studentEmail", "Email is required");
        } else if !looks_like_email(&student_email) {
            violations.push("studentEmail", "Invalid email format");
        }

        let session = request.session.trim().to_string();
        if session.is_empty() {
            violations.push("session", "Session is required");
        } else if !is_session(&session) {
            violations.push("session", "Invalid session format. Expected: YYYY/YYYY");
        }

        if request
            .expected_amount
            .is_some_and(|amount| amount < Decimal::ZERO)
        {
            violations.push("expectedAmount", "Expected amount must be a positive number");
        }

        let payment_type = request
            .payment_type
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        violations.finish(PaymentCodeRequest {
            student_name,
            student_id,
            student_email,
            session,
            payment_type,
            expected_amount: request.expected_amount,
        })
    }

    /// Check an upload and canonicalize its payment code.
    pub fn receipt_upload(&self, upload: ReceiptUpload) -> Result<ReceiptUpload, ValidationErrors> {
        let mut violations = Violations::default();

        let payment_code = if upload.payment_code.trim().is_empty() {
            violations.push("paymentCode", "Payment code is required");
            String::new()
        } else {
            match normalize_payment_code(&upload.payment_code) {
                Some(code) => code,
                None => {
                    violations.push("paymentCode", "Invalid payment code format");
                    String::new()
                }
            }
        };

        if upload.file_name.trim().is_empty() {
            violations.push("fileName", "No file uploaded");
        }

        let file_type = upload.file_type.trim().to_ascii_lowercase();
        if !ACCEPTED_FILE_TYPES.contains(&file_type.as_str()) {
            violations.push(
                "fileType",
                "Invalid file type. Only JPEG, PNG, and PDF files are allowed",
            );
        }

        if upload.file_size == 0 {
            violations.push("fileSize", "Uploaded file is empty");
        } else if upload.file_size > self.max_receipt_bytes {
            violations.push(
                "fileSize",
                format!("File exceeds the {} byte limit", self.max_receipt_bytes),
            );
        }

        violations.finish(ReceiptUpload {
            payment_code,
            file_name: upload.file_name.trim().to_string(),
            file_size: upload.file_size,
            file_type,
            image_base64: upload.image_base64,
        })
    }

    pub fn review_status(&self, raw: &str) -> Result<ReceiptStatus, ValidationErrors> {
        let mut violations = Violations::default();
        let status = parse_status(raw, &mut violations);
        violations.finish(status.unwrap_or(ReceiptStatus::Pending))
    }

    pub fn bulk_review(
        &self,
        request: &BulkReviewRequest,
    ) -> Result<(Vec<ReceiptId>, ReceiptStatus), ValidationErrors> {
        let mut violations = Violations::default();

        let ids: Vec<ReceiptId> = request
            .ids
            .iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
            .map(|id| ReceiptId(id.to_string()))
            .collect();
        if ids.is_empty() {
            violations.push("ids", "Invalid receipt IDs");
        }

        let status = parse_status(&request.status, &mut violations);
        violations.finish((ids, status.unwrap_or(ReceiptStatus::Pending)))
    }
}

fn parse_status(raw: &str, violations: &mut Violations) -> Option<ReceiptStatus> {
    if raw.trim().is_empty() {
        violations.push("status", "Status is required");
        return None;
    }
    let status = ReceiptStatus::parse(raw);
    if status.is_none() {
        violations.push("status", "Invalid status");
    }
    status
}

fn looks_like_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !value.contains(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}

fn is_session(value: &str) -> bool {
    match value.split_once('/') {
        Some((start, end)) => [start, end]
            .iter()
            .all(|year| year.len() == 4 && year.chars().all(|c| c.is_ascii_digit())),
        None => false,
    }
}
