use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::workflows::verification::analysis::{
    AnalyzerError, ExtractedAnalysis, ReceiptAnalyzer,
};
use crate::workflows::verification::domain::{
    ActivityEntry, ExpectedPayment, PaymentCode, PaymentCodeId, PaymentCodeRequest, ReceiptId,
    ReceiptRecord, ReceiptStatus, ReceiptUpload,
};
use crate::workflows::verification::listing::{ReceiptPage, ReceiptQuery};
use crate::workflows::verification::repository::{PortalRepository, RepositoryError};
use crate::workflows::verification::service::{PortalService, PortalSettings};

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 1, 9, 0, 0).unwrap()
}

pub(super) fn expected(amount: Option<Decimal>) -> ExpectedPayment {
    ExpectedPayment {
        expected_amount: amount,
        student_name: "Ada Obi".to_string(),
        session: "2024/2025".to_string(),
    }
}

pub(super) fn analysis(
    confidence_score: u8,
    amount: Option<Decimal>,
    matches_expected: Option<bool>,
    concerns: &[&str],
) -> ExtractedAnalysis {
    ExtractedAnalysis {
        amount,
        date: Some("2025-08-30".to_string()),
        payment_method: Some("Bank Transfer".to_string()),
        transaction_ref: Some("TRX-99812".to_string()),
        payee: Some("Greenfield Academy".to_string()),
        notes: None,
        confidence_score,
        matches_expected,
        concerns: concerns.iter().map(|c| c.to_string()).collect(),
        extracted_text: "GREENFIELD ACADEMY SCHOOL FEES".to_string(),
    }
}

/// Model-style response text for the scripted analyzer.
pub(super) fn model_response(
    confidence_score: u8,
    amount: Option<f64>,
    matches_expected: bool,
    concerns: &[&str],
) -> String {
    let body = serde_json::json!({
        "amount": amount,
        "date": "2025-08-30",
        "paymentMethod": "Bank Transfer",
        "transactionRef": "TRX-99812",
        "payee": "Greenfield Academy",
        "notes": "",
        "confidenceScore": confidence_score,
        "matchesExpected": matches_expected,
        "concerns": concerns,
        "extractedText": "GREENFIELD ACADEMY SCHOOL FEES",
    });
    format!("```json\n{body}\n```")
}

pub(super) fn code_request(expected_amount: Option<Decimal>) -> PaymentCodeRequest {
    PaymentCodeRequest {
        student_name: "  Ada Obi ".to_string(),
        student_id: "STU-2025-014".to_string(),
        student_email: "ada.obi@greenfield.edu".to_string(),
        session: "2024/2025".to_string(),
        payment_type: Some("Tuition".to_string()),
        expected_amount,
    }
}

pub(super) fn upload(payment_code: &str) -> ReceiptUpload {
    ReceiptUpload {
        payment_code: payment_code.to_string(),
        file_name: "receipt.jpg".to_string(),
        file_size: 48_213,
        file_type: "image/jpeg".to_string(),
        image_base64: None,
    }
}

pub(super) fn build_service(
    response: String,
) -> (
    PortalService<MemoryStore, ScriptedAnalyzer>,
    Arc<MemoryStore>,
) {
    let store = Arc::new(MemoryStore::default());
    let analyzer = Arc::new(ScriptedAnalyzer(response));
    let service = PortalService::new(store.clone(), analyzer, PortalSettings::default());
    (service, store)
}

/// Issue a code and return it, using a fresh service around `response`.
pub(super) fn service_with_code(
    response: String,
    expected_amount: Option<Decimal>,
) -> (
    PortalService<MemoryStore, ScriptedAnalyzer>,
    Arc<MemoryStore>,
    PaymentCode,
) {
    let (service, store) = build_service(response);
    let code = service
        .generate_code(code_request(expected_amount), now())
        .expect("code issued");
    (service, store, code)
}

pub(super) struct ScriptedAnalyzer(pub(super) String);

impl ReceiptAnalyzer for ScriptedAnalyzer {
    fn analyze(
        &self,
        _upload: &ReceiptUpload,
        _expected: &ExpectedPayment,
    ) -> Result<String, AnalyzerError> {
        Ok(self.0.clone())
    }
}

pub(super) struct FailingAnalyzer;

impl ReceiptAnalyzer for FailingAnalyzer {
    fn analyze(
        &self,
        _upload: &ReceiptUpload,
        _expected: &ExpectedPayment,
    ) -> Result<String, AnalyzerError> {
        Err(AnalyzerError::Transport("vision endpoint timed out".to_string()))
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryStore {
    codes: Arc<Mutex<HashMap<String, PaymentCode>>>,
    receipts: Arc<Mutex<BTreeMap<ReceiptId, ReceiptRecord>>>,
    activity: Arc<Mutex<Vec<ActivityEntry>>>,
}

impl MemoryStore {
    pub(super) fn activity(&self) -> Vec<ActivityEntry> {
        self.activity.lock().expect("activity mutex poisoned").clone()
    }

    pub(super) fn seed_receipt(&self, record: ReceiptRecord) {
        self.receipts
            .lock()
            .expect("receipt mutex poisoned")
            .insert(record.id.clone(), record);
    }
}

impl PortalRepository for MemoryStore {
    fn insert_code(&self, code: PaymentCode) -> Result<PaymentCode, RepositoryError> {
        let mut guard = self.codes.lock().expect("code mutex poisoned");
        if guard.contains_key(&code.code) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(code.code.clone(), code.clone());
        Ok(code)
    }

    fn code_by_value(&self, code: &str) -> Result<Option<PaymentCode>, RepositoryError> {
        let guard = self.codes.lock().expect("code mutex poisoned");
        Ok(guard.get(code).cloned())
    }

    fn insert_receipt(&self, receipt: ReceiptRecord) -> Result<ReceiptRecord, RepositoryError> {
        let mut guard = self.receipts.lock().expect("receipt mutex poisoned");
        if guard
            .values()
            .any(|existing| existing.payment_code_id == receipt.payment_code_id)
        {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(receipt.id.clone(), receipt.clone());
        Ok(receipt)
    }

    fn receipt(&self, id: &ReceiptId) -> Result<Option<ReceiptRecord>, RepositoryError> {
        let guard = self.receipts.lock().expect("receipt mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn receipt_by_reference(
        &self,
        reference_id: &str,
    ) -> Result<Option<ReceiptRecord>, RepositoryError> {
        let guard = self.receipts.lock().expect("receipt mutex poisoned");
        Ok(guard
            .values()
            .find(|record| record.reference_id == reference_id)
            .cloned())
    }

    fn receipt_for_code(
        &self,
        code_id: &PaymentCodeId,
    ) -> Result<Option<ReceiptRecord>, RepositoryError> {
        let guard = self.receipts.lock().expect("receipt mutex poisoned");
        Ok(guard
            .values()
            .find(|record| &record.payment_code_id == code_id)
            .cloned())
    }

    fn update_receipt(&self, receipt: ReceiptRecord) -> Result<(), RepositoryError> {
        let mut guard = self.receipts.lock().expect("receipt mutex poisoned");
        if !guard.contains_key(&receipt.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(receipt.id.clone(), receipt);
        Ok(())
    }

    fn list_receipts(&self, query: &ReceiptQuery) -> Result<ReceiptPage, RepositoryError> {
        let guard = self.receipts.lock().expect("receipt mutex poisoned");
        Ok(query.apply(guard.values().cloned()))
    }

    fn receipt_statuses(&self) -> Result<Vec<ReceiptStatus>, RepositoryError> {
        let guard = self.receipts.lock().expect("receipt mutex poisoned");
        Ok(guard.values().map(|record| record.status).collect())
    }

    fn append_activity(&self, entry: ActivityEntry) -> Result<(), RepositoryError> {
        self.activity
            .lock()
            .expect("activity mutex poisoned")
            .push(entry);
        Ok(())
    }

    fn recent_activity(&self, limit: usize) -> Result<Vec<ActivityEntry>, RepositoryError> {
        let guard = self.activity.lock().expect("activity mutex poisoned");
        Ok(guard.iter().rev().take(limit).cloned().collect())
    }
}

/// Repository whose every call fails, for error-path coverage.
pub(super) struct UnavailableStore;

impl PortalRepository for UnavailableStore {
    fn insert_code(&self, _code: PaymentCode) -> Result<PaymentCode, RepositoryError> {
        Err(offline())
    }

    fn code_by_value(&self, _code: &str) -> Result<Option<PaymentCode>, RepositoryError> {
        Err(offline())
    }

    fn insert_receipt(&self, _receipt: ReceiptRecord) -> Result<ReceiptRecord, RepositoryError> {
        Err(offline())
    }

    fn receipt(&self, _id: &ReceiptId) -> Result<Option<ReceiptRecord>, RepositoryError> {
        Err(offline())
    }

    fn receipt_by_reference(
        &self,
        _reference_id: &str,
    ) -> Result<Option<ReceiptRecord>, RepositoryError> {
        Err(offline())
    }

    fn receipt_for_code(
        &self,
        _code_id: &PaymentCodeId,
    ) -> Result<Option<ReceiptRecord>, RepositoryError> {
        Err(offline())
    }

    fn update_receipt(&self, _receipt: ReceiptRecord) -> Result<(), RepositoryError> {
        Err(offline())
    }

    fn list_receipts(&self, _query: &ReceiptQuery) -> Result<ReceiptPage, RepositoryError> {
        Err(offline())
    }

    fn receipt_statuses(&self) -> Result<Vec<ReceiptStatus>, RepositoryError> {
        Err(offline())
    }

    fn append_activity(&self, _entry: ActivityEntry) -> Result<(), RepositoryError> {
        Err(offline())
    }

    fn recent_activity(&self, _limit: usize) -> Result<Vec<ActivityEntry>, RepositoryError> {
        Err(offline())
    }
}

fn offline() -> RepositoryError {
    RepositoryError::Unavailable("database offline".to_string())
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
