use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::json;
use tracing::{info, warn};

use super::analysis::{decode, AnalysisDecode, ExtractedAnalysis, ReceiptAnalyzer};
use super::codes::{
    expires_at, generate_payment_code, generate_reference_id, normalize_payment_code,
};
use super::dashboard::ReceiptMetrics;
use super::domain::{
    ActivityActor, ActivityEntry, ActivityKind, ActivityTarget, BulkReviewRequest,
    CodeVerification, ExpectedPayment, PaymentCode, PaymentCodeId, PaymentCodeRequest,
    PaymentCodeStatus, ReceiptId, ReceiptRecord, ReceiptStatus, ReceiptUpload, ReviewRequest,
};
use super::listing::{ReceiptPage, ReceiptQuery};
use super::repository::{PortalRepository, RepositoryError};
use super::triage::{TriageEvaluator, TriageThresholds};
use super::validation::{SubmissionGuard, ValidationErrors};

const CODE_ISSUE_ATTEMPTS: usize = 3;
const MAX_ACTIVITY_LIMIT: usize = 100;
const SYSTEM_ACTOR: &str = "AI System";
const DEFAULT_REVIEWER: &str = "admin";

static CODE_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static RECEIPT_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static ACTIVITY_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_code_id() -> PaymentCodeId {
    let id = CODE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    PaymentCodeId(format!("pc-{id:06}"))
}

fn next_receipt_id() -> ReceiptId {
    let id = RECEIPT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ReceiptId(format!("rcpt-{id:06}"))
}

/// Lifetime, upload limits, and triage cut-offs applied by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalSettings {
    pub payment_code_ttl_hours: i64,
    pub max_receipt_bytes: u64,
    pub triage: TriageThresholds,
}

impl Default for PortalSettings {
    fn default() -> Self {
        Self {
            payment_code_ttl_hours: 720,
            max_receipt_bytes: 10 * 1024 * 1024,
            triage: TriageThresholds::default(),
        }
    }
}

/// Service composing request validation, the analyzer, triage, and storage.
pub struct PortalService<R, A> {
    repository: Arc<R>,
    analyzer: Arc<A>,
    guard: SubmissionGuard,
    evaluator: TriageEvaluator,
    settings: PortalSettings,
}

impl<R, A> PortalService<R, A>
where
    R: PortalRepository + 'static,
    A: ReceiptAnalyzer + 'static,
{
    pub fn new(repository: Arc<R>, analyzer: Arc<A>, settings: PortalSettings) -> Self {
        Self {
            repository,
            analyzer,
            guard: SubmissionGuard::new(settings.max_receipt_bytes),
            evaluator: TriageEvaluator::new(settings.triage.clone()),
            settings,
        }
    }

    pub fn settings(&self) -> &PortalSettings {
        &self.settings
    }

    /// Issue a new payment code for a student.
    pub fn generate_code(
        &self,
        request: PaymentCodeRequest,
        now: DateTime<Utc>,
    ) -> Result<PaymentCode, PortalServiceError> {
        let request = self.guard.code_request(request)?;
        let stored = self.insert_unique_code(&request, now)?;

        let mut entry = activity(
            ActivityKind::CodeGenerated,
            ActivityActor::Student,
            &stored.student_name,
            "generated payment code",
            now,
        );
        entry.target = Some(ActivityTarget::PaymentCode(stored.id.clone()));
        entry.metadata.insert("code".to_string(), json!(stored.code));
        entry
            .metadata
            .insert("student_id".to_string(), json!(stored.student_id));
        self.repository.append_activity(entry)?;

        info!(code = %stored.code, session = %stored.session, "payment code issued");
        Ok(stored)
    }

    fn insert_unique_code(
        &self,
        request: &PaymentCodeRequest,
        now: DateTime<Utc>,
    ) -> Result<PaymentCode, PortalServiceError> {
        let ttl_hours = self.settings.payment_code_ttl_hours;
        let expires_at = expires_at(now, ttl_hours)
            .ok_or(PortalServiceError::CodeLifetimeOutOfRange { hours: ttl_hours })?;

        let mut rng = rand::thread_rng();
        let mut attempt = 0;
        loop {
            attempt += 1;
            let code = PaymentCode {
                id: next_code_id(),
                code: generate_payment_code(now, &mut rng),
                reference_id: generate_reference_id("REF", now, &mut rng),
                student_name: request.student_name.clone(),
                student_id: request.student_id.clone(),
                student_email: request.student_email.clone(),
                session: request.session.clone(),
                payment_type: request.payment_type.clone(),
                expected_amount: request.expected_amount,
                status: PaymentCodeStatus::Active,
                created_at: now,
                expires_at,
            };

            match self.repository.insert_code(code) {
                Err(RepositoryError::Conflict) if attempt < CODE_ISSUE_ATTEMPTS => {
                    warn!(attempt, "payment code collision; regenerating");
                }
                other => return Ok(other?),
            }
        }
    }

    /// Report whether a code can still be used for an upload.
    pub fn verify_code(
        &self,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<CodeVerification, PortalServiceError> {
        let code = self.lookup_code(code)?;
        let is_used = self.repository.receipt_for_code(&code.id)?.is_some();
        Ok(code.verification(now, is_used))
    }

    pub fn code_details(&self, code: &str) -> Result<PaymentCode, PortalServiceError> {
        self.lookup_code(code)
    }

    fn lookup_code(&self, raw: &str) -> Result<PaymentCode, PortalServiceError> {
        let canonical = normalize_payment_code(raw).unwrap_or_else(|| raw.trim().to_string());
        self.repository
            .code_by_value(&canonical)?
            .ok_or(PortalServiceError::UnknownPaymentCode)
    }

    /// Accept a receipt, analyze it, and store it with its triage outcome.
    pub fn submit_receipt(
        &self,
        upload: ReceiptUpload,
        now: DateTime<Utc>,
    ) -> Result<ReceiptRecord, PortalServiceError> {
        let upload = self.guard.receipt_upload(upload)?;
        let code = self.lookup_code(&upload.payment_code)?;

        if code.is_expired(now) {
            return Err(PortalServiceError::ExpiredPaymentCode);
        }
        if self.repository.receipt_for_code(&code.id)?.is_some() {
            return Err(PortalServiceError::DuplicateReceipt);
        }

        let expected = code.expected_payment();
        let analysis = self.analyze(&upload, &expected);
        let triage = self.evaluator.evaluate(&analysis, &expected);

        let mut rng = rand::thread_rng();
        let record = ReceiptRecord {
            id: next_receipt_id(),
            reference_id: generate_reference_id("RCP", now, &mut rng),
            payment_code_id: code.id.clone(),
            payment: code.snapshot(),
            file_name: upload.file_name,
            file_size: upload.file_size,
            file_type: upload.file_type,
            status: triage.status.into(),
            extracted_text: analysis.extracted_text.clone(),
            extracted_amount: analysis.amount,
            extracted_date: analysis.date.as_deref().and_then(parse_receipt_date),
            confidence_score: analysis.confidence_score,
            is_urgent: triage.is_urgent,
            concerns: triage.concerns.clone(),
            analysis,
            admin_notes: None,
            reviewed_by: None,
            reviewed_at: None,
            created_at: now,
        };

        let stored = match self.repository.insert_receipt(record) {
            Err(RepositoryError::Conflict) => return Err(PortalServiceError::DuplicateReceipt),
            other => other?,
        };

        let mut submitted = activity(
            ActivityKind::ReceiptSubmitted,
            ActivityActor::Student,
            &code.student_name,
            "submitted receipt",
            now,
        );
        submitted.target = Some(ActivityTarget::Receipt(stored.id.clone()));
        submitted
            .metadata
            .insert("reference_id".to_string(), json!(stored.reference_id));
        submitted
            .metadata
            .insert("payment_code".to_string(), json!(code.code));
        submitted
            .metadata
            .insert("status".to_string(), json!(stored.status.label()));
        self.repository.append_activity(submitted)?;

        if triage.is_flagged() {
            let mut flagged = activity(
                ActivityKind::ReceiptFlagged,
                ActivityActor::System,
                SYSTEM_ACTOR,
                "flagged receipt for review",
                now,
            );
            flagged.target = Some(ActivityTarget::Receipt(stored.id.clone()));
            flagged
                .metadata
                .insert("concerns".to_string(), json!(triage.concerns));
            self.repository.append_activity(flagged)?;

            warn!(
                reference_id = %stored.reference_id,
                concerns = triage.concerns.len(),
                urgent = triage.is_urgent,
                "receipt flagged for review"
            );
        } else {
            info!(
                reference_id = %stored.reference_id,
                status = stored.status.label(),
                "receipt accepted"
            );
        }

        Ok(stored)
    }

    fn analyze(&self, upload: &ReceiptUpload, expected: &ExpectedPayment) -> ExtractedAnalysis {
        match self.analyzer.analyze(upload, expected) {
            Ok(raw) => {
                let decoded = decode(&raw);
                if let AnalysisDecode::ParseError { error, .. } = &decoded {
                    warn!(%error, "analysis response was not valid JSON; using fallback");
                }
                decoded.into_analysis()
            }
            Err(err) => {
                warn!(error = %err, "receipt analysis unavailable; using fallback");
                ExtractedAnalysis::unavailable()
            }
        }
    }

    pub fn receipt(&self, id: &ReceiptId) -> Result<ReceiptRecord, PortalServiceError> {
        self.repository
            .receipt(id)?
            .ok_or(PortalServiceError::UnknownReceipt)
    }

    pub fn receipt_by_reference(
        &self,
        reference_id: &str,
    ) -> Result<ReceiptRecord, PortalServiceError> {
        self.repository
            .receipt_by_reference(reference_id.trim())?
            .ok_or(PortalServiceError::UnknownReceipt)
    }

    pub fn list_receipts(&self, query: &ReceiptQuery) -> Result<ReceiptPage, PortalServiceError> {
        Ok(self.repository.list_receipts(query)?)
    }

    /// Apply an admin decision to one receipt.
    pub fn review_receipt(
        &self,
        id: &ReceiptId,
        request: ReviewRequest,
        now: DateTime<Utc>,
    ) -> Result<ReceiptRecord, PortalServiceError> {
        let status = self.guard.review_status(&request.status)?;
        let reviewer = reviewer_name(request.reviewed_by.as_deref());

        let mut record = self.receipt(id)?;
        let previous = record.status;
        apply_review(&mut record, status, request.admin_notes, &reviewer, now);
        self.store_review(record.clone())?;

        let mut entry = activity(
            ActivityKind::ReceiptReviewed(status),
            ActivityActor::Admin,
            &reviewer,
            format!("{} receipt", status.label()),
            now,
        );
        entry.target = Some(ActivityTarget::Receipt(record.id.clone()));
        entry
            .metadata
            .insert("reference_id".to_string(), json!(record.reference_id));
        entry
            .metadata
            .insert("previous_status".to_string(), json!(previous.label()));
        entry
            .metadata
            .insert("new_status".to_string(), json!(status.label()));
        self.repository.append_activity(entry)?;

        info!(
            reference_id = %record.reference_id,
            from = previous.label(),
            to = status.label(),
            "receipt reviewed"
        );
        Ok(record)
    }

    /// Apply one admin decision to many receipts. Unknown ids are skipped.
    pub fn bulk_review(
        &self,
        request: BulkReviewRequest,
        now: DateTime<Utc>,
    ) -> Result<Vec<ReceiptRecord>, PortalServiceError> {
        let (ids, status) = self.guard.bulk_review(&request)?;
        let reviewer = reviewer_name(request.reviewed_by.as_deref());

        let mut updated = Vec::with_capacity(ids.len());
        for id in &ids {
            let Some(mut record) = self.repository.receipt(id)? else {
                continue;
            };
            apply_review(&mut record, status, request.admin_notes.clone(), &reviewer, now);
            self.store_review(record.clone())?;
            updated.push(record);
        }

        let mut entry = activity(
            ActivityKind::BulkAction,
            ActivityActor::Admin,
            &reviewer,
            format!("bulk {} {} receipts", status.label(), ids.len()),
            now,
        );
        let receipt_ids: Vec<&str> = ids.iter().map(|id| id.0.as_str()).collect();
        entry
            .metadata
            .insert("receipt_ids".to_string(), json!(receipt_ids));
        entry
            .metadata
            .insert("status".to_string(), json!(status.label()));
        entry
            .metadata
            .insert("count".to_string(), json!(ids.len()));
        self.repository.append_activity(entry)?;

        info!(
            requested = ids.len(),
            updated = updated.len(),
            status = status.label(),
            "bulk receipt review applied"
        );
        Ok(updated)
    }

    fn store_review(&self, record: ReceiptRecord) -> Result<(), PortalServiceError> {
        match self.repository.update_receipt(record) {
            Err(RepositoryError::NotFound) => Err(PortalServiceError::UnknownReceipt),
            other => Ok(other?),
        }
    }

    pub fn metrics(&self) -> Result<ReceiptMetrics, PortalServiceError> {
        let statuses = self.repository.receipt_statuses()?;
        Ok(ReceiptMetrics::from_statuses(statuses))
    }

    pub fn recent_activity(&self, limit: usize) -> Result<Vec<ActivityEntry>, PortalServiceError> {
        let limit = limit.clamp(1, MAX_ACTIVITY_LIMIT);
        Ok(self.repository.recent_activity(limit)?)
    }
}

fn activity(
    kind: ActivityKind,
    actor: ActivityActor,
    actor_name: &str,
    action: impl Into<String>,
    now: DateTime<Utc>,
) -> ActivityEntry {
    ActivityEntry {
        id: ACTIVITY_SEQUENCE.fetch_add(1, Ordering::Relaxed),
        kind,
        actor,
        actor_name: actor_name.to_string(),
        action: action.into(),
        target: None,
        metadata: BTreeMap::new(),
        created_at: now,
    }
}

fn apply_review(
    record: &mut ReceiptRecord,
    status: ReceiptStatus,
    admin_notes: Option<String>,
    reviewer: &str,
    now: DateTime<Utc>,
) {
    record.status = status;
    record.reviewed_by = Some(reviewer.to_string());
    record.reviewed_at = Some(now);
    if let Some(notes) = admin_notes
        .map(|notes| notes.trim().to_string())
        .filter(|notes| !notes.is_empty())
    {
        record.admin_notes = Some(notes);
    }
}

fn reviewer_name(raw: Option<&str>) -> String {
    raw.map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_REVIEWER)
        .to_string()
}

fn parse_receipt_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

/// Error raised by the portal service.
#[derive(Debug, thiserror::Error)]
pub enum PortalServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("payment code not found")]
    UnknownPaymentCode,
    #[error("payment code has expired")]
    ExpiredPaymentCode,
    #[error("receipt already submitted for this payment code")]
    DuplicateReceipt,
    #[error("receipt not found")]
    UnknownReceipt,
    #[error("payment code lifetime of {hours} hours is out of range")]
    CodeLifetimeOutOfRange { hours: i64 },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
