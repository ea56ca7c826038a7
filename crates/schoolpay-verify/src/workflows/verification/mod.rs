//! Payment-code issuance, receipt intake, and AI-assisted receipt triage.
//!
//! A student obtains a payment code, pays outside the portal, and uploads a receipt. The
//! receipt is run through an analyzer, decoded into an [`ExtractedAnalysis`], and triaged into
//! pending, verified, or flagged before any admin looks at it.

pub mod analysis;
pub mod codes;
pub mod dashboard;
pub mod domain;
pub mod listing;
pub mod repository;
pub mod router;
pub mod service;
pub mod triage;
pub mod validation;

#[cfg(test)]
mod tests;

pub use analysis::{
    AnalysisDecode, AnalyzerError, ExtractedAnalysis, ReceiptAnalyzer, SimulatedAnalyzer,
};
pub use dashboard::ReceiptMetrics;
pub use domain::{
    ActivityActor, ActivityEntry, ActivityKind, ActivityTarget, BulkReviewRequest,
    CodeVerification, ExpectedPayment, PaymentCode, PaymentCodeId, PaymentCodeRequest,
    PaymentCodeStatus, PaymentSnapshot, ReceiptId, ReceiptRecord, ReceiptStatus,
    ReceiptSubmissionView, ReceiptUpload, ReviewRequest,
};
pub use listing::{Pagination, ReceiptPage, ReceiptQuery, SortColumn, SortDirection};
pub use repository::{PortalRepository, RepositoryError};
pub use router::portal_router;
pub use service::{PortalService, PortalServiceError, PortalSettings};
pub use triage::{
    evaluate, ConfidenceBand, TriageEvaluator, TriageResult, TriageStatus, TriageThresholds,
};
pub use validation::{FieldViolation, SubmissionGuard, ValidationErrors};
