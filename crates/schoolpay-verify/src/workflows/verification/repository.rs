use super::domain::{
    ActivityEntry, PaymentCode, PaymentCodeId, ReceiptId, ReceiptRecord, ReceiptStatus,
};
use super::listing::{ReceiptPage, ReceiptQuery};

/// Storage abstraction over the payment-code, receipt, and activity tables.
pub trait PortalRepository: Send + Sync {
    fn insert_code(&self, code: PaymentCode) -> Result<PaymentCode, RepositoryError>;
    fn code_by_value(&self, code: &str) -> Result<Option<PaymentCode>, RepositoryError>;

    /// Must fail with [`RepositoryError::Conflict`] when the payment code already owns a receipt.
    fn insert_receipt(&self, receipt: ReceiptRecord) -> Result<ReceiptRecord, RepositoryError>;
    fn receipt(&self, id: &ReceiptId) -> Result<Option<ReceiptRecord>, RepositoryError>;
    fn receipt_by_reference(
        &self,
        reference_id: &str,
    ) -> Result<Option<ReceiptRecord>, RepositoryError>;
    fn receipt_for_code(
        &self,
        code_id: &PaymentCodeId,
    ) -> Result<Option<ReceiptRecord>, RepositoryError>;
    fn update_receipt(&self, receipt: ReceiptRecord) -> Result<(), RepositoryError>;
    fn list_receipts(&self, query: &ReceiptQuery) -> Result<ReceiptPage, RepositoryError>;
    fn receipt_statuses(&self) -> Result<Vec<ReceiptStatus>, RepositoryError>;

    fn append_activity(&self, entry: ActivityEntry) -> Result<(), RepositoryError>;
    /// Newest first.
    fn recent_activity(&self, limit: usize) -> Result<Vec<ActivityEntry>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
