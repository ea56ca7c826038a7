use metrics_exporter_prometheus::PrometheusHandle;
use schoolpay_verify::config::PortalConfig;
use schoolpay_verify::workflows::verification::{
    ActivityEntry, PaymentCode, PaymentCodeId, PortalRepository, PortalSettings, ReceiptId,
    ReceiptPage, ReceiptQuery, ReceiptRecord, ReceiptStatus, RepositoryError,
};
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Process-local store backing the portal until a database adapter is configured.
#[derive(Default, Clone)]
pub(crate) struct InMemoryPortalStore {
    codes: Arc<Mutex<HashMap<String, PaymentCode>>>,
    receipts: Arc<Mutex<HashMap<ReceiptId, ReceiptRecord>>>,
    activity: Arc<Mutex<Vec<ActivityEntry>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable("store mutex poisoned".to_string()))
}

impl PortalRepository for InMemoryPortalStore {
    fn insert_code(&self, code: PaymentCode) -> Result<PaymentCode, RepositoryError> {
        let mut guard = lock(&self.codes)?;
        if guard.contains_key(&code.code) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(code.code.clone(), code.clone());
        Ok(code)
    }

    fn code_by_value(&self, code: &str) -> Result<Option<PaymentCode>, RepositoryError> {
        Ok(lock(&self.codes)?.get(code).cloned())
    }

    fn insert_receipt(&self, receipt: ReceiptRecord) -> Result<ReceiptRecord, RepositoryError> {
        let mut guard = lock(&self.receipts)?;
        let taken = guard.contains_key(&receipt.id)
            || guard
                .values()
                .any(|existing| existing.payment_code_id == receipt.payment_code_id);
        if taken {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(receipt.id.clone(), receipt.clone());
        Ok(receipt)
    }

    fn receipt(&self, id: &ReceiptId) -> Result<Option<ReceiptRecord>, RepositoryError> {
        Ok(lock(&self.receipts)?.get(id).cloned())
    }

    fn receipt_by_reference(
        &self,
        reference_id: &str,
    ) -> Result<Option<ReceiptRecord>, RepositoryError> {
        Ok(lock(&self.receipts)?
            .values()
            .find(|record| record.reference_id == reference_id)
            .cloned())
    }

    fn receipt_for_code(
        &self,
        code_id: &PaymentCodeId,
    ) -> Result<Option<ReceiptRecord>, RepositoryError> {
        Ok(lock(&self.receipts)?
            .values()
            .find(|record| &record.payment_code_id == code_id)
            .cloned())
    }

    fn update_receipt(&self, receipt: ReceiptRecord) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.receipts)?;
        match guard.get_mut(&receipt.id) {
            Some(slot) => {
                *slot = receipt;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn list_receipts(&self, query: &ReceiptQuery) -> Result<ReceiptPage, RepositoryError> {
        let guard = lock(&self.receipts)?;
        Ok(query.apply(guard.values().cloned()))
    }

    fn receipt_statuses(&self) -> Result<Vec<ReceiptStatus>, RepositoryError> {
        Ok(lock(&self.receipts)?
            .values()
            .map(|record| record.status)
            .collect())
    }

    fn append_activity(&self, entry: ActivityEntry) -> Result<(), RepositoryError> {
        lock(&self.activity)?.push(entry);
        Ok(())
    }

    fn recent_activity(&self, limit: usize) -> Result<Vec<ActivityEntry>, RepositoryError> {
        Ok(lock(&self.activity)?
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }
}

pub(crate) fn portal_settings(config: &PortalConfig) -> PortalSettings {
    PortalSettings {
        payment_code_ttl_hours: config.payment_code_ttl_hours,
        max_receipt_bytes: config.receipt_max_bytes,
        ..PortalSettings::default()
    }
}
