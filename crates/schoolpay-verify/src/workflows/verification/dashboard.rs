use serde::Serialize;

use super::domain::ReceiptStatus;

/// Receipt counts per review state for the admin dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReceiptMetrics {
    pub total: usize,
    pub pending: usize,
    pub verified: usize,
    pub flagged: usize,
    pub rejected: usize,
}

impl ReceiptMetrics {
    pub fn from_statuses<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = ReceiptStatus>,
    {
        statuses
            .into_iter()
            .fold(Self::default(), |mut metrics, status| {
                metrics.total += 1;
                match status {
                    ReceiptStatus::Pending => metrics.pending += 1,
                    ReceiptStatus::Verified => metrics.verified += 1,
                    ReceiptStatus::Flagged => metrics.flagged += 1,
                    ReceiptStatus::Rejected => metrics.rejected += 1,
                }
                metrics
            })
    }
}
