use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{ReceiptRecord, ReceiptStatus};

const DEFAULT_PAGE_SIZE: usize = 25;
const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortColumn {
    #[default]
    CreatedAt,
    ConfidenceScore,
    ExtractedAmount,
    ReferenceId,
    Status,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

/// Admin dashboard query over stored receipts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReceiptQuery {
    pub status: Option<ReceiptStatus>,
    pub session: Option<String>,
    pub search: Option<String>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub sort_column: SortColumn,
    pub sort_direction: SortDirection,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: usize,
    pub page: usize,
    pub limit: usize,
    pub total_pages: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReceiptPage {
    pub receipts: Vec<ReceiptRecord>,
    pub pagination: Pagination,
}

impl ReceiptQuery {
    pub fn page(&self) -> usize {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> usize {
        self.limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    pub fn matches(&self, record: &ReceiptRecord) -> bool {
        if self.status.is_some_and(|status| record.status != status) {
            return false;
        }

        if let Some(session) = self.session.as_deref().filter(|s| !s.trim().is_empty()) {
            if record.payment.session != session.trim() {
                return false;
            }
        }

        if let Some(needle) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let needle = needle.to_lowercase();
            let hit = record.reference_id.to_lowercase().contains(&needle)
                || record.payment.student_name.to_lowercase().contains(&needle);
            if !hit {
                return false;
            }
        }

        if let Some(from) = self.from_date {
            if record.created_at.date_naive() < from {
                return false;
            }
        }

        if let Some(to) = self.to_date {
            if record.created_at.date_naive() > to {
                return false;
            }
        }

        true
    }

    /// Filter, sort, and cut one page out of `records`.
    pub fn apply<I>(&self, records: I) -> ReceiptPage
    where
        I: IntoIterator<Item = ReceiptRecord>,
    {
        let mut matched: Vec<ReceiptRecord> = records
            .into_iter()
            .filter(|record| self.matches(record))
            .collect();

        matched.sort_by(|a, b| {
            let ordering = compare(self.sort_column, a, b).then_with(|| a.id.cmp(&b.id));
            match self.sort_direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });

        let total = matched.len();
        let page = self.page();
        let limit = self.limit();
        let receipts = matched
            .into_iter()
            .skip((page - 1).saturating_mul(limit))
            .take(limit)
            .collect();

        ReceiptPage {
            receipts,
            pagination: Pagination {
                total,
                page,
                limit,
                total_pages: total.div_ceil(limit),
            },
        }
    }
}

fn compare(column: SortColumn, a: &ReceiptRecord, b: &ReceiptRecord) -> Ordering {
    match column {
        SortColumn::CreatedAt => a.created_at.cmp(&b.created_at),
        SortColumn::ConfidenceScore => a.confidence_score.cmp(&b.confidence_score),
        SortColumn::ExtractedAmount => a.extracted_amount.cmp(&b.extracted_amount),
        SortColumn::ReferenceId => a.reference_id.cmp(&b.reference_id),
        SortColumn::Status => a.status.label().cmp(b.status.label()),
    }
}
