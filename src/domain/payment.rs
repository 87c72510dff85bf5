use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One row of an uploaded payment feed after best-effort parsing.
///
/// Produced by [`crate::interfaces::csv::feed_reader::PaymentFeedReader`];
/// rows that survive parsing always carry a positive amount and a
/// non-empty payer name.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct ParsedPayment {
    pub payment_date: NaiveDate,
    pub amount: Decimal,
    pub payer_name: String,
    pub phone: Option<String>,
    pub reference: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Matched,
    Unmatched,
    Manual,
}

/// Outcome of matching one parsed payment against the tenant pool.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct MatchResult {
    pub status: MatchStatus,
    pub tenant_id: Option<u64>,
    /// 0-100 estimate of how certain the match is.
    pub confidence: u8,
    pub reason: String,
}

impl MatchResult {
    pub fn unmatched(confidence: u8) -> Self {
        Self {
            status: MatchStatus::Unmatched,
            tenant_id: None,
            confidence,
            reason: "no clear match found".to_string(),
        }
    }
}

/// A persisted feed row together with its match outcome.
///
/// Never auto-deleted; `processed` flips when an admin accepts the match
/// and records the actual payment.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct ImportedPayment {
    pub id: u64,
    pub upload_id: u64,
    pub payment_date: NaiveDate,
    pub amount: Decimal,
    pub payer_name: String,
    pub phone: Option<String>,
    pub reference: Option<String>,
    pub description: Option<String>,
    pub matched_tenant_id: Option<u64>,
    pub match_status: MatchStatus,
    pub match_confidence: u8,
    pub match_reason: String,
    pub processed: bool,
}

impl ImportedPayment {
    pub fn from_parts(upload_id: u64, payment: ParsedPayment, outcome: MatchResult) -> Self {
        Self {
            id: 0,
            upload_id,
            payment_date: payment.payment_date,
            amount: payment.amount,
            payer_name: payment.payer_name,
            phone: payment.phone,
            reference: payment.reference,
            description: payment.description,
            matched_tenant_id: outcome.tenant_id,
            match_status: outcome.status,
            match_confidence: outcome.confidence,
            match_reason: outcome.reason,
            processed: false,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    PendingReview,
    Processed,
    Failed,
}

/// One uploaded payment file and its aggregate match counters.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct PaymentUpload {
    pub id: u64,
    pub filename: String,
    pub file_type: String,
    pub total_rows: u32,
    pub matched_rows: u32,
    pub unmatched_rows: u32,
    pub status: UploadStatus,
}

impl PaymentUpload {
    pub fn registered(filename: String, file_type: String) -> Self {
        Self {
            id: 0,
            filename,
            file_type,
            total_rows: 0,
            matched_rows: 0,
            unmatched_rows: 0,
            status: UploadStatus::PendingReview,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_imported_payment_carries_match_outcome() {
        let payment = ParsedPayment {
            payment_date: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            amount: dec!(50000),
            payer_name: "John Doe".to_string(),
            phone: None,
            reference: Some("TXN123".to_string()),
            description: None,
        };
        let outcome = MatchResult {
            status: MatchStatus::Matched,
            tenant_id: Some(42),
            confidence: 95,
            reason: "name similarity 95%".to_string(),
        };

        let row = ImportedPayment::from_parts(7, payment, outcome);
        assert_eq!(row.upload_id, 7);
        assert_eq!(row.matched_tenant_id, Some(42));
        assert_eq!(row.match_confidence, 95);
        assert!(!row.processed);
    }

    #[test]
    fn test_registered_upload_starts_zeroed() {
        let upload = PaymentUpload::registered("jan.csv".to_string(), "csv".to_string());
        assert_eq!(upload.total_rows, 0);
        assert_eq!(upload.status, UploadStatus::PendingReview);
    }
}
