use crate::domain::matching::match_payment;
use crate::domain::payment::{
    ImportedPayment, MatchStatus, ParsedPayment, PaymentUpload, UploadStatus,
};
use crate::domain::ports::{ImportStoreBox, TenantStoreBox};
use crate::error::{BillingError, Result};
use tracing::{error, info, warn};

/// Aggregate counts for one processed upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadSummary {
    pub total: u32,
    pub matched: u32,
    pub unmatched: u32,
}

/// Persists parsed payment feeds with their match outcomes and keeps the
/// upload counters in sync.
pub struct PaymentImporter {
    tenants: TenantStoreBox,
    store: ImportStoreBox,
}

impl PaymentImporter {
    pub fn new(tenants: TenantStoreBox, store: ImportStoreBox) -> Self {
        Self { tenants, store }
    }

    /// Registers a new upload row for a file about to be processed.
    pub async fn register_upload(&self, filename: &str, file_type: &str) -> Result<u64> {
        self.store
            .create_upload(PaymentUpload::registered(
                filename.to_string(),
                file_type.to_string(),
            ))
            .await
    }

    /// Matches and persists every parsed payment of one upload, then
    /// updates the upload's counters.
    ///
    /// A row insert failure aborts the loop: rows written before it stay
    /// persisted, the upload is best-effort marked `failed`, and the
    /// error is returned. The per-row writes are not wrapped in a
    /// transaction.
    pub async fn process_upload(
        &self,
        upload_id: u64,
        payments: Vec<ParsedPayment>,
    ) -> Result<UploadSummary> {
        let tenants = self.tenants.all_tenants().await?;

        let mut matched = 0u32;
        let mut unmatched = 0u32;
        for payment in payments {
            let outcome = match_payment(&payment, &tenants);
            match outcome.status {
                MatchStatus::Matched => matched += 1,
                _ => unmatched += 1,
            }
            let row = ImportedPayment::from_parts(upload_id, payment, outcome);
            if let Err(e) = self.store.insert_imported(row).await {
                self.mark_upload_failed(upload_id, &e).await;
                return Err(e);
            }
        }

        let summary = UploadSummary {
            total: matched + unmatched,
            matched,
            unmatched,
        };

        let mut upload = self
            .store
            .upload(upload_id)
            .await?
            .ok_or(BillingError::NotFound {
                entity: "payment upload",
                id: upload_id,
            })?;
        upload.total_rows = summary.total;
        upload.matched_rows = summary.matched;
        upload.unmatched_rows = summary.unmatched;
        upload.status = UploadStatus::PendingReview;
        self.store.save_upload(upload).await?;

        info!(
            upload_id,
            total = summary.total,
            matched = summary.matched,
            unmatched = summary.unmatched,
            "processed payment upload"
        );
        Ok(summary)
    }

    async fn mark_upload_failed(&self, upload_id: u64, cause: &BillingError) {
        let fallback = async {
            let mut upload = self
                .store
                .upload(upload_id)
                .await?
                .ok_or(BillingError::NotFound {
                    entity: "payment upload",
                    id: upload_id,
                })?;
            upload.status = UploadStatus::Failed;
            self.store.save_upload(upload).await
        };
        match fallback.await {
            Ok(()) => warn!(upload_id, %cause, "upload processing failed, upload marked failed"),
            Err(e) => error!(upload_id, %cause, fallback_error = %e, "upload processing failed and the failure could not be recorded"),
        }
    }

    /// Lists the persisted rows of one upload for review.
    pub async fn results_for_upload(&self, upload_id: u64) -> Result<Vec<ImportedPayment>> {
        self.store.imported_for_upload(upload_id).await
    }

    /// Marks one imported row as converted into an actual payment.
    ///
    /// When the admin assigns a tenant the heuristic did not find, the row
    /// is recorded as a manual match with full confidence.
    pub async fn mark_processed(
        &self,
        imported_id: u64,
        tenant_override: Option<u64>,
    ) -> Result<ImportedPayment> {
        let mut row = self
            .store
            .imported(imported_id)
            .await?
            .ok_or(BillingError::NotFound {
                entity: "imported payment",
                id: imported_id,
            })?;

        if let Some(tenant_id) = tenant_override
            && row.matched_tenant_id != Some(tenant_id)
        {
            row.matched_tenant_id = Some(tenant_id);
            row.match_status = MatchStatus::Manual;
            row.match_confidence = 100;
            row.match_reason = "manually assigned".to_string();
        }
        row.processed = true;

        self.store.save_imported(row.clone()).await?;
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{ImportStore, TenantStore};
    use crate::domain::tenant::Tenant;
    use crate::infrastructure::in_memory::InMemoryStore;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn payment(name: &str, phone: Option<&str>) -> ParsedPayment {
        ParsedPayment {
            payment_date: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            amount: dec!(25000),
            payer_name: name.to_string(),
            phone: phone.map(str::to_string),
            reference: None,
            description: None,
        }
    }

    async fn importer_with(tenants: Vec<Tenant>) -> (PaymentImporter, InMemoryStore) {
        let store = InMemoryStore::new();
        let importer = PaymentImporter::new(Box::new(store.clone()), Box::new(store.clone()));
        if !tenants.is_empty() {
            store.insert_tenants(tenants).await.unwrap();
        }
        (importer, store)
    }

    #[tokio::test]
    async fn test_process_upload_counts_and_rows() {
        let (importer, store) = importer_with(vec![
            Tenant {
                id: 0,
                first_name: "John".to_string(),
                last_name: "Doe".to_string(),
                phone: Some("0712345678".to_string()),
            },
            Tenant {
                id: 0,
                first_name: "Jane".to_string(),
                last_name: "Smith".to_string(),
                phone: None,
            },
        ])
        .await;

        let upload_id = importer.register_upload("jan.csv", "csv").await.unwrap();
        let summary = importer
            .process_upload(
                upload_id,
                vec![
                    payment("J Doe", Some("+254712345678")),
                    payment("Jane Smith", None),
                    payment("Someone Else Entirely", None),
                ],
            )
            .await
            .unwrap();

        assert_eq!(
            summary,
            UploadSummary {
                total: 3,
                matched: 2,
                unmatched: 1
            }
        );

        let rows = store.imported_for_upload(upload_id).await.unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| !r.processed));
        assert_eq!(rows[0].match_status, MatchStatus::Matched);
        assert_eq!(rows[0].match_confidence, 100);
        assert_eq!(rows[2].match_status, MatchStatus::Unmatched);

        let upload = store.upload(upload_id).await.unwrap().unwrap();
        assert_eq!(upload.total_rows, 3);
        assert_eq!(upload.matched_rows, 2);
        assert_eq!(upload.unmatched_rows, 1);
        assert_eq!(upload.status, UploadStatus::PendingReview);
    }

    #[tokio::test]
    async fn test_empty_feed_yields_zero_counters() {
        let (importer, store) = importer_with(vec![]).await;
        let upload_id = importer.register_upload("empty.csv", "csv").await.unwrap();

        let summary = importer.process_upload(upload_id, vec![]).await.unwrap();
        assert_eq!(summary.total, 0);

        let upload = store.upload(upload_id).await.unwrap().unwrap();
        assert_eq!(upload.status, UploadStatus::PendingReview);
    }

    #[tokio::test]
    async fn test_mark_processed_with_manual_override() {
        let (importer, store) = importer_with(vec![]).await;
        let upload_id = importer.register_upload("jan.csv", "csv").await.unwrap();
        importer
            .process_upload(upload_id, vec![payment("Nobody Known", None)])
            .await
            .unwrap();

        let row = store.imported_for_upload(upload_id).await.unwrap().remove(0);
        assert_eq!(row.match_status, MatchStatus::Unmatched);

        let updated = importer.mark_processed(row.id, Some(7)).await.unwrap();
        assert!(updated.processed);
        assert_eq!(updated.match_status, MatchStatus::Manual);
        assert_eq!(updated.matched_tenant_id, Some(7));

        let reloaded = store.imported(row.id).await.unwrap().unwrap();
        assert_eq!(reloaded, updated);
    }

    #[tokio::test]
    async fn test_mark_processed_missing_row() {
        let (importer, _store) = importer_with(vec![]).await;
        let err = importer.mark_processed(123, None).await.unwrap_err();
        assert!(matches!(err, BillingError::NotFound { .. }));
    }
}
