use crate::domain::invoice::{GenerationLog, Invoice, PendingInvoice};
use crate::domain::lease::Lease;
use crate::domain::payment::{ImportedPayment, PaymentUpload};
use crate::domain::ports::{BillingStore, ImportStore, LeaseStore, TenantStore};
use crate::domain::tenant::Tenant;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// One id-keyed table with an auto-increment sequence, mirroring what the
/// relational store does on insert.
struct Table<T> {
    rows: BTreeMap<u64, T>,
    next_id: u64,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 0,
        }
    }
}

impl<T> Table<T> {
    fn insert(&mut self, row: T) -> u64 {
        self.next_id += 1;
        self.rows.insert(self.next_id, row);
        self.next_id
    }
}

type Shared<T> = Arc<RwLock<Table<T>>>;

/// A thread-safe in-memory backend implementing every storage port.
///
/// `Clone` shares the underlying tables, so one store can be boxed into
/// several engine ports. Used for tests and single-shot CLI runs.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    leases: Shared<Lease>,
    tenants: Shared<Tenant>,
    logs: Shared<GenerationLog>,
    pending: Shared<PendingInvoice>,
    invoices: Shared<Invoice>,
    uploads: Shared<PaymentUpload>,
    imported: Shared<ImportedPayment>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LeaseStore for InMemoryStore {
    async fn active_leases(&self) -> Result<Vec<Lease>> {
        let leases = self.leases.read().await;
        Ok(leases
            .rows
            .values()
            .filter(|l| l.is_active())
            .cloned()
            .collect())
    }

    async fn insert_leases(&self, rows: Vec<Lease>) -> Result<u32> {
        let mut leases = self.leases.write().await;
        let count = rows.len() as u32;
        for mut lease in rows {
            if lease.id == 0 {
                lease.id = leases.next_id + 1;
            }
            let id = lease.id;
            leases.rows.insert(id, lease);
            leases.next_id = leases.next_id.max(id);
        }
        Ok(count)
    }
}

#[async_trait]
impl TenantStore for InMemoryStore {
    async fn all_tenants(&self) -> Result<Vec<Tenant>> {
        let tenants = self.tenants.read().await;
        Ok(tenants.rows.values().cloned().collect())
    }

    async fn insert_tenants(&self, rows: Vec<Tenant>) -> Result<u32> {
        let mut tenants = self.tenants.write().await;
        let count = rows.len() as u32;
        for mut tenant in rows {
            if tenant.id == 0 {
                tenant.id = tenants.next_id + 1;
            }
            let id = tenant.id;
            tenants.rows.insert(id, tenant);
            tenants.next_id = tenants.next_id.max(id);
        }
        Ok(count)
    }
}

#[async_trait]
impl BillingStore for InMemoryStore {
    async fn create_log(&self, mut log: GenerationLog) -> Result<u64> {
        let mut logs = self.logs.write().await;
        log.id = logs.next_id + 1;
        Ok(logs.insert(log))
    }

    async fn log(&self, id: u64) -> Result<Option<GenerationLog>> {
        let logs = self.logs.read().await;
        Ok(logs.rows.get(&id).cloned())
    }

    async fn save_log(&self, log: GenerationLog) -> Result<()> {
        let mut logs = self.logs.write().await;
        logs.rows.insert(log.id, log);
        Ok(())
    }

    async fn insert_pending(&self, rows: Vec<PendingInvoice>) -> Result<u32> {
        let mut pending = self.pending.write().await;
        let count = rows.len() as u32;
        for mut row in rows {
            row.id = pending.next_id + 1;
            pending.insert(row);
        }
        Ok(count)
    }

    async fn pending(&self, id: u64) -> Result<Option<PendingInvoice>> {
        let pending = self.pending.read().await;
        Ok(pending.rows.get(&id).cloned())
    }

    async fn pending_for_log(&self, log_id: u64) -> Result<Vec<PendingInvoice>> {
        let pending = self.pending.read().await;
        Ok(pending
            .rows
            .values()
            .filter(|p| p.generation_log_id == log_id)
            .cloned()
            .collect())
    }

    async fn save_pending(&self, row: PendingInvoice) -> Result<()> {
        let mut pending = self.pending.write().await;
        pending.rows.insert(row.id, row);
        Ok(())
    }

    async fn delete_pending_for_log(&self, log_id: u64) -> Result<u32> {
        let mut pending = self.pending.write().await;
        let before = pending.rows.len();
        pending.rows.retain(|_, p| p.generation_log_id != log_id);
        Ok((before - pending.rows.len()) as u32)
    }

    async fn insert_invoices(&self, rows: Vec<Invoice>) -> Result<u32> {
        let mut invoices = self.invoices.write().await;
        let count = rows.len() as u32;
        for mut row in rows {
            row.id = invoices.next_id + 1;
            invoices.insert(row);
        }
        Ok(count)
    }

    async fn invoices(&self) -> Result<Vec<Invoice>> {
        let invoices = self.invoices.read().await;
        Ok(invoices.rows.values().cloned().collect())
    }
}

#[async_trait]
impl ImportStore for InMemoryStore {
    async fn create_upload(&self, mut upload: PaymentUpload) -> Result<u64> {
        let mut uploads = self.uploads.write().await;
        upload.id = uploads.next_id + 1;
        Ok(uploads.insert(upload))
    }

    async fn upload(&self, id: u64) -> Result<Option<PaymentUpload>> {
        let uploads = self.uploads.read().await;
        Ok(uploads.rows.get(&id).cloned())
    }

    async fn save_upload(&self, upload: PaymentUpload) -> Result<()> {
        let mut uploads = self.uploads.write().await;
        uploads.rows.insert(upload.id, upload);
        Ok(())
    }

    async fn insert_imported(&self, mut row: ImportedPayment) -> Result<u64> {
        let mut imported = self.imported.write().await;
        row.id = imported.next_id + 1;
        Ok(imported.insert(row))
    }

    async fn imported(&self, id: u64) -> Result<Option<ImportedPayment>> {
        let imported = self.imported.read().await;
        Ok(imported.rows.get(&id).cloned())
    }

    async fn save_imported(&self, row: ImportedPayment) -> Result<()> {
        let mut imported = self.imported.write().await;
        imported.rows.insert(row.id, row);
        Ok(())
    }

    async fn imported_for_upload(&self, upload_id: u64) -> Result<Vec<ImportedPayment>> {
        let imported = self.imported.read().await;
        Ok(imported
            .rows
            .values()
            .filter(|p| p.upload_id == upload_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::lease::LeaseStatus;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_lease_store_filters_active() {
        let store = InMemoryStore::new();
        store
            .insert_leases(vec![
                Lease {
                    id: 0,
                    tenant_id: 1,
                    unit_id: 1,
                    monthly_rent: dec!(1000),
                    service_charge: dec!(0),
                    status: LeaseStatus::Active,
                },
                Lease {
                    id: 0,
                    tenant_id: 2,
                    unit_id: 2,
                    monthly_rent: dec!(2000),
                    service_charge: dec!(0),
                    status: LeaseStatus::Expired,
                },
            ])
            .await
            .unwrap();

        let active = store.active_leases().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].monthly_rent, dec!(1000));
        assert_ne!(active[0].id, 0);
    }

    #[tokio::test]
    async fn test_log_ids_are_sequential() {
        let store = InMemoryStore::new();
        let a = store
            .create_log(GenerationLog::started("a".to_string()))
            .await
            .unwrap();
        let b = store
            .create_log(GenerationLog::started("b".to_string()))
            .await
            .unwrap();
        assert_eq!(b, a + 1);

        let loaded = store.log(a).await.unwrap().unwrap();
        assert_eq!(loaded.id, a);
        assert_eq!(loaded.details, "a");
    }

    #[tokio::test]
    async fn test_delete_pending_scoped_to_log() {
        let store = InMemoryStore::new();
        let draft = |log_id: u64| PendingInvoice {
            id: 0,
            lease_id: 1,
            generation_log_id: log_id,
            invoice_number: "INV-202501-AAAAAA".to_string(),
            invoice_date: chrono::NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            due_date: chrono::NaiveDate::from_ymd_opt(2025, 2, 10).unwrap(),
            period_start: chrono::NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            period_end: chrono::NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
            rent_amount: dec!(1000),
            service_charge_amount: dec!(0),
            utilities_amount: dec!(0),
            total_amount: dec!(1000),
            notes: None,
        };
        store
            .insert_pending(vec![draft(1), draft(1), draft(2)])
            .await
            .unwrap();

        let deleted = store.delete_pending_for_log(1).await.unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(store.pending_for_log(2).await.unwrap().len(), 1);
    }
}
