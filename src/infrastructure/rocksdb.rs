use crate::domain::invoice::{GenerationLog, Invoice, PendingInvoice};
use crate::domain::lease::Lease;
use crate::domain::payment::{ImportedPayment, PaymentUpload};
use crate::domain::ports::{BillingStore, ImportStore, LeaseStore, TenantStore};
use crate::domain::tenant::Tenant;
use crate::error::{BillingError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, IteratorMode, Options};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;

/// Column family per entity table.
const CF_LEASES: &str = "leases";
const CF_TENANTS: &str = "tenants";
const CF_LOGS: &str = "generation_logs";
const CF_PENDING: &str = "pending_invoices";
const CF_INVOICES: &str = "invoices";
const CF_UPLOADS: &str = "payment_uploads";
const CF_IMPORTED: &str = "imported_payments";

const ALL_CFS: [&str; 7] = [
    CF_LEASES,
    CF_TENANTS,
    CF_LOGS,
    CF_PENDING,
    CF_INVOICES,
    CF_UPLOADS,
    CF_IMPORTED,
];

/// A persistent backend over RocksDB implementing every storage port.
///
/// Rows are keyed by big-endian id (so iteration order is id order) and
/// stored as JSON. Ids are assigned by reading the highest existing key;
/// concurrent writers are not the target deployment here, matching the
/// single-run semantics of the engines.
///
/// `Clone` shares the underlying `Arc<DB>`.
#[derive(Clone)]
pub struct RocksDbStore {
    db: Arc<DB>,
}

impl RocksDbStore {
    /// Opens or creates a database at `path` with all entity column
    /// families present.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = ALL_CFS
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect::<Vec<_>>();
        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self { db: Arc::new(db) })
    }

    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| BillingError::Internal(format!("column family {name} not found")))
    }

    fn put<T: Serialize>(&self, cf_name: &str, id: u64, row: &T) -> Result<()> {
        let cf = self.cf(cf_name)?;
        let value = serde_json::to_vec(row)
            .map_err(|e| BillingError::Internal(format!("serialization error: {e}")))?;
        self.db.put_cf(&cf, id.to_be_bytes(), value)?;
        Ok(())
    }

    fn get<T: DeserializeOwned>(&self, cf_name: &str, id: u64) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_cf(&cf, id.to_be_bytes())? {
            Some(bytes) => {
                let row = serde_json::from_slice(&bytes)
                    .map_err(|e| BillingError::Internal(format!("deserialization error: {e}")))?;
                Ok(Some(row))
            }
            None => Ok(None),
        }
    }

    fn scan<T: DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<T>> {
        let cf = self.cf(cf_name)?;
        let mut rows = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_key, value) =
                item.map_err(|e| BillingError::StorageUnavailable(e.to_string()))?;
            let row = serde_json::from_slice(&value)
                .map_err(|e| BillingError::Internal(format!("deserialization error: {e}")))?;
            rows.push(row);
        }
        Ok(rows)
    }

    /// Next auto-increment id: one past the highest existing key.
    fn next_id(&self, cf_name: &str) -> Result<u64> {
        let cf = self.cf(cf_name)?;
        match self.db.iterator_cf(&cf, IteratorMode::End).next() {
            Some(item) => {
                let (key, _value) =
                    item.map_err(|e| BillingError::StorageUnavailable(e.to_string()))?;
                let bytes: [u8; 8] = key
                    .as_ref()
                    .try_into()
                    .map_err(|_| BillingError::Internal("malformed row key".to_string()))?;
                Ok(u64::from_be_bytes(bytes) + 1)
            }
            None => Ok(1),
        }
    }
}

#[async_trait]
impl LeaseStore for RocksDbStore {
    async fn active_leases(&self) -> Result<Vec<Lease>> {
        let leases: Vec<Lease> = self.scan(CF_LEASES)?;
        Ok(leases.into_iter().filter(Lease::is_active).collect())
    }

    async fn insert_leases(&self, rows: Vec<Lease>) -> Result<u32> {
        let count = rows.len() as u32;
        let mut next = self.next_id(CF_LEASES)?;
        for mut lease in rows {
            if lease.id == 0 {
                lease.id = next;
            }
            next = next.max(lease.id + 1);
            self.put(CF_LEASES, lease.id, &lease)?;
        }
        Ok(count)
    }
}

#[async_trait]
impl TenantStore for RocksDbStore {
    async fn all_tenants(&self) -> Result<Vec<Tenant>> {
        self.scan(CF_TENANTS)
    }

    async fn insert_tenants(&self, rows: Vec<Tenant>) -> Result<u32> {
        let count = rows.len() as u32;
        let mut next = self.next_id(CF_TENANTS)?;
        for mut tenant in rows {
            if tenant.id == 0 {
                tenant.id = next;
            }
            next = next.max(tenant.id + 1);
            self.put(CF_TENANTS, tenant.id, &tenant)?;
        }
        Ok(count)
    }
}

#[async_trait]
impl BillingStore for RocksDbStore {
    async fn create_log(&self, mut log: GenerationLog) -> Result<u64> {
        log.id = self.next_id(CF_LOGS)?;
        self.put(CF_LOGS, log.id, &log)?;
        Ok(log.id)
    }

    async fn log(&self, id: u64) -> Result<Option<GenerationLog>> {
        self.get(CF_LOGS, id)
    }

    async fn save_log(&self, log: GenerationLog) -> Result<()> {
        self.put(CF_LOGS, log.id, &log)
    }

    async fn insert_pending(&self, rows: Vec<PendingInvoice>) -> Result<u32> {
        let count = rows.len() as u32;
        let mut next = self.next_id(CF_PENDING)?;
        for mut row in rows {
            row.id = next;
            next += 1;
            self.put(CF_PENDING, row.id, &row)?;
        }
        Ok(count)
    }

    async fn pending(&self, id: u64) -> Result<Option<PendingInvoice>> {
        self.get(CF_PENDING, id)
    }

    async fn pending_for_log(&self, log_id: u64) -> Result<Vec<PendingInvoice>> {
        let rows: Vec<PendingInvoice> = self.scan(CF_PENDING)?;
        Ok(rows
            .into_iter()
            .filter(|p| p.generation_log_id == log_id)
            .collect())
    }

    async fn save_pending(&self, row: PendingInvoice) -> Result<()> {
        self.put(CF_PENDING, row.id, &row)
    }

    async fn delete_pending_for_log(&self, log_id: u64) -> Result<u32> {
        let doomed = self.pending_for_log(log_id).await?;
        let cf = self.cf(CF_PENDING)?;
        let count = doomed.len() as u32;
        for row in doomed {
            self.db.delete_cf(&cf, row.id.to_be_bytes())?;
        }
        Ok(count)
    }

    async fn insert_invoices(&self, rows: Vec<Invoice>) -> Result<u32> {
        let count = rows.len() as u32;
        let mut next = self.next_id(CF_INVOICES)?;
        for mut row in rows {
            row.id = next;
            next += 1;
            self.put(CF_INVOICES, row.id, &row)?;
        }
        Ok(count)
    }

    async fn invoices(&self) -> Result<Vec<Invoice>> {
        self.scan(CF_INVOICES)
    }
}

#[async_trait]
impl ImportStore for RocksDbStore {
    async fn create_upload(&self, mut upload: PaymentUpload) -> Result<u64> {
        upload.id = self.next_id(CF_UPLOADS)?;
        self.put(CF_UPLOADS, upload.id, &upload)?;
        Ok(upload.id)
    }

    async fn upload(&self, id: u64) -> Result<Option<PaymentUpload>> {
        self.get(CF_UPLOADS, id)
    }

    async fn save_upload(&self, upload: PaymentUpload) -> Result<()> {
        self.put(CF_UPLOADS, upload.id, &upload)
    }

    async fn insert_imported(&self, mut row: ImportedPayment) -> Result<u64> {
        row.id = self.next_id(CF_IMPORTED)?;
        self.put(CF_IMPORTED, row.id, &row)?;
        Ok(row.id)
    }

    async fn imported(&self, id: u64) -> Result<Option<ImportedPayment>> {
        self.get(CF_IMPORTED, id)
    }

    async fn save_imported(&self, row: ImportedPayment) -> Result<()> {
        self.put(CF_IMPORTED, row.id, &row)
    }

    async fn imported_for_upload(&self, upload_id: u64) -> Result<Vec<ImportedPayment>> {
        let rows: Vec<ImportedPayment> = self.scan(CF_IMPORTED)?;
        Ok(rows
            .into_iter()
            .filter(|p| p.upload_id == upload_id)
            .collect())
    }
}
