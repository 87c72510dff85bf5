//! Storage ports consumed by the engines.
//!
//! The backing store assigns ids on insert (returned to the caller) and is
//! assumed to serialize individual statements; no multi-statement
//! transactions are available through these ports, so callers order their
//! writes defensively.

use crate::domain::invoice::{GenerationLog, Invoice, PendingInvoice};
use crate::domain::lease::Lease;
use crate::domain::payment::{ImportedPayment, PaymentUpload};
use crate::domain::tenant::Tenant;
use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait LeaseStore: Send + Sync {
    async fn active_leases(&self) -> Result<Vec<Lease>>;
    async fn insert_leases(&self, leases: Vec<Lease>) -> Result<u32>;
}

#[async_trait]
pub trait TenantStore: Send + Sync {
    async fn all_tenants(&self) -> Result<Vec<Tenant>>;
    async fn insert_tenants(&self, tenants: Vec<Tenant>) -> Result<u32>;
}

#[async_trait]
pub trait BillingStore: Send + Sync {
    /// Inserts a new generation log and returns its assigned id.
    async fn create_log(&self, log: GenerationLog) -> Result<u64>;
    async fn log(&self, id: u64) -> Result<Option<GenerationLog>>;
    /// Overwrites an existing log by id.
    async fn save_log(&self, log: GenerationLog) -> Result<()>;

    async fn insert_pending(&self, rows: Vec<PendingInvoice>) -> Result<u32>;
    async fn pending(&self, id: u64) -> Result<Option<PendingInvoice>>;
    async fn pending_for_log(&self, log_id: u64) -> Result<Vec<PendingInvoice>>;
    async fn save_pending(&self, row: PendingInvoice) -> Result<()>;
    async fn delete_pending_for_log(&self, log_id: u64) -> Result<u32>;

    async fn insert_invoices(&self, rows: Vec<Invoice>) -> Result<u32>;
    async fn invoices(&self) -> Result<Vec<Invoice>>;
}

#[async_trait]
pub trait ImportStore: Send + Sync {
    /// Registers a new upload and returns its assigned id.
    async fn create_upload(&self, upload: PaymentUpload) -> Result<u64>;
    async fn upload(&self, id: u64) -> Result<Option<PaymentUpload>>;
    async fn save_upload(&self, upload: PaymentUpload) -> Result<()>;

    async fn insert_imported(&self, row: ImportedPayment) -> Result<u64>;
    async fn imported(&self, id: u64) -> Result<Option<ImportedPayment>>;
    async fn save_imported(&self, row: ImportedPayment) -> Result<()>;
    async fn imported_for_upload(&self, upload_id: u64) -> Result<Vec<ImportedPayment>>;
}

pub type LeaseStoreBox = Box<dyn LeaseStore>;
pub type TenantStoreBox = Box<dyn TenantStore>;
pub type BillingStoreBox = Box<dyn BillingStore>;
pub type ImportStoreBox = Box<dyn ImportStore>;
