use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum LeaseStatus {
    Active,
    Terminated,
    Expired,
}

/// A rental agreement between a tenant and a unit.
///
/// Leases are read-only input to invoice generation; they are created and
/// terminated by the lease-management side of the system, which this crate
/// only observes through [`crate::domain::ports::LeaseStore`].
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Lease {
    #[serde(default)]
    pub id: u64,
    pub tenant_id: u64,
    pub unit_id: u64,
    pub monthly_rent: Decimal,
    pub service_charge: Decimal,
    pub status: LeaseStatus,
}

impl Lease {
    pub fn is_active(&self) -> bool {
        self.status == LeaseStatus::Active
    }
}
