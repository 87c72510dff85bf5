//! Application layer orchestrating the two engines over the storage ports.
//!
//! [`billing::BillingEngine`] runs the monthly generate/review/finalize
//! lifecycle; [`importer::PaymentImporter`] persists parsed payment feeds
//! with their match outcomes. The engines own boxed store ports and never
//! call each other.

pub mod billing;
pub mod importer;
