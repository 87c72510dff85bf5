use crate::domain::invoice::{
    BillingPeriod, GenerationLog, GenerationStatus, PendingInvoice, invoice_number, round2,
};
use crate::domain::ports::{BillingStoreBox, LeaseStoreBox};
use crate::error::{BillingError, Result};
use rust_decimal::Decimal;
use std::collections::HashSet;
use tracing::{error, info, warn};

/// Outcome of one invoice-generation run.
///
/// `log_id` is `None` when there were no active leases and the run was
/// skipped without writing a generation log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutcome {
    pub log_id: Option<u64>,
    pub invoices_generated: u32,
    pub properties_affected: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalizeOutcome {
    pub invoices_finalized: u32,
}

/// Runs the monthly invoice lifecycle: bulk-generate drafts from active
/// leases, let an admin amend them, then finalize a batch into immutable
/// invoices.
pub struct BillingEngine {
    leases: LeaseStoreBox,
    store: BillingStoreBox,
}

impl BillingEngine {
    pub fn new(leases: LeaseStoreBox, store: BillingStoreBox) -> Self {
        Self { leases, store }
    }

    /// Generates draft invoices for the month containing today.
    pub async fn generate_for_current_period(&self) -> Result<GenerationOutcome> {
        self.generate_for_period(BillingPeriod::current()).await
    }

    /// Generates one draft invoice per active lease for the given month.
    ///
    /// A generation log is created up front with `pending_review` status
    /// and updated with the final counts at the end of the run. When a
    /// run fails after the log exists, the log is moved to `failed` with
    /// the error message in its details; when even that write fails, the
    /// failure is only visible in the operational log.
    pub async fn generate_for_period(&self, period: BillingPeriod) -> Result<GenerationOutcome> {
        let leases = self.leases.active_leases().await?;
        if leases.is_empty() {
            info!(period = %period.label(), "no active leases, skipping generation");
            return Ok(GenerationOutcome {
                log_id: None,
                invoices_generated: 0,
                properties_affected: 0,
            });
        }

        let log_id = self
            .store
            .create_log(GenerationLog::started(format!(
                "invoice generation for {}",
                period.label()
            )))
            .await?;

        match self.generate_batch(period, &leases, log_id).await {
            Ok(outcome) => {
                info!(
                    log_id,
                    invoices = outcome.invoices_generated,
                    period = %period.label(),
                    "generated pending invoices"
                );
                Ok(outcome)
            }
            Err(e) => {
                self.mark_run_failed(log_id, &e).await;
                Err(e)
            }
        }
    }

    async fn generate_batch(
        &self,
        period: BillingPeriod,
        leases: &[crate::domain::lease::Lease],
        log_id: u64,
    ) -> Result<GenerationOutcome> {
        let mut drafts = Vec::with_capacity(leases.len());
        let mut lease_ids = HashSet::new();
        for lease in leases {
            lease_ids.insert(lease.id);
            drafts.push(PendingInvoice {
                id: 0,
                lease_id: lease.id,
                generation_log_id: log_id,
                invoice_number: invoice_number(period),
                invoice_date: period.start(),
                due_date: period.due_date(),
                period_start: period.start(),
                period_end: period.end(),
                rent_amount: lease.monthly_rent,
                service_charge_amount: lease.service_charge,
                // No per-lease utilities in this version.
                utilities_amount: Decimal::ZERO,
                total_amount: round2(lease.monthly_rent + lease.service_charge),
                notes: Some(format!("rent for {}", period.label())),
            });
        }

        let invoices_generated = self.store.insert_pending(drafts).await?;
        let properties_affected = lease_ids.len() as u32;

        let mut log = self
            .store
            .log(log_id)
            .await?
            .ok_or(BillingError::NotFound {
                entity: "generation log",
                id: log_id,
            })?;
        log.invoices_generated = invoices_generated;
        log.properties_affected = properties_affected;
        log.details = format!(
            "generated {} invoices for {}",
            invoices_generated,
            period.label()
        );
        self.store.save_log(log).await?;

        Ok(GenerationOutcome {
            log_id: Some(log_id),
            invoices_generated,
            properties_affected,
        })
    }

    /// Best-effort write of the failure onto the generation log.
    async fn mark_run_failed(&self, log_id: u64, cause: &BillingError) {
        let fallback = async {
            let mut log = self.store.log(log_id).await?.ok_or(BillingError::NotFound {
                entity: "generation log",
                id: log_id,
            })?;
            log.status = GenerationStatus::Failed;
            log.details = format!("generation failed: {cause}");
            self.store.save_log(log).await
        };
        match fallback.await {
            Ok(()) => warn!(log_id, %cause, "generation run failed, log marked failed"),
            Err(e) => error!(log_id, %cause, fallback_error = %e, "generation run failed and the failure could not be recorded"),
        }
    }

    /// Overwrites a draft's line amounts and recomputes its total.
    pub async fn amend_pending(
        &self,
        pending_id: u64,
        rent: Decimal,
        service_charge: Decimal,
        utilities: Decimal,
        notes: Option<String>,
    ) -> Result<PendingInvoice> {
        if rent < Decimal::ZERO || service_charge < Decimal::ZERO || utilities < Decimal::ZERO {
            return Err(BillingError::Validation(
                "invoice amounts must not be negative".to_string(),
            ));
        }

        let mut draft = self
            .store
            .pending(pending_id)
            .await?
            .ok_or(BillingError::NotFound {
                entity: "pending invoice",
                id: pending_id,
            })?;

        draft.rent_amount = round2(rent);
        draft.service_charge_amount = round2(service_charge);
        draft.utilities_amount = round2(utilities);
        if let Some(notes) = notes {
            draft.notes = Some(notes);
        }
        draft.recompute_total();

        self.store.save_pending(draft.clone()).await?;
        Ok(draft)
    }

    /// Lists the drafts of one generation run for review.
    pub async fn pending_for_log(&self, log_id: u64) -> Result<Vec<PendingInvoice>> {
        self.store.pending_for_log(log_id).await
    }

    /// Converts every draft of a generation run into an invoice and
    /// deletes the drafts.
    ///
    /// Invoices are inserted before the drafts are deleted, so a crash in
    /// between leaves duplicates to clean up rather than silently losing
    /// drafts. Re-invoking after completion is a no-op reporting zero.
    pub async fn finalize(&self, log_id: u64) -> Result<FinalizeOutcome> {
        let drafts = self.store.pending_for_log(log_id).await?;
        if drafts.is_empty() {
            info!(log_id, "no pending invoices to finalize");
            return Ok(FinalizeOutcome {
                invoices_finalized: 0,
            });
        }

        let invoices = drafts.into_iter().map(PendingInvoice::into_invoice).collect();
        let invoices_finalized = self.store.insert_invoices(invoices).await?;
        self.store.delete_pending_for_log(log_id).await?;

        if let Some(mut log) = self.store.log(log_id).await? {
            log.status = GenerationStatus::Finalized;
            self.store.save_log(log).await?;
        }

        info!(log_id, invoices_finalized, "finalized generation run");
        Ok(FinalizeOutcome { invoices_finalized })
    }
}
