use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rand::Rng;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    PendingReview,
    Finalized,
    Failed,
}

/// Audit record of one invoice-generation run.
///
/// Created with zeroed counts when a run starts, updated with the final
/// counts when it ends. Status only ever moves out of `PendingReview`, to
/// `Finalized` or `Failed`, and never back.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct GenerationLog {
    pub id: u64,
    pub run_at: DateTime<Utc>,
    pub invoices_generated: u32,
    pub properties_affected: u32,
    pub status: GenerationStatus,
    pub details: String,
}

impl GenerationLog {
    pub fn started(details: String) -> Self {
        Self {
            id: 0,
            run_at: Utc::now(),
            invoices_generated: 0,
            properties_affected: 0,
            status: GenerationStatus::PendingReview,
            details,
        }
    }
}

/// A draft invoice awaiting admin approval.
///
/// Drafts stay editable until their generation log is finalized, at which
/// point every draft in the batch becomes an immutable [`Invoice`] and the
/// draft rows are deleted.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct PendingInvoice {
    pub id: u64,
    pub lease_id: u64,
    pub generation_log_id: u64,
    pub invoice_number: String,
    pub invoice_date: NaiveDate,
    pub due_date: NaiveDate,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub rent_amount: Decimal,
    pub service_charge_amount: Decimal,
    pub utilities_amount: Decimal,
    pub total_amount: Decimal,
    pub notes: Option<String>,
}

impl PendingInvoice {
    /// Recomputes the total from the line amounts, rounded to cents.
    pub fn recompute_total(&mut self) {
        self.total_amount =
            round2(self.rent_amount + self.service_charge_amount + self.utilities_amount);
    }

    /// Converts an approved draft into the invoice that will be persisted.
    pub fn into_invoice(self) -> Invoice {
        Invoice {
            id: 0,
            lease_id: self.lease_id,
            invoice_number: self.invoice_number,
            invoice_date: self.invoice_date,
            due_date: self.due_date,
            period_start: self.period_start,
            period_end: self.period_end,
            rent_amount: self.rent_amount,
            service_charge_amount: self.service_charge_amount,
            utilities_amount: self.utilities_amount,
            total_amount: self.total_amount,
            paid_amount: Decimal::ZERO,
            status: InvoiceStatus::Unpaid,
            notes: self.notes,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Unpaid,
    PartiallyPaid,
    FullyPaid,
    Overdue,
}

/// An issued billing record. Immutable once created except for
/// `paid_amount` and `status`, which the payment-recording side of the
/// system derives from recorded payments.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Invoice {
    pub id: u64,
    pub lease_id: u64,
    pub invoice_number: String,
    pub invoice_date: NaiveDate,
    pub due_date: NaiveDate,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub rent_amount: Decimal,
    pub service_charge_amount: Decimal,
    pub utilities_amount: Decimal,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub status: InvoiceStatus,
    pub notes: Option<String>,
}

/// One calendar month of rent. Handles the day-count and year-rollover
/// arithmetic for invoice generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillingPeriod {
    pub year: i32,
    pub month: u32,
}

impl BillingPeriod {
    pub fn new(year: i32, month: u32) -> Self {
        debug_assert!((1..=12).contains(&month));
        Self { year, month }
    }

    /// The period containing `today`.
    pub fn current() -> Self {
        let today = Utc::now().date_naive();
        Self::new(today.year(), today.month())
    }

    fn next(self) -> Self {
        if self.month == 12 {
            Self::new(self.year + 1, 1)
        } else {
            Self::new(self.year, self.month + 1)
        }
    }

    /// First calendar day of the month.
    pub fn start(self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// Last calendar day of the month (28-31, leap years included).
    pub fn end(self) -> NaiveDate {
        self.next().start().pred_opt().unwrap_or(NaiveDate::MAX)
    }

    /// Rent falls due on the 10th of the following month.
    pub fn due_date(self) -> NaiveDate {
        let next = self.next();
        NaiveDate::from_ymd_opt(next.year, next.month, 10).unwrap_or(NaiveDate::MAX)
    }

    pub fn label(self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }
}

const SUFFIX_CHARSET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const SUFFIX_LEN: usize = 6;

/// Generates an invoice number in the stable `INV-<yyyy><mm>-<suffix>`
/// format, where the suffix is a 6-character base-36 token.
///
/// The suffix only guards against same-run collisions; global uniqueness
/// is left to a storage-level constraint.
pub fn invoice_number(period: BillingPeriod) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| SUFFIX_CHARSET[rng.gen_range(0..SUFFIX_CHARSET.len())] as char)
        .collect();
    format!("INV-{:04}{:02}-{}", period.year, period.month, suffix)
}

/// Rounds a monetary amount to two fractional digits, midpoint away from
/// zero.
pub fn round2(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
