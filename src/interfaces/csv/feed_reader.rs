//! Best-effort parser for uploaded payment feeds.
//!
//! Bank exports name their columns inconsistently, so the header row is
//! sniffed by substring instead of deserialized against a fixed schema:
//! the first column whose lower-cased name contains a canonical token
//! (`date`, `amount`, `name`/`payer`, `phone`, `reference`, `description`/
//! `note`) is used for that field. Rows that cannot be interpreted are
//! dropped silently; the caller only ever sees aggregate counts. Feeds
//! must be flat comma-separated text; Excel-native files have to be
//! pre-converted.

use crate::domain::payment::ParsedPayment;
use crate::error::Result;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use std::io::Read;
use std::str::FromStr;

/// Column positions resolved from a feed's header row.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct FeedColumns {
    date: Option<usize>,
    amount: Option<usize>,
    name: Option<usize>,
    phone: Option<usize>,
    reference: Option<usize>,
    description: Option<usize>,
}

impl FeedColumns {
    fn sniff(headers: &csv::StringRecord) -> Self {
        let find = |tokens: &[&str]| {
            headers.iter().position(|h| {
                let h = h.trim().to_lowercase();
                tokens.iter().any(|t| h.contains(t))
            })
        };
        Self {
            date: find(&["date"]),
            amount: find(&["amount"]),
            name: find(&["name", "payer"]),
            phone: find(&["phone"]),
            reference: find(&["reference", "ref"]),
            description: find(&["description", "note"]),
        }
    }
}

/// Reads a payment feed from any `Read` source.
pub struct PaymentFeedReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> PaymentFeedReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Parses the whole feed, keeping only rows with a positive amount
    /// and a resolvable payer name.
    pub fn payments(mut self) -> Result<Vec<ParsedPayment>> {
        let columns = FeedColumns::sniff(self.reader.headers()?);
        let today = Utc::now().date_naive();

        let mut payments = Vec::new();
        for record in self.reader.records() {
            let record = record?;
            if record.len() < 2 {
                continue;
            }
            if let Some(payment) = parse_row(&record, columns, today) {
                payments.push(payment);
            }
        }
        Ok(payments)
    }
}

fn field(record: &csv::StringRecord, index: Option<usize>) -> Option<&str> {
    let value = record.get(index?)?.trim();
    if value.is_empty() { None } else { Some(value) }
}

fn parse_row(
    record: &csv::StringRecord,
    columns: FeedColumns,
    today: NaiveDate,
) -> Option<ParsedPayment> {
    let amount = field(record, columns.amount)
        .and_then(|v| Decimal::from_str(v).ok())
        .unwrap_or(Decimal::ZERO);

    // "Unknown" stands in only when a name column exists but is blank;
    // without a name column the row is unattributable and dropped.
    let payer_name = match columns.name {
        Some(index) => field(record, Some(index)).unwrap_or("Unknown").to_string(),
        None => return None,
    };

    if amount <= Decimal::ZERO {
        return None;
    }

    let payment_date = field(record, columns.date)
        .and_then(parse_date)
        .unwrap_or(today);

    Some(ParsedPayment {
        payment_date,
        amount,
        payer_name,
        phone: field(record, columns.phone).map(str::to_string),
        reference: field(record, columns.reference).map(str::to_string),
        description: field(record, columns.description).map(str::to_string),
    })
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    for format in ["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Some(date);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn parse(feed: &str) -> Vec<ParsedPayment> {
        PaymentFeedReader::new(feed.as_bytes()).payments().unwrap()
    }

    #[test]
    fn test_negative_amount_rows_are_dropped() {
        let feed = "Date,Amount,Payer Name\n\
                    2025-01-15,50000,John Doe\n\
                    2025-01-16,-1000,Jane Smith";
        let payments = parse(feed);

        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].payer_name, "John Doe");
        assert_eq!(payments[0].amount, dec!(50000));
        assert_eq!(
            payments[0].payment_date,
            NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
        );
    }

    #[test]
    fn test_header_only_feed_is_empty() {
        assert!(parse("Date,Amount,Payer Name\n").is_empty());
    }

    #[test]
    fn test_header_sniffing_is_case_insensitive_and_fuzzy() {
        let feed = "TXN DATE,Paid Amount,PAYER,Phone Number,Ref,Notes\n\
                    2025-02-01,1200,Alice Wanjiku,0712345678,RT77,February rent";
        let payments = parse(feed);

        assert_eq!(payments.len(), 1);
        let p = &payments[0];
        assert_eq!(p.payer_name, "Alice Wanjiku");
        assert_eq!(p.amount, dec!(1200));
        assert_eq!(p.phone.as_deref(), Some("0712345678"));
        assert_eq!(p.reference.as_deref(), Some("RT77"));
        assert_eq!(p.description.as_deref(), Some("February rent"));
    }

    #[test]
    fn test_blank_name_defaults_to_unknown() {
        let feed = "Date,Amount,Name\n2025-01-15,500,";
        let payments = parse(feed);

        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].payer_name, "Unknown");
    }

    #[test]
    fn test_missing_name_column_drops_rows() {
        let feed = "Date,Amount\n2025-01-15,500";
        assert!(parse(feed).is_empty());
    }

    #[test]
    fn test_unparsable_amount_becomes_zero_and_drops_row() {
        let feed = "Date,Amount,Name\n2025-01-15,abc,John Doe";
        assert!(parse(feed).is_empty());
    }

    #[test]
    fn test_short_rows_are_skipped() {
        let feed = "Date,Amount,Name\njunk\n2025-01-15,500,John Doe";
        let payments = parse(feed);

        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].payer_name, "John Doe");
    }

    #[test]
    fn test_unparsable_date_defaults_to_today() {
        let feed = "Date,Amount,Name\nsoon,500,John Doe";
        let payments = parse(feed);

        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].payment_date, Utc::now().date_naive());
    }

    #[test]
    fn test_slash_date_formats() {
        let feed = "Date,Amount,Name\n15/01/2025,500,John Doe";
        let payments = parse(feed);
        assert_eq!(
            payments[0].payment_date,
            NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
        );
    }
}
