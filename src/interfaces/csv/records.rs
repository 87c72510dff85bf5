use crate::error::{BillingError, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::{Read, Write};
use std::marker::PhantomData;

/// Reads serde-deserializable rows (leases, tenants) from a CSV source.
///
/// Wraps `csv::Reader` with whitespace trimming and flexible record
/// lengths, and yields rows lazily so large files stream.
pub struct RecordReader<R: Read, T> {
    reader: csv::Reader<R>,
    _marker: PhantomData<T>,
}

impl<R: Read, T: DeserializeOwned> RecordReader<R, T> {
    /// Creates a reader from any `Read` source (e.g. File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self {
            reader,
            _marker: PhantomData,
        }
    }

    /// Returns an iterator that lazily reads and deserializes rows.
    pub fn records(self) -> impl Iterator<Item = Result<T>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(BillingError::from))
    }

    /// Collects the whole file, failing on the first malformed row.
    pub fn collect_all(self) -> Result<Vec<T>> {
        self.records().collect()
    }
}

/// Writes serde-serializable rows (pending invoices under review, match
/// results) as CSV.
pub struct RecordWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_all<T: Serialize>(&mut self, rows: impl IntoIterator<Item = T>) -> Result<()> {
        for row in rows {
            self.writer.serialize(row)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
