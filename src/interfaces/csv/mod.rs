//! CSV interfaces: the payment feed parser and serde-based record IO.

pub mod feed_reader;
pub mod records;
