//! # ringlens-ingest
//!
//! CSV ingestion and schema validation. The engine assumes valid input; this
//! crate is the gate that makes the assumption true. Rows are rejected when a
//! field is missing or empty, the amount is non-positive or non-numeric, or
//! the timestamp does not match `YYYY-MM-DD HH:MM:SS`.
//!
//! Amounts are parsed as [`Decimal`] so validation sees the exact value the
//! row carried, then converted to `f64` for the statistical engine.

use std::io::Read;
use std::path::Path;

use chrono::NaiveDateTime;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use ringlens_core::Transaction;

/// Timestamp pattern accepted by the inbound contract.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Ingestion error type.
#[derive(Error, Debug)]
pub enum IngestError {
    /// CSV-level failure (unreadable file, malformed quoting, wrong arity).
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error opening the input.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A row violated the record contract.
    #[error("Row {row}: {reason}")]
    InvalidRow { row: u64, reason: String },
}

impl IngestError {
    fn invalid(row: u64, reason: impl Into<String>) -> Self {
        Self::InvalidRow {
            row,
            reason: reason.into(),
        }
    }
}

/// Result type alias for ingestion operations.
pub type IngestResult<T> = Result<T, IngestError>;

/// Raw CSV row before validation.
#[derive(Debug, Deserialize)]
struct RawRecord {
    transaction_id: String,
    sender_id: String,
    receiver_id: String,
    amount: String,
    timestamp: String,
}

/// A rejected row and the reason it was dropped (lenient mode).
#[derive(Debug, Clone)]
pub struct RejectedRow {
    pub row: u64,
    pub reason: String,
}

/// Outcome of a lenient ingestion pass.
#[derive(Debug)]
pub struct IngestSummary {
    pub transactions: Vec<Transaction>,
    pub rejected: Vec<RejectedRow>,
}

/// Reads and validates a whole CSV file, failing on the first bad row.
pub fn read_transactions(path: &Path) -> IngestResult<Vec<Transaction>> {
    let file = std::fs::File::open(path)?;
    read_transactions_from(file)
}

/// Strict ingestion from any reader: the first invalid row aborts the pass.
pub fn read_transactions_from<R: Read>(reader: R) -> IngestResult<Vec<Transaction>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut transactions = Vec::new();
    for (idx, record) in csv_reader.deserialize::<RawRecord>().enumerate() {
        let row = idx as u64 + 2; // header is row 1
        let record = record?;
        transactions.push(validate(record, row)?);
    }
    debug!(rows = transactions.len(), "ingested transaction batch");
    Ok(transactions)
}

/// Lenient ingestion: invalid rows are collected instead of aborting.
/// CSV-level errors (wrong arity, broken quoting) still abort.
pub fn read_transactions_lenient<R: Read>(reader: R) -> IngestResult<IngestSummary> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut transactions = Vec::new();
    let mut rejected = Vec::new();
    for (idx, record) in csv_reader.deserialize::<RawRecord>().enumerate() {
        let row = idx as u64 + 2;
        let record = record?;
        match validate(record, row) {
            Ok(txn) => transactions.push(txn),
            Err(IngestError::InvalidRow { row, reason }) => {
                warn!(row, %reason, "rejecting row");
                rejected.push(RejectedRow { row, reason });
            }
            Err(other) => return Err(other),
        }
    }
    Ok(IngestSummary {
        transactions,
        rejected,
    })
}

/// Applies the record contract to one raw row.
fn validate(record: RawRecord, row: u64) -> IngestResult<Transaction> {
    if record.transaction_id.trim().is_empty() {
        return Err(IngestError::invalid(row, "missing transaction_id"));
    }
    if record.sender_id.trim().is_empty() {
        return Err(IngestError::invalid(row, "missing sender_id"));
    }
    if record.receiver_id.trim().is_empty() {
        return Err(IngestError::invalid(row, "missing receiver_id"));
    }

    let amount: Decimal = record.amount.trim().parse().map_err(|_| {
        IngestError::invalid(row, format!("non-numeric amount {:?}", record.amount))
    })?;
    if amount <= Decimal::ZERO {
        return Err(IngestError::invalid(
            row,
            format!("non-positive amount {amount}"),
        ));
    }
    let amount = amount.to_f64().ok_or_else(|| {
        IngestError::invalid(row, format!("amount {amount} out of range"))
    })?;

    let timestamp = NaiveDateTime::parse_from_str(record.timestamp.trim(), TIMESTAMP_FORMAT)
        .map_err(|_| {
            IngestError::invalid(
                row,
                format!(
                    "timestamp {:?} does not match YYYY-MM-DD HH:MM:SS",
                    record.timestamp
                ),
            )
        })?;

    Ok(Transaction::new(
        record.transaction_id.trim(),
        record.sender_id.trim(),
        record.receiver_id.trim(),
        amount,
        timestamp,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "transaction_id,sender_id,receiver_id,amount,timestamp\n";

    fn ingest(rows: &str) -> IngestResult<Vec<Transaction>> {
        read_transactions_from(format!("{HEADER}{rows}").as_bytes())
    }

    #[test]
    fn test_valid_rows_parse() {
        let txns = ingest(
            "t1,A,B,1000.50,2024-01-01 10:30:00\n\
             t2,B,C,99.99,2024-01-02 23:59:59\n",
        )
        .unwrap();
        assert_eq!(txns.len(), 2);
        assert_eq!(txns[0].transaction_id, "t1");
        assert_eq!(txns[0].amount, 1000.50);
        assert_eq!(txns[1].receiver_id, "C");
    }

    #[test]
    fn test_missing_field_rejected() {
        let err = ingest("t1,,B,100,2024-01-01 10:00:00\n").unwrap_err();
        assert!(matches!(err, IngestError::InvalidRow { row: 2, .. }));
    }

    #[test]
    fn test_non_positive_amount_rejected() {
        assert!(ingest("t1,A,B,0,2024-01-01 10:00:00\n").is_err());
        assert!(ingest("t1,A,B,-5.00,2024-01-01 10:00:00\n").is_err());
        assert!(ingest("t1,A,B,abc,2024-01-01 10:00:00\n").is_err());
    }

    #[test]
    fn test_bad_timestamp_rejected() {
        assert!(ingest("t1,A,B,100,2024-01-01T10:00:00\n").is_err());
        assert!(ingest("t1,A,B,100,01/01/2024 10:00\n").is_err());
        assert!(ingest("t1,A,B,100,2024-13-01 10:00:00\n").is_err());
    }

    #[test]
    fn test_error_carries_row_number() {
        let err = ingest(
            "t1,A,B,100,2024-01-01 10:00:00\n\
             t2,A,B,bad,2024-01-01 11:00:00\n",
        )
        .unwrap_err();
        match err {
            IngestError::InvalidRow { row, .. } => assert_eq!(row, 3),
            other => panic!("expected invalid row, got {other}"),
        }
    }

    #[test]
    fn test_lenient_mode_collects_rejects() {
        let input = format!(
            "{HEADER}t1,A,B,100,2024-01-01 10:00:00\n\
             t2,A,B,-1,2024-01-01 11:00:00\n\
             t3,A,B,200,2024-01-01 12:00:00\n"
        );
        let summary = read_transactions_lenient(input.as_bytes()).unwrap();
        assert_eq!(summary.transactions.len(), 2);
        assert_eq!(summary.rejected.len(), 1);
        assert_eq!(summary.rejected[0].row, 3);
    }

    #[test]
    fn test_whitespace_trimmed() {
        let txns = ingest("t1, A , B ,100, 2024-01-01 10:00:00 \n").unwrap();
        assert_eq!(txns[0].sender_id, "A");
        assert_eq!(txns[0].receiver_id, "B");
    }
}
