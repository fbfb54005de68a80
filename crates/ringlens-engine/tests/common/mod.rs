//! Shared fixtures for engine integration tests.

use chrono::{NaiveDate, NaiveDateTime};
use ringlens_core::Transaction;

/// Builds a timestamp on a fixed calendar day.
pub fn ts(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, day)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

/// Builds a transaction with a compact signature.
pub fn txn(id: &str, from: &str, to: &str, amount: f64, when: NaiveDateTime) -> Transaction {
    Transaction::new(id, from, to, amount, when)
}
