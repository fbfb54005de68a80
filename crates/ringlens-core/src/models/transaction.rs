//! Transaction record model.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A single validated transaction between two accounts.
///
/// Records are immutable once constructed. Self-loops (sender equals
/// receiver) and parallel transactions between the same pair are allowed;
/// the graph retains them verbatim.
///
/// Timestamps carry millisecond resolution and are interpreted in their
/// native calendar: hour-of-day and day-of-week computations never apply a
/// time-zone conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Opaque transaction identifier.
    pub transaction_id: String,
    /// Opaque account identifier of the sending party.
    pub sender_id: String,
    /// Opaque account identifier of the receiving party.
    pub receiver_id: String,
    /// Non-negative transaction amount.
    pub amount: f64,
    /// Absolute instant of the transaction.
    pub timestamp: NaiveDateTime,
}

impl Transaction {
    /// Creates a new transaction record.
    pub fn new(
        transaction_id: impl Into<String>,
        sender_id: impl Into<String>,
        receiver_id: impl Into<String>,
        amount: f64,
        timestamp: NaiveDateTime,
    ) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            sender_id: sender_id.into(),
            receiver_id: receiver_id.into(),
            amount,
            timestamp,
        }
    }

    /// Timestamp in milliseconds since the epoch, for window arithmetic.
    pub fn ts_millis(&self) -> i64 {
        self.timestamp.and_utc().timestamp_millis()
    }

    /// Whether sender and receiver are the same account.
    pub fn is_self_loop(&self) -> bool {
        self.sender_id == self.receiver_id
    }
}

/// Milliseconds in one hour, the base unit of the sliding-window detectors.
pub const HOUR_MS: i64 = 3_600_000;

/// Milliseconds in one day.
pub const DAY_MS: i64 = 24 * HOUR_MS;
