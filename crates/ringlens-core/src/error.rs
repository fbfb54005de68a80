//! Error types for the analysis engine.

use thiserror::Error;

/// Main error type for analysis operations.
///
/// Detectors never raise: they either fire a signal or stay silent. Only the
/// top-level analysis entry point surfaces these, and only for invalid input
/// or an unrecoverable internal inconsistency.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The input batch contained no transactions.
    #[error("Empty input: analysis requires at least one transaction")]
    EmptyInput,

    /// A record violated an input invariant the ingestor should have enforced.
    #[error("Invalid transaction {transaction_id}: {reason}")]
    InvalidTransaction {
        transaction_id: String,
        reason: String,
    },

    /// Internal inconsistency (indicates a bug, not bad input).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Create an invalid-transaction error.
    pub fn invalid_transaction(
        transaction_id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidTransaction {
            transaction_id: transaction_id.into(),
            reason: reason.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Result type alias for analysis operations.
pub type EngineResult<T> = Result<T, EngineError>;
