//! Ledger error taxonomy.
//!
//! Everything a ledger operation can fail with, carrying enough context
//! for the API layer to map to a status code without inspecting driver
//! errors. No raw database errors cross this boundary.

use thiserror::Error;

use kobo_shared::Money;

use super::state::TransactionStatus;
use super::types::TxnReference;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Wallet does not exist.
    #[error("wallet not found: {0}")]
    WalletNotFound(String),

    /// Transaction reference does not exist.
    #[error("transaction not found: {0}")]
    TransactionNotFound(TxnReference),

    /// Available balance cannot cover the requested debit.
    #[error("insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds {
        /// Spendable balance at check time.
        available: Money,
        /// Amount the caller asked to move.
        requested: Money,
    },

    /// Wallet is suspended and cannot move money.
    #[error("wallet {0} is suspended")]
    WalletSuspended(String),

    /// Illegal state-machine transition attempted.
    #[error("invalid transition for {reference}: {from} -> {to}")]
    InvalidTransition {
        /// Transaction the transition was attempted on.
        reference: TxnReference,
        /// Current status.
        from: TransactionStatus,
        /// Requested status.
        to: TransactionStatus,
    },

    /// Reference collision on transaction creation.
    #[error("duplicate transaction reference: {0}")]
    DuplicateReference(TxnReference),

    /// Amount failed validation (non-positive or out of range).
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Database error (sanitized).
    #[error("database error: {0}")]
    Database(String),

    /// Internal invariant violation.
    #[error("internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::WalletNotFound(_) => "WALLET_NOT_FOUND",
            Self::TransactionNotFound(_) => "TRANSACTION_NOT_FOUND",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::WalletSuspended(_) => "WALLET_SUSPENDED",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::DuplicateReference(_) => "DUPLICATE_REFERENCE",
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::WalletNotFound(_) | Self::TransactionNotFound(_) => 404,
            Self::InsufficientFunds { .. } | Self::WalletSuspended(_) => 422,
            Self::InvalidTransition { .. } | Self::DuplicateReference(_) => 409,
            Self::InvalidAmount(_) => 400,
            Self::Database(_) | Self::Internal(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(LedgerError::WalletNotFound("x".into()).http_status_code(), 404);
        assert_eq!(
            LedgerError::InsufficientFunds {
                available: Money::from_minor(100),
                requested: Money::from_minor(200),
            }
            .http_status_code(),
            422
        );
        assert_eq!(
            LedgerError::DuplicateReference(TxnReference::from_raw("r")).http_status_code(),
            409
        );
        assert_eq!(LedgerError::Database("boom".into()).http_status_code(), 500);
    }

    #[test]
    fn test_insufficient_funds_display() {
        let err = LedgerError::InsufficientFunds {
            available: Money::from_minor(60_000),
            requested: Money::from_minor(100_000),
        };
        assert_eq!(
            err.to_string(),
            "insufficient funds: available 600.00, requested 1000.00"
        );
    }
}
