//! Wallet ledger domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use kobo_shared::Money;

use super::state::TransactionStatus;

/// Direction of money movement relative to the wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Funds entering the wallet.
    Credit,
    /// Funds leaving the wallet.
    Debit,
}

/// Business purpose of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Purpose {
    /// Wallet funding through provider checkout.
    Topup,
    /// Payout to a registered bank account.
    Withdrawal,
    /// Internal debit paying for an appointment.
    ServicePayment,
}

impl Purpose {
    /// Prefix used when generating provider-facing references.
    #[must_use]
    pub const fn reference_prefix(self) -> &'static str {
        match self {
            Self::Topup => "wallet_topup",
            Self::Withdrawal => "wallet_withdrawal",
            Self::ServicePayment => "service_payment",
        }
    }
}

/// Wallet lifecycle status. Wallets are suspended, never deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletStatus {
    /// Wallet can move money.
    Active,
    /// Wallet is frozen pending manual review.
    Suspended,
}

/// A wallet's committed balances.
///
/// Invariant: both balances are non-negative at every committed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WalletBalances {
    /// Spendable funds.
    pub available: Money,
    /// Funds earmarked for in-flight withdrawals.
    pub pending: Money,
    /// Wallet status.
    pub status: WalletStatus,
}

/// Provider-facing transaction reference.
///
/// Globally unique, generated as `<purpose>_<usertag>_<unix-ts>` and used to
/// correlate internal rows with provider records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxnReference(String);

impl TxnReference {
    /// Generates a reference for a new transaction.
    #[must_use]
    pub fn generate(purpose: Purpose, usertag: &str, at: DateTime<Utc>) -> Self {
        Self(format!(
            "{}_{}_{}",
            purpose.reference_prefix(),
            usertag,
            at.timestamp()
        ))
    }

    /// Wraps a reference received from the provider or storage.
    #[must_use]
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the reference string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TxnReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of applying an idempotent ledger mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// The mutation was applied now.
    Applied,
    /// The transaction was already in the requested state; nothing changed.
    AlreadyApplied,
    /// A terminal state takes precedence over the requested change;
    /// nothing changed.
    Superseded,
}

/// Terminal outcome for reversing a reserved debit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebitReversal {
    /// The transfer never completed (`transfer.failed`).
    Failed,
    /// The transfer was unwound by the provider (`transfer.reversed`).
    Reversed,
}

impl DebitReversal {
    /// The transaction status this reversal lands in.
    #[must_use]
    pub const fn target_status(self) -> TransactionStatus {
        match self {
            Self::Failed => TransactionStatus::Failed,
            Self::Reversed => TransactionStatus::Reversed,
        }
    }
}

/// Result of reversing a previously successful credit (dispute lost).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreditReversal {
    /// Whether the reversal was applied or replayed.
    pub disposition: Disposition,
    /// Amount by which the wallet could not cover the reversal. When
    /// present, the wallet has been suspended for manual reconciliation.
    pub shortfall: Option<Money>,
}

/// A transaction row as seen by callers of the ledger store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionRecord {
    /// Provider-facing reference.
    pub reference: TxnReference,
    /// Amount in minor units.
    pub amount: Money,
    /// Credit or debit.
    pub direction: Direction,
    /// Business purpose.
    pub purpose: Purpose,
    /// Current state-machine status.
    pub status: TransactionStatus,
    /// Provider-assigned reference, if assigned.
    pub provider_reference: Option<String>,
    /// Provider transfer code, if assigned.
    pub transfer_code: Option<String>,
    /// Caller-supplied note (service payments).
    pub memo: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_reference_format() {
        let at = Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap();
        let r = TxnReference::generate(Purpose::Topup, "ada_01", at);
        assert_eq!(r.as_str(), format!("wallet_topup_ada_01_{}", at.timestamp()));

        let w = TxnReference::generate(Purpose::Withdrawal, "ada_01", at);
        assert!(w.as_str().starts_with("wallet_withdrawal_"));
    }

    #[test]
    fn test_reference_prefixes_distinct() {
        assert_ne!(
            Purpose::Topup.reference_prefix(),
            Purpose::ServicePayment.reference_prefix()
        );
    }

    #[test]
    fn test_debit_reversal_targets() {
        assert_eq!(
            DebitReversal::Failed.target_status(),
            TransactionStatus::Failed
        );
        assert_eq!(
            DebitReversal::Reversed.target_status(),
            TransactionStatus::Reversed
        );
    }
}
