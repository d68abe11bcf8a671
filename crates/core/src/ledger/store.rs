//! Ledger store seam.
//!
//! The single interface through which balances and transaction rows are
//! read and mutated. The SeaORM implementation lives in `kobo-ledger`;
//! tests inject in-memory doubles. Every mutating operation is atomic
//! with respect to its wallet row.

use async_trait::async_trait;

use kobo_shared::Money;

use super::error::LedgerError;
use super::types::{
    CreditReversal, DebitReversal, Disposition, TransactionRecord, TxnReference, WalletBalances,
};

/// Durable record of wallet balances and the transaction log.
///
/// Implementations must run each mutating operation inside one storage
/// transaction holding the wallet row lock for the whole
/// read-check-write sequence.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Creates a wallet for a newly signed-up user. Idempotent.
    async fn create_wallet(&self, usertag: &str) -> Result<(), LedgerError>;

    /// Reads a wallet's balances.
    async fn balance(&self, usertag: &str) -> Result<WalletBalances, LedgerError>;

    /// Records a top-up attempt: inserts a `pending` credit row before the
    /// outbound charge call. No balance mutation.
    async fn credit_pending(
        &self,
        usertag: &str,
        amount: Money,
        reference: &TxnReference,
    ) -> Result<(), LedgerError>;

    /// Stores the provider's access code and reference after charge
    /// initialization.
    async fn mark_charge_initialized(
        &self,
        reference: &TxnReference,
        access_code: &str,
        provider_reference: &str,
    ) -> Result<(), LedgerError>;

    /// Reserves funds for a withdrawal: checks `available >= amount`,
    /// moves the amount from available to pending, and inserts an
    /// `initiated` debit row, all under the wallet row lock.
    async fn reserve_for_debit(
        &self,
        usertag: &str,
        amount: Money,
        reference: &TxnReference,
    ) -> Result<(), LedgerError>;

    /// Attaches the provider transfer code and moves the withdrawal
    /// `initiated -> pending`.
    async fn mark_transfer_started(
        &self,
        reference: &TxnReference,
        transfer_code: &str,
    ) -> Result<(), LedgerError>;

    /// Settles a top-up: `pending -> success`, increments available.
    /// Idempotent on replay.
    async fn finalize_credit(&self, reference: &TxnReference) -> Result<Disposition, LedgerError>;

    /// Settles a withdrawal: `initiated|pending -> success`, decrements
    /// pending. Idempotent on replay.
    async fn finalize_debit_success(
        &self,
        reference: &TxnReference,
    ) -> Result<Disposition, LedgerError>;

    /// Unwinds a withdrawal that failed or was reversed provider-side:
    /// moves the reserved amount back from pending to available.
    /// Idempotent; a reversal arriving for an already-settled transfer is
    /// a guarded no-op (`Disposition::Superseded`).
    async fn reverse_debit(
        &self,
        reference: &TxnReference,
        outcome: DebitReversal,
    ) -> Result<Disposition, LedgerError>;

    /// Marks a successful charge as disputed.
    async fn mark_disputed(&self, reference: &TxnReference) -> Result<Disposition, LedgerError>;

    /// Confirms a dispute resolved in the wallet's favor.
    async fn confirm_dispute_won(
        &self,
        reference: &TxnReference,
    ) -> Result<Disposition, LedgerError>;

    /// Applies a lost dispute: marks the credit `reversed` and debits the
    /// original amount from available. A shortfall is clamped, reported,
    /// and suspends the wallet.
    async fn reverse_credit(&self, reference: &TxnReference)
    -> Result<CreditReversal, LedgerError>;

    /// Lists a wallet's transactions, newest first.
    async fn transactions(&self, usertag: &str) -> Result<Vec<TransactionRecord>, LedgerError>;
}
