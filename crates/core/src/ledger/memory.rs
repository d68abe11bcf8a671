//! In-memory ledger store.
//!
//! Reference implementation of the [`LedgerStore`] contract over a
//! mutex-guarded map. It mirrors the durable repository's idempotency
//! and guard rules and backs unit tests and local tooling; it is not a
//! substitute for the database-backed store in production.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use kobo_shared::Money;

use super::error::LedgerError;
use super::state::TransactionStatus;
use super::store::LedgerStore;
use super::types::{
    CreditReversal, DebitReversal, Direction, Disposition, Purpose, TransactionRecord,
    TxnReference, WalletBalances, WalletStatus,
};

#[derive(Debug, Clone)]
struct TxnRow {
    usertag: String,
    amount: Money,
    direction: Direction,
    purpose: Purpose,
    status: TransactionStatus,
}

#[derive(Debug, Default)]
struct State {
    wallets: HashMap<String, (Money, Money, WalletStatus)>,
    txns: HashMap<String, TxnRow>,
}

/// In-memory implementation of the ledger store.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    inner: Mutex<State>,
}

impl MemoryLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a ledger with one active wallet holding `available` minor
    /// units.
    #[must_use]
    pub fn with_wallet(usertag: &str, available: i64) -> Self {
        let ledger = Self::new();
        ledger.inner.lock().unwrap().wallets.insert(
            usertag.to_string(),
            (Money::from_minor(available), Money::ZERO, WalletStatus::Active),
        );
        ledger
    }

    /// Returns `(available, pending)` minor units for a wallet.
    ///
    /// # Panics
    ///
    /// Panics if the wallet does not exist.
    #[must_use]
    pub fn snapshot(&self, usertag: &str) -> (i64, i64) {
        let state = self.inner.lock().unwrap();
        let (available, pending, _) = state.wallets[usertag];
        (available.minor(), pending.minor())
    }

    /// Returns a transaction's current status.
    ///
    /// # Panics
    ///
    /// Panics if the reference does not exist.
    #[must_use]
    pub fn status_of(&self, reference: &str) -> TransactionStatus {
        self.inner.lock().unwrap().txns[reference].status
    }

    fn with_state<T>(
        &self,
        f: impl FnOnce(&mut State) -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        let mut state = self.inner.lock().unwrap();
        f(&mut state)
    }
}

fn wallet_mut<'a>(
    state: &'a mut State,
    usertag: &str,
) -> Result<&'a mut (Money, Money, WalletStatus), LedgerError> {
    state
        .wallets
        .get_mut(usertag)
        .ok_or_else(|| LedgerError::WalletNotFound(usertag.to_string()))
}

fn txn_of(state: &State, reference: &TxnReference) -> Result<TxnRow, LedgerError> {
    state
        .txns
        .get(reference.as_str())
        .cloned()
        .ok_or_else(|| LedgerError::TransactionNotFound(reference.clone()))
}

fn overflow(e: kobo_shared::types::money::MoneyError) -> LedgerError {
    LedgerError::Internal(e.to_string())
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn create_wallet(&self, usertag: &str) -> Result<(), LedgerError> {
        self.with_state(|state| {
            state
                .wallets
                .entry(usertag.to_string())
                .or_insert((Money::ZERO, Money::ZERO, WalletStatus::Active));
            Ok(())
        })
    }

    async fn balance(&self, usertag: &str) -> Result<WalletBalances, LedgerError> {
        self.with_state(|state| {
            let (available, pending, status) = *wallet_mut(state, usertag)?;
            Ok(WalletBalances {
                available,
                pending,
                status,
            })
        })
    }

    async fn credit_pending(
        &self,
        usertag: &str,
        amount: Money,
        reference: &TxnReference,
    ) -> Result<(), LedgerError> {
        self.with_state(|state| {
            if state.txns.contains_key(reference.as_str()) {
                return Err(LedgerError::DuplicateReference(reference.clone()));
            }
            let (_, _, status) = *wallet_mut(state, usertag)?;
            if status != WalletStatus::Active {
                return Err(LedgerError::WalletSuspended(usertag.to_string()));
            }
            state.txns.insert(
                reference.as_str().to_string(),
                TxnRow {
                    usertag: usertag.to_string(),
                    amount,
                    direction: Direction::Credit,
                    purpose: Purpose::Topup,
                    status: TransactionStatus::Pending,
                },
            );
            Ok(())
        })
    }

    async fn mark_charge_initialized(
        &self,
        reference: &TxnReference,
        _access_code: &str,
        _provider_reference: &str,
    ) -> Result<(), LedgerError> {
        self.with_state(|state| txn_of(state, reference).map(drop))
    }

    async fn reserve_for_debit(
        &self,
        usertag: &str,
        amount: Money,
        reference: &TxnReference,
    ) -> Result<(), LedgerError> {
        self.with_state(|state| {
            if state.txns.contains_key(reference.as_str()) {
                return Err(LedgerError::DuplicateReference(reference.clone()));
            }
            let (available, pending, status) = wallet_mut(state, usertag)?;
            if *status != WalletStatus::Active {
                return Err(LedgerError::WalletSuspended(usertag.to_string()));
            }
            if *available < amount {
                return Err(LedgerError::InsufficientFunds {
                    available: *available,
                    requested: amount,
                });
            }
            *available = available.checked_sub(amount).map_err(overflow)?;
            *pending = pending.checked_add(amount).map_err(overflow)?;
            state.txns.insert(
                reference.as_str().to_string(),
                TxnRow {
                    usertag: usertag.to_string(),
                    amount,
                    direction: Direction::Debit,
                    purpose: Purpose::Withdrawal,
                    status: TransactionStatus::Initiated,
                },
            );
            Ok(())
        })
    }

    async fn mark_transfer_started(
        &self,
        reference: &TxnReference,
        _transfer_code: &str,
    ) -> Result<(), LedgerError> {
        self.with_state(|state| {
            let row = txn_of(state, reference)?;
            let next = row
                .status
                .transition(TransactionStatus::Pending, reference)?;
            state.txns.get_mut(reference.as_str()).unwrap().status = next;
            Ok(())
        })
    }

    async fn finalize_credit(&self, reference: &TxnReference) -> Result<Disposition, LedgerError> {
        self.with_state(|state| {
            let row = txn_of(state, reference)?;
            match row.status {
                TransactionStatus::Success => Ok(Disposition::AlreadyApplied),
                TransactionStatus::Pending => {
                    let (available, _, _) = wallet_mut(state, &row.usertag)?;
                    *available = available.checked_add(row.amount).map_err(overflow)?;
                    state.txns.get_mut(reference.as_str()).unwrap().status =
                        TransactionStatus::Success;
                    Ok(Disposition::Applied)
                }
                other => Err(LedgerError::InvalidTransition {
                    reference: reference.clone(),
                    from: other,
                    to: TransactionStatus::Success,
                }),
            }
        })
    }

    async fn finalize_debit_success(
        &self,
        reference: &TxnReference,
    ) -> Result<Disposition, LedgerError> {
        self.with_state(|state| {
            let row = txn_of(state, reference)?;
            match row.status {
                TransactionStatus::Success => Ok(Disposition::AlreadyApplied),
                TransactionStatus::Initiated | TransactionStatus::Pending => {
                    let (_, pending, _) = wallet_mut(state, &row.usertag)?;
                    *pending = pending.checked_sub(row.amount).map_err(overflow)?;
                    state.txns.get_mut(reference.as_str()).unwrap().status =
                        TransactionStatus::Success;
                    Ok(Disposition::Applied)
                }
                other => Err(LedgerError::InvalidTransition {
                    reference: reference.clone(),
                    from: other,
                    to: TransactionStatus::Success,
                }),
            }
        })
    }

    async fn reverse_debit(
        &self,
        reference: &TxnReference,
        outcome: DebitReversal,
    ) -> Result<Disposition, LedgerError> {
        self.with_state(|state| {
            let row = txn_of(state, reference)?;
            let target = outcome.target_status();
            match row.status {
                current if current == target => Ok(Disposition::AlreadyApplied),
                TransactionStatus::Success
                | TransactionStatus::Failed
                | TransactionStatus::Reversed => Ok(Disposition::Superseded),
                TransactionStatus::Initiated | TransactionStatus::Pending => {
                    let (available, pending, _) = wallet_mut(state, &row.usertag)?;
                    *pending = pending.checked_sub(row.amount).map_err(overflow)?;
                    *available = available.checked_add(row.amount).map_err(overflow)?;
                    state.txns.get_mut(reference.as_str()).unwrap().status = target;
                    Ok(Disposition::Applied)
                }
                other => Err(LedgerError::InvalidTransition {
                    reference: reference.clone(),
                    from: other,
                    to: target,
                }),
            }
        })
    }

    async fn mark_disputed(&self, reference: &TxnReference) -> Result<Disposition, LedgerError> {
        self.with_state(|state| {
            let row = txn_of(state, reference)?;
            match row.status {
                TransactionStatus::Disputed => Ok(Disposition::AlreadyApplied),
                TransactionStatus::Success => {
                    state.txns.get_mut(reference.as_str()).unwrap().status =
                        TransactionStatus::Disputed;
                    Ok(Disposition::Applied)
                }
                other => Err(LedgerError::InvalidTransition {
                    reference: reference.clone(),
                    from: other,
                    to: TransactionStatus::Disputed,
                }),
            }
        })
    }

    async fn confirm_dispute_won(
        &self,
        reference: &TxnReference,
    ) -> Result<Disposition, LedgerError> {
        self.with_state(|state| {
            let row = txn_of(state, reference)?;
            match row.status {
                TransactionStatus::Success => Ok(Disposition::AlreadyApplied),
                TransactionStatus::Disputed => {
                    state.txns.get_mut(reference.as_str()).unwrap().status =
                        TransactionStatus::Success;
                    Ok(Disposition::Applied)
                }
                other => Err(LedgerError::InvalidTransition {
                    reference: reference.clone(),
                    from: other,
                    to: TransactionStatus::Success,
                }),
            }
        })
    }

    async fn reverse_credit(
        &self,
        reference: &TxnReference,
    ) -> Result<CreditReversal, LedgerError> {
        self.with_state(|state| {
            let row = txn_of(state, reference)?;
            match row.status {
                TransactionStatus::Reversed => Ok(CreditReversal {
                    disposition: Disposition::AlreadyApplied,
                    shortfall: None,
                }),
                TransactionStatus::Success | TransactionStatus::Disputed => {
                    let (available, _, status) = wallet_mut(state, &row.usertag)?;
                    let (new_available, shortfall) = if *available >= row.amount {
                        (available.checked_sub(row.amount).map_err(overflow)?, None)
                    } else {
                        (
                            Money::ZERO,
                            Some(row.amount.checked_sub(*available).map_err(overflow)?),
                        )
                    };
                    *available = new_available;
                    if shortfall.is_some() {
                        *status = WalletStatus::Suspended;
                    }
                    state.txns.get_mut(reference.as_str()).unwrap().status =
                        TransactionStatus::Reversed;
                    Ok(CreditReversal {
                        disposition: Disposition::Applied,
                        shortfall,
                    })
                }
                other => Err(LedgerError::InvalidTransition {
                    reference: reference.clone(),
                    from: other,
                    to: TransactionStatus::Reversed,
                }),
            }
        })
    }

    async fn transactions(&self, usertag: &str) -> Result<Vec<TransactionRecord>, LedgerError> {
        self.with_state(|state| {
            if !state.wallets.contains_key(usertag) {
                return Err(LedgerError::WalletNotFound(usertag.to_string()));
            }
            Ok(state
                .txns
                .iter()
                .filter(|(_, row)| row.usertag == usertag)
                .map(|(reference, row)| TransactionRecord {
                    reference: TxnReference::from_raw(reference.clone()),
                    amount: row.amount,
                    direction: row.direction,
                    purpose: row.purpose,
                    status: row.status,
                    provider_reference: None,
                    transfer_code: None,
                    memo: None,
                    created_at: Utc::now(),
                })
                .collect())
        })
    }
}
