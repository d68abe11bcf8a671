//! Wallet repository: the storage implementation of the ledger store.
//!
//! Every mutating operation runs inside one database transaction and
//! takes the wallet row lock (`SELECT ... FOR UPDATE`) for the whole
//! read-check-write sequence, so concurrent operations on the same
//! wallet serialize instead of losing updates. Locks are always taken
//! wallet-first, then transaction row.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DatabaseTransaction,
    DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect, SqlErr, TransactionTrait,
};
use tracing::info;
use uuid::Uuid;

use kobo_core::ledger::{
    CreditReversal, DebitReversal, Direction, Disposition, LedgerError, LedgerStore, Purpose,
    TransactionRecord, TransactionStatus, TxnReference, WalletBalances,
};
use kobo_shared::Money;

use crate::entities::{sea_orm_active_enums, wallet_transactions, wallets};

/// Wallet repository for balance and transaction operations.
#[derive(Debug, Clone)]
pub struct WalletRepository {
    db: DatabaseConnection,
}

impl WalletRepository {
    /// Creates a new wallet repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Debits `payer` and credits `payee` inside the caller's open
    /// database transaction, recording paired service-payment rows.
    ///
    /// This is the entry point for the appointment-booking workflow: the
    /// debit commits and rolls back with the caller's outer transaction.
    /// Wallet rows are locked in deterministic order to avoid deadlocks
    /// between concurrent bookings.
    ///
    /// # Errors
    ///
    /// `InsufficientFunds` if the payer cannot cover the amount;
    /// `WalletSuspended`/`WalletNotFound` for unusable wallets.
    pub async fn begin_service_payment(
        txn: &DatabaseTransaction,
        payer: &str,
        payee: &str,
        amount: Money,
        memo: &str,
    ) -> Result<TxnReference, LedgerError> {
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount(format!(
                "service payment amount must be positive, got {}",
                amount.minor()
            )));
        }
        if payer == payee {
            return Err(LedgerError::Internal(
                "payer and payee wallets must differ".to_string(),
            ));
        }

        let mut tags = [payer, payee];
        tags.sort_unstable();
        let mut locked = Vec::with_capacity(2);
        for tag in tags {
            locked.push(lock_wallet(txn, tag).await?);
        }
        let payer_wallet = locked
            .iter()
            .find(|w| w.usertag == payer)
            .cloned()
            .ok_or_else(|| LedgerError::WalletNotFound(payer.to_string()))?;
        let payee_wallet = locked
            .into_iter()
            .find(|w| w.usertag == payee)
            .ok_or_else(|| LedgerError::WalletNotFound(payee.to_string()))?;

        ensure_active(&payer_wallet)?;
        ensure_active(&payee_wallet)?;

        let payer_available = Money::from_minor(payer_wallet.available_balance);
        if payer_available < amount {
            return Err(LedgerError::InsufficientFunds {
                available: payer_available,
                requested: amount,
            });
        }

        let now = Utc::now();
        let reference = TxnReference::generate(Purpose::ServicePayment, payer, now);
        let payee_reference = TxnReference::generate(Purpose::ServicePayment, payee, now);

        update_balances(
            txn,
            payer_wallet,
            payer_available.checked_sub(amount).map_err(money_err)?,
            None,
        )
        .await?;
        let payee_available = Money::from_minor(payee_wallet.available_balance)
            .checked_add(amount)
            .map_err(money_err)?;
        update_balances(txn, payee_wallet, payee_available, None).await?;

        insert_transaction(
            txn,
            payer,
            amount,
            Direction::Debit,
            Purpose::ServicePayment,
            &reference,
            TransactionStatus::Success,
            Some(memo),
        )
        .await?;
        insert_transaction(
            txn,
            payee,
            amount,
            Direction::Credit,
            Purpose::ServicePayment,
            &payee_reference,
            TransactionStatus::Success,
            Some(memo),
        )
        .await?;

        info!(payer, payee, amount = amount.minor(), "service payment recorded");
        Ok(reference)
    }
}

#[async_trait]
impl LedgerStore for WalletRepository {
    async fn create_wallet(&self, usertag: &str) -> Result<(), LedgerError> {
        let now = Utc::now();
        let wallet = wallets::ActiveModel {
            id: Set(Uuid::new_v4()),
            usertag: Set(usertag.to_string()),
            available_balance: Set(0),
            pending_balance: Set(0),
            status: Set(sea_orm_active_enums::WalletStatus::Active),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };
        match wallet.insert(&self.db).await {
            Ok(_) => Ok(()),
            // signup retries land here; the wallet already exists
            Err(e) if is_unique_violation(&e) => Ok(()),
            Err(e) => Err(db_err(e)),
        }
    }

    async fn balance(&self, usertag: &str) -> Result<WalletBalances, LedgerError> {
        let wallet = wallets::Entity::find()
            .filter(wallets::Column::Usertag.eq(usertag))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or_else(|| LedgerError::WalletNotFound(usertag.to_string()))?;

        Ok(balances_of(&wallet))
    }

    async fn credit_pending(
        &self,
        usertag: &str,
        amount: Money,
        reference: &TxnReference,
    ) -> Result<(), LedgerError> {
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount(format!(
                "top-up amount must be positive, got {}",
                amount.minor()
            )));
        }

        let txn = self.db.begin().await.map_err(db_err)?;
        let wallet = lock_wallet(&txn, usertag).await?;
        ensure_active(&wallet)?;

        insert_transaction(
            &txn,
            usertag,
            amount,
            Direction::Credit,
            Purpose::Topup,
            reference,
            TransactionStatus::Pending,
            None,
        )
        .await?;
        txn.commit().await.map_err(db_err)
    }

    async fn mark_charge_initialized(
        &self,
        reference: &TxnReference,
        access_code: &str,
        provider_reference: &str,
    ) -> Result<(), LedgerError> {
        let row = find_transaction(&self.db, reference).await?;
        let mut active: wallet_transactions::ActiveModel = row.into();
        active.access_code = Set(Some(access_code.to_string()));
        active.provider_reference = Set(Some(provider_reference.to_string()));
        active.updated_at = Set(Utc::now().into());
        active.update(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    async fn reserve_for_debit(
        &self,
        usertag: &str,
        amount: Money,
        reference: &TxnReference,
    ) -> Result<(), LedgerError> {
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount(format!(
                "withdrawal amount must be positive, got {}",
                amount.minor()
            )));
        }

        let txn = self.db.begin().await.map_err(db_err)?;
        let wallet = lock_wallet(&txn, usertag).await?;
        ensure_active(&wallet)?;

        let available = Money::from_minor(wallet.available_balance);
        let pending = Money::from_minor(wallet.pending_balance);
        if available < amount {
            return Err(LedgerError::InsufficientFunds {
                available,
                requested: amount,
            });
        }

        update_balances(
            &txn,
            wallet,
            available.checked_sub(amount).map_err(money_err)?,
            Some(pending.checked_add(amount).map_err(money_err)?),
        )
        .await?;
        insert_transaction(
            &txn,
            usertag,
            amount,
            Direction::Debit,
            Purpose::Withdrawal,
            reference,
            TransactionStatus::Initiated,
            None,
        )
        .await?;
        txn.commit().await.map_err(db_err)
    }

    async fn mark_transfer_started(
        &self,
        reference: &TxnReference,
        transfer_code: &str,
    ) -> Result<(), LedgerError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let (_, row) = lock_wallet_and_transaction(&txn, reference).await?;

        let status: TransactionStatus = row.status.into();
        let next = status.transition(TransactionStatus::Pending, reference)?;

        let mut active: wallet_transactions::ActiveModel = row.into();
        active.transfer_code = Set(Some(transfer_code.to_string()));
        active.status = Set(next.into());
        active.updated_at = Set(Utc::now().into());
        active.update(&txn).await.map_err(db_err)?;
        txn.commit().await.map_err(db_err)
    }

    async fn finalize_credit(&self, reference: &TxnReference) -> Result<Disposition, LedgerError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let (wallet, row) = lock_wallet_and_transaction(&txn, reference).await?;

        let status: TransactionStatus = row.status.into();
        match status {
            TransactionStatus::Success => Ok(Disposition::AlreadyApplied),
            TransactionStatus::Pending => {
                let amount = Money::from_minor(row.amount);
                let available = Money::from_minor(wallet.available_balance)
                    .checked_add(amount)
                    .map_err(money_err)?;
                update_balances(&txn, wallet, available, None).await?;
                set_status(&txn, row, TransactionStatus::Success).await?;
                txn.commit().await.map_err(db_err)?;
                Ok(Disposition::Applied)
            }
            other => Err(LedgerError::InvalidTransition {
                reference: reference.clone(),
                from: other,
                to: TransactionStatus::Success,
            }),
        }
    }

    async fn finalize_debit_success(
        &self,
        reference: &TxnReference,
    ) -> Result<Disposition, LedgerError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let (wallet, row) = lock_wallet_and_transaction(&txn, reference).await?;

        let status: TransactionStatus = row.status.into();
        match status {
            TransactionStatus::Success => Ok(Disposition::AlreadyApplied),
            TransactionStatus::Initiated | TransactionStatus::Pending => {
                let amount = Money::from_minor(row.amount);
                let available = Money::from_minor(wallet.available_balance);
                let pending = Money::from_minor(wallet.pending_balance)
                    .checked_sub(amount)
                    .map_err(money_err)?;
                if pending.is_negative() {
                    return Err(LedgerError::Internal(format!(
                        "pending balance underflow finalizing {reference}"
                    )));
                }
                update_balances(&txn, wallet, available, Some(pending)).await?;
                set_status(&txn, row, TransactionStatus::Success).await?;
                txn.commit().await.map_err(db_err)?;
                Ok(Disposition::Applied)
            }
            other => Err(LedgerError::InvalidTransition {
                reference: reference.clone(),
                from: other,
                to: TransactionStatus::Success,
            }),
        }
    }

    async fn reverse_debit(
        &self,
        reference: &TxnReference,
        outcome: DebitReversal,
    ) -> Result<Disposition, LedgerError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let (wallet, row) = lock_wallet_and_transaction(&txn, reference).await?;

        let status: TransactionStatus = row.status.into();
        let target = outcome.target_status();
        match status {
            current if current == target => Ok(Disposition::AlreadyApplied),
            // a settled or already-unwound transfer takes precedence over
            // late or conflicting reversal notifications
            TransactionStatus::Success | TransactionStatus::Failed
            | TransactionStatus::Reversed => Ok(Disposition::Superseded),
            TransactionStatus::Initiated | TransactionStatus::Pending => {
                let amount = Money::from_minor(row.amount);
                let pending = Money::from_minor(wallet.pending_balance)
                    .checked_sub(amount)
                    .map_err(money_err)?;
                if pending.is_negative() {
                    return Err(LedgerError::Internal(format!(
                        "pending balance underflow reversing {reference}"
                    )));
                }
                let available = Money::from_minor(wallet.available_balance)
                    .checked_add(amount)
                    .map_err(money_err)?;
                update_balances(&txn, wallet, available, Some(pending)).await?;
                set_status(&txn, row, target).await?;
                txn.commit().await.map_err(db_err)?;
                Ok(Disposition::Applied)
            }
            other => Err(LedgerError::InvalidTransition {
                reference: reference.clone(),
                from: other,
                to: target,
            }),
        }
    }

    async fn mark_disputed(&self, reference: &TxnReference) -> Result<Disposition, LedgerError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let (_, row) = lock_wallet_and_transaction(&txn, reference).await?;

        let status: TransactionStatus = row.status.into();
        match status {
            TransactionStatus::Disputed => Ok(Disposition::AlreadyApplied),
            TransactionStatus::Success => {
                set_status(&txn, row, TransactionStatus::Disputed).await?;
                txn.commit().await.map_err(db_err)?;
                Ok(Disposition::Applied)
            }
            other => Err(LedgerError::InvalidTransition {
                reference: reference.clone(),
                from: other,
                to: TransactionStatus::Disputed,
            }),
        }
    }

    async fn confirm_dispute_won(
        &self,
        reference: &TxnReference,
    ) -> Result<Disposition, LedgerError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let (_, row) = lock_wallet_and_transaction(&txn, reference).await?;

        let status: TransactionStatus = row.status.into();
        match status {
            TransactionStatus::Success => Ok(Disposition::AlreadyApplied),
            TransactionStatus::Disputed => {
                set_status(&txn, row, TransactionStatus::Success).await?;
                txn.commit().await.map_err(db_err)?;
                Ok(Disposition::Applied)
            }
            other => Err(LedgerError::InvalidTransition {
                reference: reference.clone(),
                from: other,
                to: TransactionStatus::Success,
            }),
        }
    }

    async fn reverse_credit(
        &self,
        reference: &TxnReference,
    ) -> Result<CreditReversal, LedgerError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let (wallet, row) = lock_wallet_and_transaction(&txn, reference).await?;

        let status: TransactionStatus = row.status.into();
        match status {
            TransactionStatus::Reversed => Ok(CreditReversal {
                disposition: Disposition::AlreadyApplied,
                shortfall: None,
            }),
            TransactionStatus::Success | TransactionStatus::Disputed => {
                let amount = Money::from_minor(row.amount);
                let available = Money::from_minor(wallet.available_balance);
                // the user may have spent the disputed funds already; the
                // balance invariant wins, the anomaly is reported loudly
                let (new_available, shortfall) = if available >= amount {
                    (available.checked_sub(amount).map_err(money_err)?, None)
                } else {
                    (
                        Money::ZERO,
                        Some(amount.checked_sub(available).map_err(money_err)?),
                    )
                };

                let suspend = shortfall.is_some();
                let mut active: wallets::ActiveModel = wallet.into();
                active.available_balance = Set(new_available.minor());
                if suspend {
                    active.status = Set(sea_orm_active_enums::WalletStatus::Suspended);
                }
                active.updated_at = Set(Utc::now().into());
                active.update(&txn).await.map_err(db_err)?;

                set_status(&txn, row, TransactionStatus::Reversed).await?;
                txn.commit().await.map_err(db_err)?;
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
    }

    async fn transactions(&self, usertag: &str) -> Result<Vec<TransactionRecord>, LedgerError> {
        // existence check mirrors balance(): absent wallet is NotFound,
        // an empty history is not
        self.balance(usertag).await?;

        let rows = wallet_transactions::Entity::find()
            .filter(wallet_transactions::Column::Usertag.eq(usertag))
            .order_by_desc(wallet_transactions::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(rows.into_iter().map(record_of).collect())
    }
}

fn db_err(e: DbErr) -> LedgerError {
    LedgerError::Database(e.to_string())
}

fn money_err(e: kobo_shared::types::money::MoneyError) -> LedgerError {
    LedgerError::Internal(e.to_string())
}

fn is_unique_violation(e: &DbErr) -> bool {
    matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

fn balances_of(wallet: &wallets::Model) -> WalletBalances {
    WalletBalances {
        available: Money::from_minor(wallet.available_balance),
        pending: Money::from_minor(wallet.pending_balance),
        status: wallet.status.into(),
    }
}

fn record_of(row: wallet_transactions::Model) -> TransactionRecord {
    TransactionRecord {
        reference: TxnReference::from_raw(row.reference),
        amount: Money::from_minor(row.amount),
        direction: row.direction.into(),
        purpose: row.purpose.into(),
        status: row.status.into(),
        provider_reference: row.provider_reference,
        transfer_code: row.transfer_code,
        memo: row.memo,
        created_at: row.created_at.into(),
    }
}

fn ensure_active(wallet: &wallets::Model) -> Result<(), LedgerError> {
    if wallet.status == sea_orm_active_enums::WalletStatus::Active {
        Ok(())
    } else {
        Err(LedgerError::WalletSuspended(wallet.usertag.clone()))
    }
}

/// Locks a wallet row for the duration of the surrounding transaction.
async fn lock_wallet(
    txn: &DatabaseTransaction,
    usertag: &str,
) -> Result<wallets::Model, LedgerError> {
    wallets::Entity::find()
        .filter(wallets::Column::Usertag.eq(usertag))
        .lock_exclusive()
        .one(txn)
        .await
        .map_err(db_err)?
        .ok_or_else(|| LedgerError::WalletNotFound(usertag.to_string()))
}

/// Locks the owning wallet, then the transaction row, in that order.
async fn lock_wallet_and_transaction(
    txn: &DatabaseTransaction,
    reference: &TxnReference,
) -> Result<(wallets::Model, wallet_transactions::Model), LedgerError> {
    // the unlocked read only discovers the owning wallet; the row is
    // re-read under lock afterwards
    let row = find_transaction(txn, reference).await?;
    let wallet = lock_wallet(txn, &row.usertag).await?;
    let row = wallet_transactions::Entity::find()
        .filter(wallet_transactions::Column::Reference.eq(reference.as_str()))
        .lock_exclusive()
        .one(txn)
        .await
        .map_err(db_err)?
        .ok_or_else(|| LedgerError::TransactionNotFound(reference.clone()))?;
    Ok((wallet, row))
}

async fn find_transaction<C: sea_orm::ConnectionTrait>(
    conn: &C,
    reference: &TxnReference,
) -> Result<wallet_transactions::Model, LedgerError> {
    wallet_transactions::Entity::find()
        .filter(wallet_transactions::Column::Reference.eq(reference.as_str()))
        .one(conn)
        .await
        .map_err(db_err)?
        .ok_or_else(|| LedgerError::TransactionNotFound(reference.clone()))
}

/// Writes new balances for a locked wallet row.
async fn update_balances(
    txn: &DatabaseTransaction,
    wallet: wallets::Model,
    available: Money,
    pending: Option<Money>,
) -> Result<(), LedgerError> {
    if available.is_negative() || pending.is_some_and(Money::is_negative) {
        return Err(LedgerError::Internal(format!(
            "balance invariant violated for wallet {}",
            wallet.usertag
        )));
    }
    let mut active: wallets::ActiveModel = wallet.into();
    active.available_balance = Set(available.minor());
    if let Some(pending) = pending {
        active.pending_balance = Set(pending.minor());
    }
    active.updated_at = Set(Utc::now().into());
    active.update(txn).await.map_err(db_err)?;
    Ok(())
}

async fn set_status(
    txn: &DatabaseTransaction,
    row: wallet_transactions::Model,
    status: TransactionStatus,
) -> Result<(), LedgerError> {
    let mut active: wallet_transactions::ActiveModel = row.into();
    active.status = Set(status.into());
    active.updated_at = Set(Utc::now().into());
    active.update(txn).await.map_err(db_err)?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn insert_transaction(
    txn: &DatabaseTransaction,
    usertag: &str,
    amount: Money,
    direction: Direction,
    purpose: Purpose,
    reference: &TxnReference,
    status: TransactionStatus,
    memo: Option<&str>,
) -> Result<(), LedgerError> {
    let now = Utc::now();
    let row = wallet_transactions::ActiveModel {
        id: Set(Uuid::new_v4()),
        usertag: Set(usertag.to_string()),
        amount: Set(amount.minor()),
        direction: Set(direction.into()),
        purpose: Set(purpose.into()),
        reference: Set(reference.as_str().to_string()),
        provider_reference: Set(None),
        access_code: Set(None),
        transfer_code: Set(None),
        status: Set(status.into()),
        memo: Set(memo.map(ToString::to_string)),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };
    match row.insert(txn).await {
        Ok(_) => Ok(()),
        Err(e) if is_unique_violation(&e) => {
            Err(LedgerError::DuplicateReference(reference.clone()))
        }
        Err(e) => Err(db_err(e)),
    }
}
