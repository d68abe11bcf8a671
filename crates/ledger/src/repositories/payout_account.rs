//! Payout account repository.
//!
//! Registered bank destinations for withdrawals. Accounts are
//! soft-deactivated, never deleted, so references from settled
//! withdrawals stay resolvable.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, SqlErr, TransactionTrait,
};
use uuid::Uuid;

use crate::entities::payout_accounts;

/// At most this many active payout accounts per user.
const MAX_ACTIVE_ACCOUNTS: u64 = 3;

/// Error types for payout account operations.
#[derive(Debug, thiserror::Error)]
pub enum PayoutAccountError {
    /// The user already has the maximum number of active accounts.
    #[error("maximum of {MAX_ACTIVE_ACCOUNTS} payout accounts allowed")]
    LimitReached,

    /// The destination is already registered and active.
    #[error("payout account already registered")]
    AlreadyRegistered,

    /// No active account matched.
    #[error("payout account not found")]
    NotFound,

    /// Database error.
    #[error("database error: {0}")]
    Database(String),
}

impl PayoutAccountError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::LimitReached => "PAYOUT_ACCOUNT_LIMIT",
            Self::AlreadyRegistered => "PAYOUT_ACCOUNT_EXISTS",
            Self::NotFound => "PAYOUT_ACCOUNT_NOT_FOUND",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::LimitReached => 422,
            Self::AlreadyRegistered => 409,
            Self::NotFound => 404,
            Self::Database(_) => 500,
        }
    }
}

/// Input for registering a payout account.
#[derive(Debug, Clone)]
pub struct CreatePayoutAccountInput {
    /// Owning user.
    pub usertag: String,
    /// Holder name resolved by the provider.
    pub account_name: String,
    /// Bank account number.
    pub account_number: String,
    /// Provider bank code.
    pub bank_code: String,
    /// Bank display name.
    pub bank_name: String,
    /// Provider recipient code.
    pub recipient_code: String,
}

/// Payout account repository.
#[derive(Debug, Clone)]
pub struct PayoutAccountRepository {
    db: DatabaseConnection,
}

impl PayoutAccountRepository {
    /// Creates a new payout account repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Registers a payout account, enforcing the per-user active limit.
    ///
    /// # Errors
    ///
    /// `LimitReached` past the active-account cap, `AlreadyRegistered`
    /// for a duplicate active destination.
    pub async fn create(
        &self,
        input: CreatePayoutAccountInput,
    ) -> Result<payout_accounts::Model, PayoutAccountError> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let active = payout_accounts::Entity::find()
            .filter(payout_accounts::Column::Usertag.eq(&input.usertag))
            .filter(payout_accounts::Column::IsActive.eq(true))
            .count(&txn)
            .await
            .map_err(db_err)?;
        if active >= MAX_ACTIVE_ACCOUNTS {
            return Err(PayoutAccountError::LimitReached);
        }

        let account = payout_accounts::ActiveModel {
            id: Set(Uuid::new_v4()),
            usertag: Set(input.usertag),
            account_name: Set(input.account_name),
            account_number: Set(input.account_number),
            bank_code: Set(input.bank_code),
            bank_name: Set(input.bank_name),
            recipient_code: Set(input.recipient_code),
            is_active: Set(true),
            created_at: Set(Utc::now().into()),
        };
        let model = match account.insert(&txn).await {
            Ok(model) => model,
            Err(e) if is_unique_violation(&e) => {
                return Err(PayoutAccountError::AlreadyRegistered);
            }
            Err(e) => return Err(db_err(e)),
        };
        txn.commit().await.map_err(db_err)?;
        Ok(model)
    }

    /// Lists a user's active payout accounts, oldest first.
    pub async fn list_active(
        &self,
        usertag: &str,
    ) -> Result<Vec<payout_accounts::Model>, PayoutAccountError> {
        payout_accounts::Entity::find()
            .filter(payout_accounts::Column::Usertag.eq(usertag))
            .filter(payout_accounts::Column::IsActive.eq(true))
            .order_by_asc(payout_accounts::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)
    }

    /// Finds a user's active account by its provider recipient code.
    ///
    /// Withdrawals verify ownership through this lookup before any funds
    /// are reserved.
    pub async fn find_by_recipient_code(
        &self,
        usertag: &str,
        recipient_code: &str,
    ) -> Result<payout_accounts::Model, PayoutAccountError> {
        payout_accounts::Entity::find()
            .filter(payout_accounts::Column::Usertag.eq(usertag))
            .filter(payout_accounts::Column::RecipientCode.eq(recipient_code))
            .filter(payout_accounts::Column::IsActive.eq(true))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or(PayoutAccountError::NotFound)
    }

    /// Soft-deactivates an account.
    pub async fn deactivate(&self, usertag: &str, id: Uuid) -> Result<(), PayoutAccountError> {
        let account = payout_accounts::Entity::find_by_id(id)
            .filter(payout_accounts::Column::Usertag.eq(usertag))
            .filter(payout_accounts::Column::IsActive.eq(true))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or(PayoutAccountError::NotFound)?;

        let mut active: payout_accounts::ActiveModel = account.into();
        active.is_active = Set(false);
        active.update(&self.db).await.map_err(db_err)?;
        Ok(())
    }
}

fn db_err(e: DbErr) -> PayoutAccountError {
    PayoutAccountError::Database(e.to_string())
}

fn is_unique_violation(e: &DbErr) -> bool {
    matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}
