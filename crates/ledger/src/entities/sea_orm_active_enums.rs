//! Database enum types and their conversions to domain enums.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use kobo_core::ledger;

/// Wallet lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "wallet_status")]
#[serde(rename_all = "lowercase")]
pub enum WalletStatus {
    /// Wallet can move money.
    #[sea_orm(string_value = "active")]
    Active,
    /// Wallet is frozen pending manual review.
    #[sea_orm(string_value = "suspended")]
    Suspended,
}

/// Direction of money movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "transaction_direction")]
#[serde(rename_all = "lowercase")]
pub enum TransactionDirection {
    /// Funds entering the wallet.
    #[sea_orm(string_value = "credit")]
    Credit,
    /// Funds leaving the wallet.
    #[sea_orm(string_value = "debit")]
    Debit,
}

/// Business purpose of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "transaction_purpose")]
#[serde(rename_all = "snake_case")]
pub enum TransactionPurpose {
    /// Wallet funding through provider checkout.
    #[sea_orm(string_value = "topup")]
    Topup,
    /// Payout to a registered bank account.
    #[sea_orm(string_value = "withdrawal")]
    Withdrawal,
    /// Internal debit paying for an appointment.
    #[sea_orm(string_value = "service_payment")]
    ServicePayment,
}

/// Transaction state-machine status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "transaction_status")]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Funds reserved, transfer not yet started.
    #[sea_orm(string_value = "initiated")]
    Initiated,
    /// Awaiting a provider outcome.
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Settled in the wallet's favor.
    #[sea_orm(string_value = "success")]
    Success,
    /// The provider call failed.
    #[sea_orm(string_value = "failed")]
    Failed,
    /// Unwound after settlement or failure.
    #[sea_orm(string_value = "reversed")]
    Reversed,
    /// Under provider dispute.
    #[sea_orm(string_value = "disputed")]
    Disputed,
}

impl From<WalletStatus> for ledger::WalletStatus {
    fn from(s: WalletStatus) -> Self {
        match s {
            WalletStatus::Active => Self::Active,
            WalletStatus::Suspended => Self::Suspended,
        }
    }
}

impl From<ledger::WalletStatus> for WalletStatus {
    fn from(s: ledger::WalletStatus) -> Self {
        match s {
            ledger::WalletStatus::Active => Self::Active,
            ledger::WalletStatus::Suspended => Self::Suspended,
        }
    }
}

impl From<TransactionDirection> for ledger::Direction {
    fn from(d: TransactionDirection) -> Self {
        match d {
            TransactionDirection::Credit => Self::Credit,
            TransactionDirection::Debit => Self::Debit,
        }
    }
}

impl From<ledger::Direction> for TransactionDirection {
    fn from(d: ledger::Direction) -> Self {
        match d {
            ledger::Direction::Credit => Self::Credit,
            ledger::Direction::Debit => Self::Debit,
        }
    }
}

impl From<TransactionPurpose> for ledger::Purpose {
    fn from(p: TransactionPurpose) -> Self {
        match p {
            TransactionPurpose::Topup => Self::Topup,
            TransactionPurpose::Withdrawal => Self::Withdrawal,
            TransactionPurpose::ServicePayment => Self::ServicePayment,
        }
    }
}

impl From<ledger::Purpose> for TransactionPurpose {
    fn from(p: ledger::Purpose) -> Self {
        match p {
            ledger::Purpose::Topup => Self::Topup,
            ledger::Purpose::Withdrawal => Self::Withdrawal,
            ledger::Purpose::ServicePayment => Self::ServicePayment,
        }
    }
}

impl From<TransactionStatus> for ledger::TransactionStatus {
    fn from(s: TransactionStatus) -> Self {
        match s {
            TransactionStatus::Initiated => Self::Initiated,
            TransactionStatus::Pending => Self::Pending,
            TransactionStatus::Success => Self::Success,
            TransactionStatus::Failed => Self::Failed,
            TransactionStatus::Reversed => Self::Reversed,
            TransactionStatus::Disputed => Self::Disputed,
        }
    }
}

impl From<ledger::TransactionStatus> for TransactionStatus {
    fn from(s: ledger::TransactionStatus) -> Self {
        match s {
            ledger::TransactionStatus::Initiated => Self::Initiated,
            ledger::TransactionStatus::Pending => Self::Pending,
            ledger::TransactionStatus::Success => Self::Success,
            ledger::TransactionStatus::Failed => Self::Failed,
            ledger::TransactionStatus::Reversed => Self::Reversed,
            ledger::TransactionStatus::Disputed => Self::Disputed,
        }
    }
}
