//! `SeaORM` entity definitions.

pub mod payout_accounts;
pub mod sea_orm_active_enums;
pub mod wallet_transactions;
pub mod wallets;
