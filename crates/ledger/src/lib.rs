//! Durable wallet ledger for Kobo.
//!
//! This crate provides:
//! - `SeaORM` entity definitions for wallets, transactions, and payout
//!   accounts
//! - Database migrations
//! - `WalletRepository`, the storage implementation of the
//!   `kobo_core::ledger::LedgerStore` seam, and the payout account
//!   repository

pub mod entities;
pub mod migration;
pub mod repositories;

pub use repositories::{PayoutAccountRepository, WalletRepository};

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

/// Establishes a connection pool to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(database_url);
    options.max_connections(max_connections);
    Database::connect(options).await
}
