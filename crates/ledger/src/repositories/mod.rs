//! Repository abstractions for data access.

pub mod payout_account;
pub mod wallet;

pub use payout_account::PayoutAccountRepository;
pub use wallet::WalletRepository;
