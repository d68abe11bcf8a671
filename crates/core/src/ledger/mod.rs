//! Wallet ledger domain: balances, transactions, and the store seam.

pub mod error;
pub mod memory;
pub mod state;
pub mod store;
pub mod types;

pub use error::LedgerError;
pub use memory::MemoryLedger;
pub use state::TransactionStatus;
pub use store::LedgerStore;
pub use types::{
    CreditReversal, DebitReversal, Direction, Disposition, Purpose, TransactionRecord,
    TxnReference, WalletBalances, WalletStatus,
};
