//! Reconciliation of local ledger state against provider outcomes.
//!
//! Provider notifications (webhooks) and synchronous verification results
//! both funnel through the dispatcher here, which is the only component
//! permitted to move transactions to terminal states in response to
//! provider events.

pub mod dispatcher;
pub mod event;
pub mod signature;

pub use dispatcher::{Outcome, ReconcileError, ReconciliationDispatcher};
pub use event::{DisputeResolution, ProviderEvent};
