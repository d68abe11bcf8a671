//! Reconciliation dispatcher.
//!
//! Single entry point for provider outcomes. Validates authenticity,
//! parses the event, and applies the corresponding ledger mutation
//! exactly once; replays become no-ops through the state machine's
//! idempotency rules.

use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::ledger::{
    DebitReversal, Disposition, LedgerError, LedgerStore, TxnReference,
};

use super::event::{DisputeResolution, ProviderEvent};
use super::signature::verify_signature;

/// Errors from processing a provider event.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Header signature did not match the raw payload.
    #[error("webhook signature mismatch")]
    InvalidSignature,

    /// Body was not a valid event for this provider's contract.
    #[error("malformed event: {0}")]
    MalformedEvent(String),

    /// The ledger rejected the mutation.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl ReconcileError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::InvalidSignature | Self::MalformedEvent(_) => 400,
            Self::Ledger(e) => e.http_status_code(),
        }
    }
}

/// How an event was disposed of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The ledger was mutated.
    Applied,
    /// Replay of an already-applied outcome; no mutation.
    AlreadyApplied,
    /// A terminal state took precedence; no mutation.
    Superseded,
    /// Informational or unknown event; acknowledged without mutation.
    Acknowledged,
}

impl From<Disposition> for Outcome {
    fn from(d: Disposition) -> Self {
        match d {
            Disposition::Applied => Self::Applied,
            Disposition::AlreadyApplied => Self::AlreadyApplied,
            Disposition::Superseded => Self::Superseded,
        }
    }
}

/// Applies provider outcomes to the ledger.
///
/// Receives its dependencies at construction; the shared secret is only
/// ever used against raw payload bytes.
pub struct ReconciliationDispatcher {
    ledger: Arc<dyn LedgerStore>,
    secret: String,
}

impl ReconciliationDispatcher {
    /// Creates a dispatcher over a ledger store.
    #[must_use]
    pub fn new(ledger: Arc<dyn LedgerStore>, secret: impl Into<String>) -> Self {
        Self {
            ledger,
            secret: secret.into(),
        }
    }

    /// Processes a raw webhook delivery: signature gate, parse, dispatch.
    ///
    /// Callers must acknowledge the delivery only after this returns Ok,
    /// so the provider's at-least-once retry semantics stay correct.
    ///
    /// # Errors
    ///
    /// `InvalidSignature` before any state is touched; `MalformedEvent`
    /// for known events with contract-violating payloads; `Ledger` when
    /// the mutation is rejected.
    pub async fn process(&self, body: &[u8], signature: &str) -> Result<Outcome, ReconcileError> {
        if !verify_signature(&self.secret, body, signature) {
            warn!("rejected webhook with bad signature");
            return Err(ReconcileError::InvalidSignature);
        }

        let event = ProviderEvent::parse(body).map_err(ReconcileError::MalformedEvent)?;
        self.handle_event(event).await
    }

    /// Dispatches a parsed event to the matching ledger operation.
    ///
    /// # Errors
    ///
    /// Returns `Ledger` errors from the underlying store.
    pub async fn handle_event(&self, event: ProviderEvent) -> Result<Outcome, ReconcileError> {
        match event {
            ProviderEvent::ChargeSuccess { reference } => {
                let outcome = self.ledger.finalize_credit(&reference).await?.into();
                log_outcome(&reference, "charge.success", outcome);
                Ok(outcome)
            }
            ProviderEvent::DisputeCreated { reference } => {
                let outcome = self.ledger.mark_disputed(&reference).await?.into();
                log_outcome(&reference, "charge.dispute.create", outcome);
                Ok(outcome)
            }
            ProviderEvent::DisputeReminder { dispute_id } => {
                info!(dispute_id, "dispute evidence reminder");
                Ok(Outcome::Acknowledged)
            }
            ProviderEvent::DisputeResolved {
                reference,
                resolution,
            } => match resolution {
                DisputeResolution::Won => {
                    let outcome = self.ledger.confirm_dispute_won(&reference).await?.into();
                    log_outcome(&reference, "charge.dispute.resolve(won)", outcome);
                    Ok(outcome)
                }
                DisputeResolution::Lost => {
                    let reversal = self.ledger.reverse_credit(&reference).await?;
                    if let Some(shortfall) = reversal.shortfall {
                        error!(
                            reference = %reference,
                            shortfall = shortfall.minor(),
                            "lost dispute exceeded available balance; wallet suspended"
                        );
                    }
                    let outcome = reversal.disposition.into();
                    log_outcome(&reference, "charge.dispute.resolve(lost)", outcome);
                    Ok(outcome)
                }
            },
            ProviderEvent::TransferSuccess { reference } => {
                let outcome = self
                    .ledger
                    .finalize_debit_success(&reference)
                    .await?
                    .into();
                log_outcome(&reference, "transfer.success", outcome);
                Ok(outcome)
            }
            ProviderEvent::TransferFailed { reference } => {
                let outcome = self
                    .ledger
                    .reverse_debit(&reference, DebitReversal::Failed)
                    .await?
                    .into();
                log_outcome(&reference, "transfer.failed", outcome);
                Ok(outcome)
            }
            ProviderEvent::TransferReversed { reference } => {
                let outcome = self
                    .ledger
                    .reverse_debit(&reference, DebitReversal::Reversed)
                    .await?
                    .into();
                log_outcome(&reference, "transfer.reversed", outcome);
                Ok(outcome)
            }
            ProviderEvent::Unknown { event } => {
                info!(event, "unhandled provider event acknowledged");
                Ok(Outcome::Acknowledged)
            }
        }
    }

}

fn log_outcome(reference: &TxnReference, event: &str, outcome: Outcome) {
    match outcome {
        Outcome::Applied => info!(reference = %reference, event, "reconciled"),
        Outcome::AlreadyApplied => {
            info!(reference = %reference, event, "replay ignored");
        }
        Outcome::Superseded => {
            warn!(reference = %reference, event, "terminal state took precedence");
        }
        Outcome::Acknowledged => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{MemoryLedger, TransactionStatus, WalletStatus};
    use crate::reconcile::signature::sign;
    use kobo_shared::Money;

    const SECRET: &str = "sk_test_123";
    const USER: &str = "ada_01";

    fn dispatcher(ledger: Arc<MemoryLedger>) -> ReconciliationDispatcher {
        ReconciliationDispatcher::new(ledger, SECRET)
    }

    fn charge_success_body(reference: &str) -> Vec<u8> {
        format!(r#"{{"event":"charge.success","data":{{"reference":"{reference}"}}}}"#).into_bytes()
    }

    async fn pending_topup(ledger: &MemoryLedger, reference: &str, minor: i64) -> TxnReference {
        let reference = TxnReference::from_raw(reference);
        ledger
            .credit_pending(USER, Money::from_minor(minor), &reference)
            .await
            .unwrap();
        reference
    }

    #[tokio::test]
    async fn test_charge_success_credits_exactly_once() {
        let ledger = Arc::new(MemoryLedger::with_wallet(USER, 0));
        let d = dispatcher(Arc::clone(&ledger));
        pending_topup(&ledger, "t1", 40_000).await;

        let body = charge_success_body("t1");
        let sig = sign(SECRET, &body);

        assert_eq!(d.process(&body, &sig).await.unwrap(), Outcome::Applied);
        assert_eq!(ledger.snapshot(USER), (40_000, 0));

        // at-least-once delivery: replay must not credit again
        assert_eq!(
            d.process(&body, &sig).await.unwrap(),
            Outcome::AlreadyApplied
        );
        assert_eq!(ledger.snapshot(USER), (40_000, 0));
    }

    #[tokio::test]
    async fn test_bad_signature_touches_nothing() {
        let ledger = Arc::new(MemoryLedger::with_wallet(USER, 0));
        let d = dispatcher(Arc::clone(&ledger));
        pending_topup(&ledger, "t1", 40_000).await;

        let before = ledger.snapshot(USER);
        let body = charge_success_body("t1");
        let err = d.process(&body, "00ff").await.unwrap_err();
        assert!(matches!(err, ReconcileError::InvalidSignature));
        assert_eq!(err.http_status_code(), 400);
        assert_eq!(ledger.snapshot(USER), before);
        assert_eq!(
            ledger.status_of("t1"),
            TransactionStatus::Pending,
            "signature failure must not advance the transaction"
        );
    }

    #[tokio::test]
    async fn test_withdrawal_scenario_with_late_reversal() {
        // wallet starts with available=1000.00, pending=0
        let ledger = Arc::new(MemoryLedger::with_wallet(USER, 100_000));
        let d = dispatcher(Arc::clone(&ledger));
        let reference = TxnReference::from_raw("w1");

        // withdraw 400.00 -> available=600.00, pending=400.00, initiated
        ledger
            .reserve_for_debit(USER, Money::from_minor(40_000), &reference)
            .await
            .unwrap();
        assert_eq!(ledger.snapshot(USER), (60_000, 40_000));

        // transfer.success -> pending=0, success
        let outcome = d
            .handle_event(ProviderEvent::TransferSuccess {
                reference: reference.clone(),
            })
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Applied);
        assert_eq!(ledger.snapshot(USER), (60_000, 0));
        assert_eq!(ledger.status_of("w1"), TransactionStatus::Success);

        // late transfer.reversed -> guarded no-op, balances unchanged
        let outcome = d
            .handle_event(ProviderEvent::TransferReversed {
                reference: reference.clone(),
            })
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Superseded);
        assert_eq!(ledger.snapshot(USER), (60_000, 0));
        assert_eq!(ledger.status_of("w1"), TransactionStatus::Success);
    }

    #[tokio::test]
    async fn test_transfer_failed_returns_reserved_funds() {
        let ledger = Arc::new(MemoryLedger::with_wallet(USER, 100_000));
        let d = dispatcher(Arc::clone(&ledger));
        let reference = TxnReference::from_raw("w1");
        ledger
            .reserve_for_debit(USER, Money::from_minor(40_000), &reference)
            .await
            .unwrap();

        let outcome = d
            .handle_event(ProviderEvent::TransferFailed {
                reference: reference.clone(),
            })
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Applied);
        assert_eq!(ledger.snapshot(USER), (100_000, 0));
        assert_eq!(ledger.status_of("w1"), TransactionStatus::Failed);

        // duplicate delivery is the plain idempotent no-op
        let outcome = d
            .handle_event(ProviderEvent::TransferFailed { reference })
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::AlreadyApplied);
        assert_eq!(ledger.snapshot(USER), (100_000, 0));
    }

    #[tokio::test]
    async fn test_dispute_lifecycle_lost() {
        let ledger = Arc::new(MemoryLedger::with_wallet(USER, 0));
        let d = dispatcher(Arc::clone(&ledger));
        let reference = pending_topup(&ledger, "t1", 40_000).await;
        ledger.finalize_credit(&reference).await.unwrap();
        assert_eq!(ledger.snapshot(USER), (40_000, 0));

        let outcome = d
            .handle_event(ProviderEvent::DisputeCreated {
                reference: reference.clone(),
            })
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Applied);
        assert_eq!(ledger.status_of("t1"), TransactionStatus::Disputed);

        let outcome = d
            .handle_event(ProviderEvent::DisputeResolved {
                reference: reference.clone(),
                resolution: DisputeResolution::Lost,
            })
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Applied);
        assert_eq!(ledger.snapshot(USER), (0, 0));
        assert_eq!(ledger.status_of("t1"), TransactionStatus::Reversed);
    }

    #[tokio::test]
    async fn test_dispute_won_confirms_success() {
        let ledger = Arc::new(MemoryLedger::with_wallet(USER, 0));
        let d = dispatcher(Arc::clone(&ledger));
        let reference = pending_topup(&ledger, "t1", 40_000).await;
        ledger.finalize_credit(&reference).await.unwrap();
        ledger.mark_disputed(&reference).await.unwrap();

        let outcome = d
            .handle_event(ProviderEvent::DisputeResolved {
                reference: reference.clone(),
                resolution: DisputeResolution::Won,
            })
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Applied);
        assert_eq!(ledger.snapshot(USER), (40_000, 0));
        assert_eq!(ledger.status_of("t1"), TransactionStatus::Success);
    }

    #[tokio::test]
    async fn test_lost_dispute_shortfall_suspends_wallet() {
        let ledger = Arc::new(MemoryLedger::with_wallet(USER, 0));
        let d = dispatcher(Arc::clone(&ledger));
        let reference = pending_topup(&ledger, "t1", 40_000).await;
        ledger.finalize_credit(&reference).await.unwrap();

        // user spends the credited funds before the dispute lands
        let spend = TxnReference::from_raw("w1");
        ledger
            .reserve_for_debit(USER, Money::from_minor(30_000), &spend)
            .await
            .unwrap();
        ledger.finalize_debit_success(&spend).await.unwrap();
        assert_eq!(ledger.snapshot(USER), (10_000, 0));

        ledger.mark_disputed(&reference).await.unwrap();
        let outcome = d
            .handle_event(ProviderEvent::DisputeResolved {
                reference,
                resolution: DisputeResolution::Lost,
            })
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Applied);
        // clamped to zero, never negative
        assert_eq!(ledger.snapshot(USER), (0, 0));
        let balances = ledger.balance(USER).await.unwrap();
        assert_eq!(balances.status, WalletStatus::Suspended);
    }

    #[tokio::test]
    async fn test_unknown_event_acknowledged_without_mutation() {
        let ledger = Arc::new(MemoryLedger::with_wallet(USER, 50_000));
        let d = dispatcher(Arc::clone(&ledger));

        let body = br#"{"event":"invoice.create","data":{"anything":true}}"#;
        let sig = sign(SECRET, body);
        let outcome = d.process(body, &sig).await.unwrap();
        assert_eq!(outcome, Outcome::Acknowledged);
        assert_eq!(ledger.snapshot(USER), (50_000, 0));
    }

    #[tokio::test]
    async fn test_dispute_reminder_is_informational() {
        let ledger = Arc::new(MemoryLedger::with_wallet(USER, 50_000));
        let d = dispatcher(Arc::clone(&ledger));

        let body = br#"{"event":"charge.dispute.remind","data":{"id":9912}}"#;
        let sig = sign(SECRET, body);
        let outcome = d.process(body, &sig).await.unwrap();
        assert_eq!(outcome, Outcome::Acknowledged);
        assert_eq!(ledger.snapshot(USER), (50_000, 0));
    }

    #[tokio::test]
    async fn test_malformed_known_event_rejected() {
        let ledger = Arc::new(MemoryLedger::with_wallet(USER, 0));
        let d = dispatcher(Arc::clone(&ledger));

        let body = br#"{"event":"transfer.success","data":{"reference":7}}"#;
        let sig = sign(SECRET, body);
        let err = d.process(body, &sig).await.unwrap_err();
        assert!(matches!(err, ReconcileError::MalformedEvent(_)));
        assert_eq!(err.http_status_code(), 400);
    }

    #[tokio::test]
    async fn test_verify_and_webhook_race_first_writer_wins() {
        // both the callback verify path and the webhook call
        // finalize_credit; the second application observes a no-op
        let ledger = Arc::new(MemoryLedger::with_wallet(USER, 0));
        let d = dispatcher(Arc::clone(&ledger));
        let reference = pending_topup(&ledger, "t1", 25_000).await;

        // verify path wins the race
        assert_eq!(
            ledger.finalize_credit(&reference).await.unwrap(),
            Disposition::Applied
        );
        // webhook arrives second
        let outcome = d
            .handle_event(ProviderEvent::ChargeSuccess { reference })
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::AlreadyApplied);
        assert_eq!(ledger.snapshot(USER), (25_000, 0));
    }
}
