//! Bounded retry around outbound transfers.
//!
//! Retries only failures where the call did not complete
//! (`GatewayError::is_retryable`); a definitive business rejection is
//! returned immediately, since resubmitting a completed-and-declined
//! transfer would double-submit it.

use std::time::Duration;

use tracing::warn;

use kobo_core::gateway::{GatewayError, PaymentGateway};
use kobo_core::ledger::TxnReference;
use kobo_shared::Money;

/// Wraps transfer initiation with bounded backoff.
#[derive(Debug, Clone)]
pub struct RetryCoordinator {
    max_attempts: u32,
    base_delay: Duration,
}

impl Default for RetryCoordinator {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
        }
    }
}

impl RetryCoordinator {
    /// Creates a coordinator with explicit bounds.
    #[must_use]
    pub const fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Initiates a transfer, retrying transient failures with
    /// `attempt x base_delay` backoff. Returns the provider transfer code.
    ///
    /// # Errors
    ///
    /// Returns the last `GatewayError` once attempts are exhausted, or
    /// immediately for non-retryable failures.
    pub async fn initiate_transfer<G>(
        &self,
        gateway: &G,
        recipient_code: &str,
        amount: Money,
        reference: &TxnReference,
    ) -> Result<String, GatewayError>
    where
        G: PaymentGateway + ?Sized,
    {
        let mut attempt = 1;
        loop {
            match gateway
                .initiate_transfer(recipient_code, amount, reference)
                .await
            {
                Ok(transfer_code) => return Ok(transfer_code),
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    warn!(
                        reference = %reference,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "transfer attempt failed, backing off"
                    );
                    tokio::time::sleep(self.base_delay * attempt).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
