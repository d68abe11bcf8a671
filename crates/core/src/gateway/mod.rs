//! Payment gateway seam and call types.
//!
//! The gateway is a thin, stateless wrapper around the provider's HTTP
//! API. This module defines the interface and its error taxonomy; the
//! reqwest implementation lives in `kobo-gateway`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use kobo_shared::Money;

use crate::ledger::TxnReference;

/// A bank supported by the provider for payouts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bank {
    /// Display name.
    pub name: String,
    /// Provider bank code used for account resolution and recipients.
    pub code: String,
}

/// Result of initializing a checkout charge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitializedCharge {
    /// Checkout URL the user is redirected to.
    pub authorization_url: String,
    /// Provider access code for the charge session.
    pub access_code: String,
    /// Provider's echo of the transaction reference.
    pub reference: String,
}

/// Result of registering a payout recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedRecipient {
    /// Provider recipient code used to initiate transfers.
    pub recipient_code: String,
    /// Resolved bank display name.
    pub bank_name: String,
}

/// Errors from provider calls.
///
/// The crucial split is `Transport` ("the call did not complete") versus
/// `Declined` ("the call completed and was rejected"): only the former
/// may be retried without risking a double submission.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The request never completed: connect/timeout/body errors.
    #[error("provider unreachable: {0}")]
    Transport(String),

    /// The provider answered with a non-success HTTP status.
    #[error("provider returned HTTP {status}")]
    Provider {
        /// HTTP status code received.
        status: u16,
    },

    /// The provider processed the call and declined it (`status: false`).
    #[error("provider declined: {0}")]
    Declined(String),

    /// The response body did not match the provider contract.
    #[error("malformed provider response: {0}")]
    Malformed(String),
}

impl GatewayError {
    /// Returns true if the call may be retried safely.
    ///
    /// Server-side 5xx responses are treated like transport failures;
    /// everything else means the provider made a decision.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Provider { status } => *status >= 500,
            Self::Declined(_) | Self::Malformed(_) => false,
        }
    }
}

/// Outbound calls to the payment provider.
///
/// Each call is bounded by the configured timeout and maps any
/// non-success HTTP status or `status: false` body to a `GatewayError`;
/// raw transport errors never reach callers.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Initializes a checkout charge for a top-up.
    async fn initialize_charge(
        &self,
        email: &str,
        amount: Money,
        reference: &TxnReference,
    ) -> Result<InitializedCharge, GatewayError>;

    /// Verifies whether a charge settled successfully.
    async fn verify_charge(&self, reference: &TxnReference) -> Result<bool, GatewayError>;

    /// Resolves a bank account number to its registered holder name.
    async fn resolve_account(
        &self,
        account_number: &str,
        bank_code: &str,
    ) -> Result<String, GatewayError>;

    /// Registers a payout recipient for later transfers.
    async fn create_recipient(
        &self,
        name: &str,
        account_number: &str,
        bank_code: &str,
    ) -> Result<CreatedRecipient, GatewayError>;

    /// Starts a payout transfer; returns the provider transfer code.
    async fn initiate_transfer(
        &self,
        recipient_code: &str,
        amount: Money,
        reference: &TxnReference,
    ) -> Result<String, GatewayError>;

    /// Lists banks available for payouts.
    async fn list_banks(&self) -> Result<Vec<Bank>, GatewayError>;
}
