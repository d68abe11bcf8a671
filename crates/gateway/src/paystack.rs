//! Paystack API client.
//!
//! Stateless wrapper over the provider's JSON API. Every call is bounded
//! by the configured timeout, authenticates with the bearer secret, and
//! collapses transport failures, non-success HTTP statuses, and
//! `status: false` bodies into the `GatewayError` taxonomy so callers
//! never see raw reqwest errors.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::warn;

use kobo_core::gateway::{Bank, CreatedRecipient, GatewayError, InitializedCharge, PaymentGateway};
use kobo_core::ledger::TxnReference;
use kobo_shared::Money;
use kobo_shared::config::PaystackConfig;

/// Paystack implementation of the payment gateway.
#[derive(Debug, Clone)]
pub struct PaystackClient {
    http: reqwest::Client,
    base_url: String,
    secret_key: String,
    callback_url: String,
}

/// Paystack's uniform response envelope.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: bool,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct InitializeData {
    authorization_url: String,
    access_code: String,
    reference: String,
}

#[derive(Debug, Deserialize)]
struct VerifyData {
    status: String,
}

#[derive(Debug, Deserialize)]
struct ResolveData {
    account_name: String,
}

#[derive(Debug, Deserialize)]
struct RecipientData {
    recipient_code: String,
    details: RecipientDetails,
}

#[derive(Debug, Deserialize)]
struct RecipientDetails {
    bank_name: String,
}

#[derive(Debug, Deserialize)]
struct TransferData {
    transfer_code: String,
}

impl PaystackClient {
    /// Creates a client from provider configuration.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Transport` if the underlying HTTP client
    /// cannot be constructed.
    pub fn new(config: &PaystackConfig) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
            callback_url: config.callback_url.clone(),
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, GatewayError> {
        let response = self
            .http
            .get(format!("{}{path}", self.base_url))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(classify_transport)?;
        Self::unwrap_envelope(response).await
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, GatewayError> {
        let response = self
            .http
            .post(format!("{}{path}", self.base_url))
            .bearer_auth(&self.secret_key)
            .json(body)
            .send()
            .await
            .map_err(classify_transport)?;
        Self::unwrap_envelope(response).await
    }

    async fn unwrap_envelope<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, GatewayError> {
        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "provider returned non-success status");
            return Err(GatewayError::Provider {
                status: status.as_u16(),
            });
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| GatewayError::Malformed(e.to_string()))?;

        if !envelope.status {
            return Err(GatewayError::Declined(envelope.message));
        }
        envelope
            .data
            .ok_or_else(|| GatewayError::Malformed("missing data field".to_string()))
    }
}

fn classify_transport(e: reqwest::Error) -> GatewayError {
    GatewayError::Transport(e.to_string())
}

#[async_trait]
impl PaymentGateway for PaystackClient {
    async fn initialize_charge(
        &self,
        email: &str,
        amount: Money,
        reference: &TxnReference,
    ) -> Result<InitializedCharge, GatewayError> {
        let body = json!({
            "email": email,
            "amount": amount.minor(),
            "reference": reference.as_str(),
            "callback_url": self.callback_url,
            "channels": ["card", "bank_transfer"],
        });
        let data: InitializeData = self.post("/transaction/initialize", &body).await?;
        Ok(InitializedCharge {
            authorization_url: data.authorization_url,
            access_code: data.access_code,
            reference: data.reference,
        })
    }

    async fn verify_charge(&self, reference: &TxnReference) -> Result<bool, GatewayError> {
        let data: VerifyData = self
            .get(&format!("/transaction/verify/{reference}"))
            .await?;
        Ok(data.status == "success")
    }

    async fn resolve_account(
        &self,
        account_number: &str,
        bank_code: &str,
    ) -> Result<String, GatewayError> {
        let data: ResolveData = self
            .get(&format!(
                "/bank/resolve?account_number={account_number}&bank_code={bank_code}"
            ))
            .await?;
        Ok(data.account_name)
    }

    async fn create_recipient(
        &self,
        name: &str,
        account_number: &str,
        bank_code: &str,
    ) -> Result<CreatedRecipient, GatewayError> {
        let body = json!({
            "type": "nuban",
            "name": name,
            "account_number": account_number,
            "bank_code": bank_code,
            "currency": "NGN",
        });
        let data: RecipientData = self.post("/transferrecipient", &body).await?;
        Ok(CreatedRecipient {
            recipient_code: data.recipient_code,
            bank_name: data.details.bank_name,
        })
    }

    async fn initiate_transfer(
        &self,
        recipient_code: &str,
        amount: Money,
        reference: &TxnReference,
    ) -> Result<String, GatewayError> {
        let body = json!({
            "source": "balance",
            "amount": amount.minor(),
            "reference": reference.as_str(),
            "recipient": recipient_code,
            "reason": "Wallet withdrawal",
        });
        let data: TransferData = self.post("/transfer", &body).await?;
        Ok(data.transfer_code)
    }

    async fn list_banks(&self) -> Result<Vec<Bank>, GatewayError> {
        self.get("/bank?country=nigeria").await
    }
}
