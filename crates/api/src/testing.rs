//! Shared test doubles and router harness for route tests.

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use tower::ServiceExt;

use kobo_core::gateway::{
    Bank, CreatedRecipient, GatewayError, InitializedCharge, PaymentGateway,
};
use kobo_core::ledger::{LedgerStore, MemoryLedger, TxnReference};
use kobo_core::reconcile::ReconciliationDispatcher;
use kobo_gateway::RetryCoordinator;
use kobo_ledger::PayoutAccountRepository;
use kobo_shared::{JwtService, Money};

use crate::{AppState, create_router};

/// Deterministic gateway double.
///
/// Success paths return canned provider data; `fail_transfers` makes
/// transfer initiation fail with a transport error.
#[derive(Debug, Default)]
pub struct StubGateway {
    /// When true, `initiate_transfer` fails with a transport error.
    pub fail_transfers: bool,
    /// Charge verification result.
    pub verify_result: bool,
}

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn initialize_charge(
        &self,
        _email: &str,
        _amount: Money,
        reference: &TxnReference,
    ) -> Result<InitializedCharge, GatewayError> {
        Ok(InitializedCharge {
            authorization_url: "https://checkout.example/abc123".to_string(),
            access_code: "abc123".to_string(),
            reference: reference.as_str().to_string(),
        })
    }

    async fn verify_charge(&self, _reference: &TxnReference) -> Result<bool, GatewayError> {
        Ok(self.verify_result)
    }

    async fn resolve_account(
        &self,
        _account_number: &str,
        _bank_code: &str,
    ) -> Result<String, GatewayError> {
        Ok("ADA OKAFOR".to_string())
    }

    async fn create_recipient(
        &self,
        name: &str,
        _account_number: &str,
        _bank_code: &str,
    ) -> Result<CreatedRecipient, GatewayError> {
        Ok(CreatedRecipient {
            recipient_code: format!("RCP_{name}"),
            bank_name: "Guaranty Trust Bank".to_string(),
        })
    }

    async fn initiate_transfer(
        &self,
        _recipient_code: &str,
        _amount: Money,
        _reference: &TxnReference,
    ) -> Result<String, GatewayError> {
        if self.fail_transfers {
            Err(GatewayError::Transport("connection refused".to_string()))
        } else {
            Ok("TRF_1".to_string())
        }
    }

    async fn list_banks(&self) -> Result<Vec<Bank>, GatewayError> {
        Ok(vec![Bank {
            name: "Guaranty Trust Bank".to_string(),
            code: "058".to_string(),
        }])
    }
}

/// A parsed response: status plus JSON body.
pub struct TestResponse {
    /// HTTP status.
    pub status: StatusCode,
    /// Parsed JSON body (null when empty).
    pub json: serde_json::Value,
}

/// Router harness over in-memory doubles.
pub struct TestContext {
    /// The in-memory ledger behind the router.
    pub ledger: Arc<MemoryLedger>,
    /// JWT service sharing the router's secret.
    pub jwt: JwtService,
    router: Router,
}

impl TestContext {
    /// Builds a router over fresh doubles, with one active wallet for
    /// `ada_01`.
    pub fn new(webhook_secret: &str) -> Self {
        Self::with_gateway(webhook_secret, StubGateway::default())
    }

    /// Builds a router with a caller-configured gateway double.
    pub fn with_gateway(webhook_secret: &str, gateway: StubGateway) -> Self {
        let ledger = Arc::new(MemoryLedger::with_wallet("ada_01", 0));
        let ledger_store: Arc<dyn LedgerStore> = ledger.clone();
        let jwt = JwtService::new("test-jwt-secret", 900);
        let dispatcher = Arc::new(ReconciliationDispatcher::new(
            Arc::clone(&ledger_store),
            webhook_secret,
        ));
        let state = AppState {
            ledger: ledger_store,
            payout_accounts: Arc::new(PayoutAccountRepository::new(
                sea_orm_disconnected(),
            )),
            gateway: Arc::new(gateway),
            dispatcher,
            retry: RetryCoordinator::new(1, std::time::Duration::ZERO),
            jwt_service: Arc::new(jwt.clone()),
        };
        Self {
            ledger,
            jwt,
            router: create_router(state),
        }
    }

    /// Mints a bearer token for `ada_01`.
    pub fn token(&self) -> String {
        self.jwt
            .generate_access_token("ada_01", "ada@example.com")
            .unwrap()
    }

    /// Sends a request through the router and parses the response.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        TestResponse { status, json }
    }
}

// Payout-account routes are not exercised by in-memory tests; the
// repository just needs a connection value to exist.
fn sea_orm_disconnected() -> sea_orm::DatabaseConnection {
    sea_orm::DatabaseConnection::Disconnected
}

/// Request builders.
pub mod request {
    use super::{Body, Request, header};

    /// POST to the webhook endpoint with an optional signature header.
    pub fn webhook(body: &[u8], signature: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/v1/webhook/paystack")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(signature) = signature {
            builder = builder.header("x-paystack-signature", signature);
        }
        builder.body(Body::from(body.to_vec())).unwrap()
    }

    /// Authenticated GET.
    pub fn get(path: &str, token: &str) -> Request<Body> {
        Request::builder()
            .method("GET")
            .uri(path)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    }

    /// Authenticated POST with a JSON body.
    pub fn post_json(path: &str, token: &str, body: &serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(path)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }
}
