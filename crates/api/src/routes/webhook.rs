//! Provider webhook route.
//!
//! The signature is computed over the raw body bytes, so this handler
//! takes `Bytes` instead of a JSON extractor; parsing happens inside the
//! dispatcher after the authenticity gate. The 200 acknowledgement is
//! sent only after the ledger mutation committed, keeping the provider's
//! at-least-once retry semantics correct.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
};
use serde_json::json;
use tracing::error;

use crate::AppState;
use kobo_core::reconcile::ReconcileError;

/// Header carrying the HMAC-SHA512 hex signature.
const SIGNATURE_HEADER: &str = "x-paystack-signature";

/// Creates the webhook routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/webhook/paystack", post(paystack_webhook))
}

/// POST `/webhook/paystack` - Provider event delivery.
async fn paystack_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let Some(signature) = headers.get(SIGNATURE_HEADER).and_then(|h| h.to_str().ok()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "missing_signature",
                "message": "Signature header is required"
            })),
        )
            .into_response();
    };

    match state.dispatcher.process(&body, signature).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "message": "event processed" })),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "webhook processing failed");
            let error = match &e {
                ReconcileError::InvalidSignature => "invalid_signature",
                ReconcileError::MalformedEvent(_) => "malformed_event",
                ReconcileError::Ledger(inner) => inner.error_code(),
            };
            let status = StatusCode::from_u16(e.http_status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (
                status,
                Json(json!({ "error": error.to_lowercase(), "message": e.to_string() })),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{TestContext, request};
    use axum::http::StatusCode;
    use kobo_core::ledger::{LedgerStore, TransactionStatus, TxnReference};
    use kobo_core::reconcile::signature::sign;
    use kobo_shared::Money;

    const SECRET: &str = "sk_test_webhook";

    fn charge_success(reference: &str) -> Vec<u8> {
        format!(r#"{{"event":"charge.success","data":{{"reference":"{reference}"}}}}"#).into_bytes()
    }

    #[tokio::test]
    async fn test_webhook_applies_and_acks() {
        let ctx = TestContext::new(SECRET);
        let reference = TxnReference::from_raw("t1");
        ctx.ledger
            .credit_pending("ada_01", Money::from_minor(40_000), &reference)
            .await
            .unwrap();

        let body = charge_success("t1");
        let sig = sign(SECRET, &body);
        let response = ctx
            .send(request::webhook(&body, Some(&sig)))
            .await;

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(ctx.ledger.snapshot("ada_01"), (40_000, 0));
        assert_eq!(ctx.ledger.status_of("t1"), TransactionStatus::Success);
    }

    #[tokio::test]
    async fn test_webhook_replay_is_acked_without_double_credit() {
        let ctx = TestContext::new(SECRET);
        let reference = TxnReference::from_raw("t1");
        ctx.ledger
            .credit_pending("ada_01", Money::from_minor(40_000), &reference)
            .await
            .unwrap();

        let body = charge_success("t1");
        let sig = sign(SECRET, &body);
        let first = ctx.send(request::webhook(&body, Some(&sig))).await;
        let second = ctx.send(request::webhook(&body, Some(&sig))).await;

        assert_eq!(first.status, StatusCode::OK);
        assert_eq!(second.status, StatusCode::OK);
        assert_eq!(ctx.ledger.snapshot("ada_01"), (40_000, 0));
    }

    #[tokio::test]
    async fn test_webhook_rejects_bad_signature_without_mutation() {
        let ctx = TestContext::new(SECRET);
        let reference = TxnReference::from_raw("t1");
        ctx.ledger
            .credit_pending("ada_01", Money::from_minor(40_000), &reference)
            .await
            .unwrap();

        let before = ctx.ledger.snapshot("ada_01");
        let body = charge_success("t1");
        let response = ctx.send(request::webhook(&body, Some("00ff"))).await;

        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.json["error"], "invalid_signature");
        assert_eq!(ctx.ledger.snapshot("ada_01"), before);
        assert_eq!(ctx.ledger.status_of("t1"), TransactionStatus::Pending);
    }

    #[tokio::test]
    async fn test_webhook_rejects_missing_signature() {
        let ctx = TestContext::new(SECRET);
        let response = ctx
            .send(request::webhook(&charge_success("t1"), None))
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.json["error"], "missing_signature");
    }

    #[tokio::test]
    async fn test_webhook_acks_unknown_event() {
        let ctx = TestContext::new(SECRET);
        let body = br#"{"event":"subscription.create","data":{}}"#.to_vec();
        let sig = sign(SECRET, &body);
        let response = ctx.send(request::webhook(&body, Some(&sig))).await;
        assert_eq!(response.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_webhook_rejects_malformed_known_event() {
        let ctx = TestContext::new(SECRET);
        let body = br#"{"event":"charge.success","data":{"reference":42}}"#.to_vec();
        let sig = sign(SECRET, &body);
        let response = ctx.send(request::webhook(&body, Some(&sig))).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.json["error"], "malformed_event");
    }
}
