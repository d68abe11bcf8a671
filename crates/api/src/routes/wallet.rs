//! Wallet routes: balance, top-up, withdrawal, banks, payout accounts.
//!
//! Handlers orchestrate the ledger store and the payment gateway; every
//! balance mutation happens inside the repositories, and provider
//! outcomes settle through the reconciliation dispatcher rather than
//! here. Amounts cross this API as minor-unit integers (kobo).

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{AppState, middleware::AuthUser};
use kobo_core::gateway::GatewayError;
use kobo_core::ledger::{LedgerError, Purpose, TxnReference};
use kobo_core::reconcile::ProviderEvent;
use kobo_ledger::repositories::payout_account::{CreatePayoutAccountInput, PayoutAccountError};
use kobo_shared::Money;

/// Creates the auth-protected wallet routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/wallet/balance", get(fetch_balance))
        .route("/wallet/topup", post(topup))
        .route("/wallet/withdraw", post(withdraw))
        .route("/wallet/banks", get(fetch_banks))
        .route("/wallet/payout-accounts", post(create_payout_account))
        .route("/wallet/payout-accounts", get(fetch_payout_accounts))
        .route("/wallet/payout-accounts/{id}", delete(deactivate_payout_account))
        .route("/wallet/transactions", get(fetch_transactions))
}

/// Creates the provider-facing wallet routes (no auth: the checkout
/// redirect arrives from the user's browser without our bearer token).
pub fn public_routes() -> Router<AppState> {
    Router::new().route("/wallet/callback", get(payment_callback))
}

/// Request body for a top-up.
#[derive(Debug, Deserialize)]
pub struct TopUpRequest {
    /// Amount in minor units (kobo), must be positive.
    pub amount: i64,
}

/// Request body for a withdrawal.
#[derive(Debug, Deserialize)]
pub struct WithdrawRequest {
    /// Amount in minor units (kobo), must be positive.
    pub amount: i64,
    /// Provider recipient code of a registered payout account.
    pub recipient_code: String,
}

/// Request body for registering a payout account.
#[derive(Debug, Deserialize)]
pub struct CreatePayoutAccountRequest {
    /// Bank account number.
    pub account_number: String,
    /// Provider bank code.
    pub bank_code: String,
}

/// Query parameters for the checkout callback.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    /// Transaction reference echoed by the provider.
    pub reference: Option<String>,
}

/// GET `/wallet/balance` - Current available and pending balances.
async fn fetch_balance(State(state): State<AppState>, auth: AuthUser) -> Response {
    match state.ledger.balance(auth.usertag()).await {
        Ok(balances) => (
            StatusCode::OK,
            Json(json!({
                "usertag": auth.usertag(),
                "available": balances.available,
                "pending": balances.pending,
                "available_formatted": balances.available.to_string(),
                "pending_formatted": balances.pending.to_string(),
                "status": balances.status,
            })),
        )
            .into_response(),
        Err(e) => ledger_error(&e),
    }
}

/// POST `/wallet/topup` - Start a checkout charge to fund the wallet.
async fn topup(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<TopUpRequest>,
) -> Response {
    let amount = Money::from_minor(payload.amount);
    if !amount.is_positive() {
        return validation_error("Top-up amount must be a positive number of kobo");
    }

    let reference = TxnReference::generate(Purpose::Topup, auth.usertag(), Utc::now());

    // the pending row exists before the outbound call, so a provider
    // outcome can never arrive for an unknown reference
    if let Err(e) = state
        .ledger
        .credit_pending(auth.usertag(), amount, &reference)
        .await
    {
        return ledger_error(&e);
    }

    let charge = match state
        .gateway
        .initialize_charge(auth.email(), amount, &reference)
        .await
    {
        Ok(charge) => charge,
        Err(e) => {
            error!(reference = %reference, error = %e, "charge initialization failed");
            return gateway_error(&e);
        }
    };

    if let Err(e) = state
        .ledger
        .mark_charge_initialized(&reference, &charge.access_code, &charge.reference)
        .await
    {
        return ledger_error(&e);
    }

    info!(usertag = auth.usertag(), reference = %reference, "top-up initialized");
    (
        StatusCode::OK,
        Json(json!({
            "authorization_url": charge.authorization_url,
            "reference": reference,
        })),
    )
        .into_response()
}

/// GET `/wallet/callback` - Provider redirect after checkout.
///
/// Verifies the charge synchronously and funnels the outcome through the
/// same finalization as the webhook; whichever path lands first wins and
/// the other becomes a no-op.
async fn payment_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let Some(reference) = query.reference else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "missing_reference",
                "message": "Reference not found in query parameters",
                "retry": "/wallet/topup",
            })),
        )
            .into_response();
    };
    let reference = TxnReference::from_raw(reference);

    match state.gateway.verify_charge(&reference).await {
        Ok(true) => {
            let event = ProviderEvent::ChargeSuccess {
                reference: reference.clone(),
            };
            match state.dispatcher.handle_event(event).await {
                Ok(_) => (
                    StatusCode::OK,
                    Json(json!({
                        "status": "success",
                        "message": "Payment confirmed",
                        "reference": reference,
                    })),
                )
                    .into_response(),
                Err(e) => {
                    error!(reference = %reference, error = %e, "verify finalization failed");
                    (
                        StatusCode::from_u16(e.http_status_code())
                            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                        Json(json!({
                            "error": "finalization_failed",
                            "message": e.to_string(),
                            "retry": "/wallet/topup",
                        })),
                    )
                        .into_response()
                }
            }
        }
        Ok(false) => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "charge_not_successful",
                "message": "The charge was not completed",
                "retry": "/wallet/topup",
            })),
        )
            .into_response(),
        Err(e) => {
            error!(reference = %reference, error = %e, "charge verification failed");
            gateway_error(&e)
        }
    }
}

/// POST `/wallet/withdraw` - Reserve funds and start a payout transfer.
async fn withdraw(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<WithdrawRequest>,
) -> Response {
    let amount = Money::from_minor(payload.amount);
    if !amount.is_positive() {
        return validation_error("Withdrawal amount must be a positive number of kobo");
    }

    // ownership gate: the recipient must be one of the caller's active
    // payout accounts
    let account = match state
        .payout_accounts
        .find_by_recipient_code(auth.usertag(), &payload.recipient_code)
        .await
    {
        Ok(account) => account,
        Err(e) => return payout_error(&e),
    };

    let reference = TxnReference::generate(Purpose::Withdrawal, auth.usertag(), Utc::now());
    if let Err(e) = state
        .ledger
        .reserve_for_debit(auth.usertag(), amount, &reference)
        .await
    {
        return ledger_error(&e);
    }

    // the reservation is committed before the provider call; a crash or
    // exhaustion here leaves the row `initiated` with funds parked in
    // pending_balance for reconciliation
    let transfer_code = match state
        .retry
        .initiate_transfer(&*state.gateway, &account.recipient_code, amount, &reference)
        .await
    {
        Ok(code) => code,
        Err(e) => {
            error!(reference = %reference, error = %e, "transfer could not be started");
            return (
                StatusCode::BAD_GATEWAY,
                Json(json!({
                    "error": "transfer_not_started",
                    "message": "Could not initiate transfer, please try again later",
                    "reference": reference,
                })),
            )
                .into_response();
        }
    };

    if let Err(e) = state
        .ledger
        .mark_transfer_started(&reference, &transfer_code)
        .await
    {
        return ledger_error(&e);
    }

    info!(usertag = auth.usertag(), reference = %reference, "withdrawal initiated");
    (
        StatusCode::OK,
        Json(json!({
            "message": "Withdrawal initiated, funds reserved in pending balance",
            "reference": reference,
        })),
    )
        .into_response()
}

/// GET `/wallet/banks` - Banks available for payouts.
async fn fetch_banks(State(state): State<AppState>, _auth: AuthUser) -> Response {
    match state.gateway.list_banks().await {
        Ok(banks) => (StatusCode::OK, Json(json!({ "banks": banks }))).into_response(),
        Err(e) => gateway_error(&e),
    }
}

/// POST `/wallet/payout-accounts` - Resolve and register a payout account.
async fn create_payout_account(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreatePayoutAccountRequest>,
) -> Response {
    if payload.account_number.is_empty() || payload.bank_code.is_empty() {
        return validation_error("account_number and bank_code are required");
    }

    let account_name = match state
        .gateway
        .resolve_account(&payload.account_number, &payload.bank_code)
        .await
    {
        Ok(name) => name,
        Err(e) => return gateway_error(&e),
    };

    let recipient = match state
        .gateway
        .create_recipient(&account_name, &payload.account_number, &payload.bank_code)
        .await
    {
        Ok(recipient) => recipient,
        Err(e) => return gateway_error(&e),
    };

    let input = CreatePayoutAccountInput {
        usertag: auth.usertag().to_string(),
        account_name: account_name.clone(),
        account_number: payload.account_number.clone(),
        bank_code: payload.bank_code,
        bank_name: recipient.bank_name.clone(),
        recipient_code: recipient.recipient_code,
    };
    match state.payout_accounts.create(input).await {
        Ok(account) => {
            info!(usertag = auth.usertag(), account_id = %account.id, "payout account registered");
            (
                StatusCode::CREATED,
                Json(json!({
                    "id": account.id,
                    "account_name": account_name,
                    "account_number": payload.account_number,
                    "bank_name": recipient.bank_name,
                })),
            )
                .into_response()
        }
        Err(e) => payout_error(&e),
    }
}

/// GET `/wallet/payout-accounts` - The caller's active payout accounts.
async fn fetch_payout_accounts(State(state): State<AppState>, auth: AuthUser) -> Response {
    match state.payout_accounts.list_active(auth.usertag()).await {
        Ok(accounts) => {
            let accounts: Vec<_> = accounts
                .into_iter()
                .map(|a| {
                    json!({
                        "id": a.id,
                        "account_name": a.account_name,
                        "account_number": a.account_number,
                        "bank_code": a.bank_code,
                        "bank_name": a.bank_name,
                        "recipient_code": a.recipient_code,
                    })
                })
                .collect();
            (StatusCode::OK, Json(json!({ "accounts": accounts }))).into_response()
        }
        Err(e) => payout_error(&e),
    }
}

/// DELETE `/wallet/payout-accounts/{id}` - Soft-deactivate an account.
async fn deactivate_payout_account(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Response {
    match state.payout_accounts.deactivate(auth.usertag(), id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "message": "Payout account deactivated" })),
        )
            .into_response(),
        Err(e) => payout_error(&e),
    }
}

/// GET `/wallet/transactions` - Transaction history, newest first.
async fn fetch_transactions(State(state): State<AppState>, auth: AuthUser) -> Response {
    match state.ledger.transactions(auth.usertag()).await {
        Ok(transactions) => {
            (StatusCode::OK, Json(json!({ "transactions": transactions }))).into_response()
        }
        Err(e) => ledger_error(&e),
    }
}

fn validation_error(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": "validation_error", "message": message })),
    )
        .into_response()
}

fn ledger_error(e: &LedgerError) -> Response {
    if e.http_status_code() >= 500 {
        error!(error = %e, "ledger operation failed");
    } else {
        warn!(error = %e, "ledger operation rejected");
    }
    (
        StatusCode::from_u16(e.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(json!({
            "error": e.error_code().to_lowercase(),
            "message": e.to_string(),
        })),
    )
        .into_response()
}

fn gateway_error(e: &GatewayError) -> Response {
    (
        StatusCode::BAD_GATEWAY,
        Json(json!({ "error": "gateway_error", "message": e.to_string() })),
    )
        .into_response()
}

fn payout_error(e: &PayoutAccountError) -> Response {
    (
        StatusCode::from_u16(e.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(json!({
            "error": e.error_code().to_lowercase(),
            "message": e.to_string(),
        })),
    )
        .into_response()
}
