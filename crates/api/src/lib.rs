//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST API routes for wallet operations
//! - The provider webhook endpoint
//! - Authentication middleware
//!
//! Dependencies are injected through `AppState` as trait objects, so
//! route handlers never construct their own gateway or storage.

pub mod middleware;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use kobo_core::gateway::PaymentGateway;
use kobo_core::ledger::LedgerStore;
use kobo_core::reconcile::ReconciliationDispatcher;
use kobo_gateway::RetryCoordinator;
use kobo_ledger::PayoutAccountRepository;
use kobo_shared::JwtService;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Wallet ledger store.
    pub ledger: Arc<dyn LedgerStore>,
    /// Payout account repository.
    pub payout_accounts: Arc<PayoutAccountRepository>,
    /// Payment provider client.
    pub gateway: Arc<dyn PaymentGateway>,
    /// Reconciliation dispatcher for provider events.
    pub dispatcher: Arc<ReconciliationDispatcher>,
    /// Retry coordinator for outbound transfers.
    pub retry: RetryCoordinator,
    /// JWT service for token validation.
    pub jwt_service: Arc<JwtService>,
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes_with_state(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod testing;
