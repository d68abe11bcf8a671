//! Kobo API Server
//!
//! Main entry point for the Kobo wallet backend.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kobo_api::{AppState, create_router};
use kobo_core::ledger::LedgerStore;
use kobo_core::reconcile::ReconciliationDispatcher;
use kobo_gateway::{PaystackClient, RetryCoordinator};
use kobo_ledger::{PayoutAccountRepository, WalletRepository, connect};
use kobo_shared::{AppConfig, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kobo=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load().context("failed to load configuration")?;

    // Connect to database
    let db = connect(&config.database.url, config.database.max_connections).await?;
    info!("Connected to database");

    // Wire the ledger, gateway, and dispatcher
    let wallets = WalletRepository::new(db.clone());
    let ledger: Arc<dyn LedgerStore> = Arc::new(wallets);
    let payout_accounts = Arc::new(PayoutAccountRepository::new(db));

    let gateway = PaystackClient::new(&config.paystack)
        .map_err(|e| anyhow::anyhow!("failed to build gateway client: {e}"))?;
    info!(base_url = %config.paystack.base_url, "Payment gateway configured");

    let dispatcher = Arc::new(ReconciliationDispatcher::new(
        Arc::clone(&ledger),
        config.paystack.secret_key.clone(),
    ));

    let jwt_service = JwtService::new(
        &config.auth.jwt_secret,
        config.auth.access_token_expiry_secs,
    );

    // Create application state
    let state = AppState {
        ledger,
        payout_accounts,
        gateway: Arc::new(gateway),
        dispatcher,
        retry: RetryCoordinator::default(),
        jwt_service: Arc::new(jwt_service),
    };

    // Create router
    let app = create_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
