//! API route definitions.

use axum::{Router, middleware};

use crate::{AppState, middleware::auth::auth_middleware};

pub mod health;
pub mod wallet;
pub mod webhook;

/// Creates the API router: public provider-facing routes plus
/// auth-protected wallet routes.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    let protected_routes = wallet::routes().layer(middleware::from_fn_with_state(
        state.clone(),
        auth_middleware,
    ));

    Router::new()
        .merge(health::routes())
        .merge(webhook::routes())
        .merge(wallet::public_routes())
        .merge(protected_routes)
}
