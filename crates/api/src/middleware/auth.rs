//! Authentication middleware for protected routes.

use axum::{
    Json,
    extract::{FromRequestParts, Request, State},
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::AppState;
use kobo_shared::{Claims, JwtError};

/// Extracts the bearer token from the Authorization header.
fn extract_bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
}

/// Authentication middleware that validates JWT tokens.
///
/// Extracts the Bearer token, validates it, and stores the claims in
/// request extensions for handlers to access.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let Some(token) = auth_header.and_then(extract_bearer_token) else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "error": "missing_token",
                "message": "Authorization header with Bearer token is required"
            })),
        )
            .into_response();
    };

    match state.jwt_service.validate_token(token) {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(e) => {
            let (error, message) = match e {
                JwtError::Expired => ("token_expired", "Token has expired"),
                _ => ("invalid_token", "Invalid or malformed token"),
            };
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": error, "message": message })),
            )
                .into_response()
        }
    }
}

/// Extractor for authenticated user claims.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    /// Returns the user's wallet tag.
    #[must_use]
    pub fn usertag(&self) -> &str {
        self.0.usertag()
    }

    /// Returns the user's email.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.0.email
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<serde_json::Value>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Claims>().cloned().map(AuthUser).ok_or((
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "error": "unauthenticated",
                "message": "Authentication required"
            })),
        ))
    }
}
