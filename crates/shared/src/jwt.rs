//! JWT token validation and (test-support) generation.

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use thiserror::Error;

use crate::auth::Claims;

/// Errors that can occur during JWT operations.
#[derive(Debug, Error)]
pub enum JwtError {
    /// Token encoding failed.
    #[error("failed to encode token: {0}")]
    Encoding(String),

    /// Token has expired.
    #[error("token has expired")]
    Expired,

    /// Token is invalid or malformed.
    #[error("invalid token")]
    Invalid,
}

/// JWT service for token operations.
#[derive(Clone)]
pub struct JwtService {
    access_token_expiry: Duration,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("access_token_expiry", &self.access_token_expiry)
            .field("encoding_key", &"[hidden]")
            .field("decoding_key", &"[hidden]")
            .finish()
    }
}

impl JwtService {
    /// Creates a new JWT service from the shared signing secret.
    #[must_use]
    pub fn new(secret: &str, access_token_expiry_secs: u64) -> Self {
        let expiry_secs = i64::try_from(access_token_expiry_secs).unwrap_or(i64::MAX);
        Self {
            access_token_expiry: Duration::try_seconds(expiry_secs).unwrap_or(Duration::MAX),
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Generates an access token for a user.
    ///
    /// The identity service is the normal issuer; this is kept for tooling
    /// and integration tests.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::Encoding` if token generation fails.
    pub fn generate_access_token(&self, usertag: &str, email: &str) -> Result<String, JwtError> {
        let claims = Claims::new(usertag, email, Utc::now() + self.access_token_expiry);
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| JwtError::Encoding(e.to_string()))
    }

    /// Validates a token and returns its claims.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::Expired` for expired tokens and
    /// `JwtError::Invalid` for anything else that fails validation.
    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
                _ => JwtError::Invalid,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> JwtService {
        JwtService::new("test-secret", 900)
    }

    #[test]
    fn test_roundtrip() {
        let svc = service();
        let token = svc.generate_access_token("ada_01", "ada@example.com").unwrap();
        let claims = svc.validate_token(&token).unwrap();
        assert_eq!(claims.usertag(), "ada_01");
        assert_eq!(claims.email, "ada@example.com");
    }

    #[test]
    fn test_rejects_wrong_secret() {
        let token = service().generate_access_token("ada_01", "a@b.c").unwrap();
        let other = JwtService::new("different-secret", 900);
        assert!(matches!(other.validate_token(&token), Err(JwtError::Invalid)));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(
            service().validate_token("not.a.token"),
            Err(JwtError::Invalid)
        ));
    }
}
