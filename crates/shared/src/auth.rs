//! Authentication claims carried by access tokens.
//!
//! Token issuance (signup, OTP, login) happens in the identity service;
//! this crate only defines the claim shape and validates signatures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// JWT claims for an authenticated wallet user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user's wallet tag.
    pub sub: String,
    /// Email registered with the payment provider for charge receipts.
    pub email: String,
    /// Expiration timestamp (seconds since epoch).
    pub exp: i64,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: i64,
}

impl Claims {
    /// Creates new claims for a user.
    #[must_use]
    pub fn new(usertag: &str, email: &str, expires_at: DateTime<Utc>) -> Self {
        Self {
            sub: usertag.to_string(),
            email: email.to_string(),
            exp: expires_at.timestamp(),
            iat: Utc::now().timestamp(),
        }
    }

    /// Returns the user's wallet tag.
    #[must_use]
    pub fn usertag(&self) -> &str {
        &self.sub
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_claims_new() {
        let exp = Utc::now() + Duration::minutes(15);
        let claims = Claims::new("ada_01", "ada@example.com", exp);
        assert_eq!(claims.usertag(), "ada_01");
        assert_eq!(claims.email, "ada@example.com");
        assert_eq!(claims.exp, exp.timestamp());
        assert!(claims.iat <= claims.exp);
    }
}
