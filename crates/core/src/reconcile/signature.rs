//! Webhook authenticity gate.
//!
//! The provider signs every webhook body with HMAC-SHA512 under the
//! shared secret and sends the hex digest in a header. Verification runs
//! over the raw body bytes, before any parsing, and uses a constant-time
//! comparison.

use hmac::{Hmac, Mac};
use sha2::Sha512;

type HmacSha512 = Hmac<Sha512>;

/// Verifies a header-supplied signature against the raw body.
///
/// Returns false for malformed hex, wrong length, or digest mismatch.
#[must_use]
pub fn verify_signature(secret: &str, body: &[u8], signature_hex: &str) -> bool {
    let Ok(signature) = hex::decode(signature_hex) else {
        return false;
    };
    let mut mac =
        HmacSha512::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(body);
    mac.verify_slice(&signature).is_ok()
}

/// Computes the hex signature for a body.
///
/// Counterpart of [`verify_signature`] for integration tests and local
/// webhook tooling.
#[must_use]
pub fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac =
        HmacSha512::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}
