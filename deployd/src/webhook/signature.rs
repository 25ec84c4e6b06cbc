//! Webhook signature verification
//!
//! GitHub signs each delivery with an HMAC-SHA256 digest over the raw body,
//! sent as `X-Hub-Signature-256: sha256=<hex>`. Verification is a pure
//! function of (secret, raw body, header value) and never errors: anything
//! missing or malformed verifies as false.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the delivery signature
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// Scheme prefix on the header value
const SIGNATURE_PREFIX: &str = "sha256=";

/// Verify a delivery signature against the raw request body.
///
/// The digest comparison runs in constant time.
pub fn verify(secret: &SecretString, body: &[u8], signature_header: Option<&str>) -> bool {
    let Some(header) = signature_header else {
        return false;
    };
    let Some(hex_digest) = header.strip_prefix(SIGNATURE_PREFIX) else {
        return false;
    };
    let Ok(provided) = hex::decode(hex_digest) else {
        return false;
    };

    // HMAC accepts keys of any length, so this cannot fail in practice
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.expose_secret().as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&provided).is_ok()
}

/// Compute the signature header value for a body.
pub fn sign(secret: &SecretString, body: &[u8]) -> String {
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.expose_secret().as_bytes()) else {
        return String::new();
    };
    mac.update(body);
    format!(
        "{}{}",
        SIGNATURE_PREFIX,
        hex::encode(mac.finalize().into_bytes())
    )
}
