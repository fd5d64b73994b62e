//! Request authentication
//!
//! Two independent acceptance paths share one process-wide secret: a literal
//! bearer token, or an HMAC-SHA256 signature over the exact raw body bytes.
//! Both comparisons run in constant time, and every malformed input fails
//! closed: this function returns a bool and never panics.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the lowercase-hex HMAC-SHA256 of the raw request body.
pub const SIGNATURE_HEADER: &str = "x-isolator-signature";

/// Check a request against the shared secret.
///
/// An unconfigured (empty) secret rejects everything, including an empty
/// bearer token that would otherwise compare equal.
pub fn authorize(headers: &HeaderMap, raw_body: &[u8], secret: &str) -> bool {
    if secret.is_empty() {
        return false;
    }
    bearer_matches(headers, secret) || signature_matches(headers, raw_body, secret)
}

fn bearer_matches(headers: &HeaderMap, secret: &str) -> bool {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match token {
        Some(token) => {
            // ConstantTimeEq short-circuits on length, which leaks only the
            // token length, not its content.
            token.as_bytes().ct_eq(secret.as_bytes()).into()
        }
        None => false,
    }
}

fn signature_matches(headers: &HeaderMap, raw_body: &[u8], secret: &str) -> bool {
    let provided = match headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok()) {
        Some(sig) => sig,
        None => return false,
    };

    let digest = match hex::decode(provided) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };

    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(raw_body);

    // verify_slice is constant-time internally.
    mac.verify_slice(&digest).is_ok()
}

/// Compute the signature a caller would send for `body`. Shared with tests
/// and useful for local curl invocations.
pub fn sign(body: &[u8], secret: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}
