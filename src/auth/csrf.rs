//! Double-submit CSRF tokens.
//!
//! A random token is handed out in a script-readable cookie and must be
//! echoed back in the `X-CSRF-Token` header on every mutating call. The
//! server keeps no record of issued tokens.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;

/// Cookie carrying the token.
pub const CSRF_COOKIE: &str = "csrf_token";

/// Header the caller echoes the token in.
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Generate a CSRF token (32 random bytes, base64url-encoded without padding).
pub fn generate_csrf_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Check the cookie value against the header value.
///
/// Exact match required. A missing or empty value on either side fails.
pub fn verify_csrf(cookie: Option<&str>, header: Option<&str>) -> bool {
    match (cookie, header) {
        (Some(c), Some(h)) if !c.is_empty() && !h.is_empty() => {
            constant_time_eq(c.as_bytes(), h.as_bytes())
        }
        _ => false,
    }
}

/// Constant-time byte comparison.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
