//! `Set-Cookie` values for the session and CSRF cookies, and `Cookie` parsing.

use super::csrf::CSRF_COOKIE;
use super::session::SESSION_TTL_SECS;
use axum::http::{header::COOKIE, HeaderMap};

/// Cookie carrying the signed session token.
pub const SESSION_COOKIE: &str = "access_token";

const EXPIRED: &str = "Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT";

/// Session cookie set on login.
pub fn session_cookie(token: &str) -> String {
    format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; Secure; SameSite=Lax",
        SESSION_COOKIE, token, SESSION_TTL_SECS
    )
}

/// Expired session cookie for logout. Clearing uses SameSite=Strict.
pub fn clear_session_cookie() -> String {
    format!(
        "{}=; Path=/; {}; HttpOnly; Secure; SameSite=Strict",
        SESSION_COOKIE, EXPIRED
    )
}

/// CSRF cookie. Not HttpOnly: client script must read it to echo the header.
pub fn csrf_cookie(token: &str) -> String {
    format!(
        "{}={}; Path=/; Max-Age={}; Secure; SameSite=Strict",
        CSRF_COOKIE, token, SESSION_TTL_SECS
    )
}

/// Expired CSRF cookie, same attributes as [`csrf_cookie`].
pub fn clear_csrf_cookie() -> String {
    format!("{}=; Path=/; {}; Secure; SameSite=Strict", CSRF_COOKIE, EXPIRED)
}

/// Find a cookie value by name across all `Cookie` headers.
pub fn read_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}
