//! Security headers middleware.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};

/// Middleware that adds security headers to all responses.
///
/// - **Cache-Control: no-store**
///   Responses carry personal data (addresses, identities) and must not be
///   kept by shared or browser caches.
///
/// - **X-Content-Type-Options: nosniff**
///   Forces browsers to treat JSON bodies as JSON.
///
/// - **X-Frame-Options: DENY** and `frame-ancestors 'none'`
///   The API is never framed.
///
/// - **Referrer-Policy: no-referrer**
///
/// - **Strict-Transport-Security**
///   The session and CSRF cookies are `Secure`; HTTPS for 2 years.
///
/// - **Content-Security-Policy: default-src 'none'**
///   The service returns no documents, so nothing may load.
///
/// # Usage
///
/// ```rust,no_run
/// use axum::Router;
/// use axum::middleware;
/// use postbox::middleware::security_headers;
///
/// let app: Router = Router::new()
///     .layer(middleware::from_fn(security_headers));
/// ```
pub async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert("cache-control", HeaderValue::from_static("no-store"));
    headers.insert("referrer-policy", HeaderValue::from_static("no-referrer"));
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "strict-transport-security",
        HeaderValue::from_static("max-age=63072000; includeSubDomains"),
    );
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
    );

    response
}
