//! Session and CSRF boundary for the protected API.
//!
//! `require_session` decodes the session cookie once per request and stores
//! an [`AuthSession`] in the request extensions. Handlers receive it through
//! the `AuthSession` extractor and pass the user id explicitly into the core.

use super::cookies::{csrf_cookie, read_cookie, SESSION_COOKIE};
use super::csrf::{generate_csrf_token, verify_csrf, CSRF_COOKIE, CSRF_HEADER};
use super::password::CredentialHasher;
use super::service::AuthService;
use super::session::SessionIssuer;
use crate::addresses::AddressAuthorizer;
use crate::error::AppError;
use crate::models::{SessionClaims, UserId};
use crate::storage::{AddressStore, UserDirectory};
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::SET_COOKIE, request::Parts, HeaderValue, Method},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Path exempt from the CSRF check: logout only clears client-held cookies.
pub const LOGOUT_PATH: &str = "/api/v1/logout";

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub sessions: Arc<SessionIssuer>,
    pub addresses: Arc<AddressAuthorizer>,
}

impl AppState {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        addresses: Arc<dyn AddressStore>,
        hasher: CredentialHasher,
        session_secret: &[u8],
    ) -> Self {
        Self {
            auth: Arc::new(AuthService::new(users, hasher)),
            sessions: Arc::new(SessionIssuer::new(session_secret)),
            addresses: Arc::new(AddressAuthorizer::new(addresses)),
        }
    }
}

/// Verified caller identity for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub user_id: UserId,
    pub email: String,
}

impl From<SessionClaims> for AuthSession {
    fn from(claims: SessionClaims) -> Self {
        AuthSession {
            user_id: claims.user_id,
            email: claims.email,
        }
    }
}

/// Decode the session cookie. A missing or empty cookie is an invalid token.
fn decode_session(headers: &axum::http::HeaderMap, state: &AppState) -> Result<AuthSession, AppError> {
    let token = read_cookie(headers, SESSION_COOKIE)
        .filter(|t| !t.is_empty())
        .ok_or(AppError::InvalidToken)?;
    Ok(state.sessions.parse(token)?.into())
}

/// Authenticated session extractor.
///
/// Uses the session stored by [`require_session`] when present, otherwise
/// decodes the `access_token` cookie itself. Rejects with 401.
impl FromRequestParts<AppState> for AuthSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(session) = parts.extensions.get::<AuthSession>() {
            return Ok(session.clone());
        }
        decode_session(&parts.headers, state)
    }
}

/// Reject requests without a valid session cookie.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let session = decode_session(request.headers(), &state).inspect_err(|e| {
        if e.is_unauthenticated() {
            tracing::debug!(action = "session_rejected", error = %e, "Unauthenticated request");
        }
    })?;

    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}

fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Double-submit CSRF check.
///
/// Unsafe methods must carry an `X-CSRF-Token` header equal to the
/// `csrf_token` cookie. Responses to callers without the cookie get a fresh
/// one. The logout path is neither checked nor handed a cookie.
pub async fn csrf_protect(request: Request, next: Next) -> Result<Response, AppError> {
    let exempt = request.uri().path() == LOGOUT_PATH;
    let has_cookie = read_cookie(request.headers(), CSRF_COOKIE).is_some_and(|c| !c.is_empty());

    if !exempt && !is_safe_method(request.method()) {
        let cookie = read_cookie(request.headers(), CSRF_COOKIE);
        let header = request
            .headers()
            .get(CSRF_HEADER)
            .and_then(|v| v.to_str().ok());

        if !verify_csrf(cookie, header) {
            tracing::warn!(
                action = "csrf_rejected",
                method = %request.method(),
                path = %request.uri().path(),
                "CSRF token missing or mismatched"
            );
            return Err(AppError::CsrfMismatch);
        }
    }

    let mut response = next.run(request).await;

    if !exempt && !has_cookie {
        let cookie = HeaderValue::from_str(&csrf_cookie(&generate_csrf_token()))
            .map_err(|e| AppError::Unavailable(format!("Invalid CSRF cookie: {}", e)))?;
        response.headers_mut().append(SET_COOKIE, cookie);
    }

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::{MemoryAddressStore, MemoryUserDirectory};
    use argon2::Params;
    use axum::{
        body::Body,
        http::{header::COOKIE, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    const SECRET: &[u8] = b"middleware-test-secret-middleware";

    fn test_state() -> AppState {
        AppState::new(
            Arc::new(MemoryUserDirectory::new()),
            Arc::new(MemoryAddressStore::new()),
            CredentialHasher::with_params(Params::new(1024, 1, 1, None).unwrap()),
            SECRET,
        )
    }

    async fn whoami(session: AuthSession) -> String {
        session.user_id.to_string()
    }

    async fn whoami_email(session: AuthSession) -> String {
        session.email
    }

    fn app(state: AppState) -> Router {
        Router::new()
            .route("/api/v1/whoami", get(whoami).post(whoami))
            .route("/api/v1/whoami/email", get(whoami_email))
            .route("/api/v1/logout", axum::routing::post(whoami))
            .route_layer(middleware::from_fn(csrf_protect))
            .route_layer(middleware::from_fn_with_state(state.clone(), require_session))
            .with_state(state)
    }

    fn token(state: &AppState, user_id: UserId) -> String {
        state
            .sessions
            .issue_at(user_id, "a@example.com", crate::storage::unix_now())
            .unwrap()
    }

    #[tokio::test]
    async fn test_missing_cookie_is_unauthorized() {
        let response = app(test_state())
            .oneshot(
                axum::http::Request::builder()
                    .uri("/api/v1/whoami")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_session_carries_token_email() {
        let state = test_state();
        let token = state
            .sessions
            .issue_at(9, "carol@example.com", crate::storage::unix_now())
            .unwrap();
        let response = app(state)
            .oneshot(
                axum::http::Request::builder()
                    .uri("/api/v1/whoami/email")
                    .header(COOKIE, format!("access_token={}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(body, "carol@example.com");
    }

    #[tokio::test]
    async fn test_expired_and_forged_tokens_look_the_same() {
        let state = test_state();
        let expired = state.sessions.issue_at(1, "a@example.com", 1_000).unwrap();
        let forged = SessionIssuer::new(b"some-other-secret-some-other-secret")
            .issue_at(1, "a@example.com", crate::storage::unix_now())
            .unwrap();

        let mut bodies = Vec::new();
        for token in [expired, forged] {
            let response = app(state.clone())
                .oneshot(
                    axum::http::Request::builder()
                        .uri("/api/v1/whoami")
                        .header(COOKIE, format!("access_token={}", token))
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            bodies.push(
                axum::body::to_bytes(response.into_body(), usize::MAX)
                    .await
                    .unwrap(),
            );
        }
        assert_eq!(bodies[0], bodies[1]);
    }

    #[tokio::test]
    async fn test_safe_request_gets_csrf_cookie() {
        let state = test_state();
        let response = app(state.clone())
            .oneshot(
                axum::http::Request::builder()
                    .uri("/api/v1/whoami")
                    .header(COOKIE, format!("access_token={}", token(&state, 7)))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let set_cookie = response
            .headers()
            .get(SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(set_cookie.starts_with("csrf_token="));

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(body, "7");
    }

    #[tokio::test]
    async fn test_unsafe_request_needs_matching_header() {
        let state = test_state();
        let session = format!("access_token={}; csrf_token=abc", token(&state, 7));

        let missing = app(state.clone())
            .oneshot(
                axum::http::Request::builder()
                    .method("POST")
                    .uri("/api/v1/whoami")
                    .header(COOKIE, &session)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::FORBIDDEN);

        let mismatched = app(state.clone())
            .oneshot(
                axum::http::Request::builder()
                    .method("POST")
                    .uri("/api/v1/whoami")
                    .header(COOKIE, &session)
                    .header(CSRF_HEADER, "abd")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(mismatched.status(), StatusCode::FORBIDDEN);

        let matched = app(state)
            .oneshot(
                axum::http::Request::builder()
                    .method("POST")
                    .uri("/api/v1/whoami")
                    .header(COOKIE, &session)
                    .header(CSRF_HEADER, "abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(matched.status(), StatusCode::OK);
        // Caller already holds a cookie, so none is issued
        assert!(matched.headers().get(SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn test_logout_is_exempt() {
        let state = test_state();
        let response = app(state.clone())
            .oneshot(
                axum::http::Request::builder()
                    .method("POST")
                    .uri("/api/v1/logout")
                    .header(COOKIE, format!("access_token={}", token(&state, 7)))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn test_session_checked_before_csrf() {
        // No session and no CSRF token: 401, not 403
        let response = app(test_state())
            .oneshot(
                axum::http::Request::builder()
                    .method("POST")
                    .uri("/api/v1/whoami")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
