//! Auth API endpoints.

use super::json_body;
use crate::auth::cookies::{clear_csrf_cookie, clear_session_cookie, csrf_cookie, session_cookie};
use crate::auth::csrf::generate_csrf_token;
use crate::auth::middleware::{AppState, AuthSession};
use crate::error::AppError;
use crate::models::{LoginRequest, RegisterRequest, UserResponse};
use crate::validation::{validate_login, validate_register};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header::SET_COOKIE, StatusCode},
    response::{AppendHeaders, IntoResponse},
    Json,
};

/// POST /api/register — Create an account
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let req = validate_register(json_body(payload)?)?;

    let identity = state
        .auth
        .register(&req.username, &req.email, &req.password)
        .await
        .inspect_err(|e| {
            if matches!(e, AppError::UserAlreadyExists) {
                tracing::info!(action = "register_conflict", "Email or username already registered");
            }
        })?;

    tracing::info!(action = "user_registered", user_id = %identity.id, username = %identity.username, "New user registered");

    Ok((StatusCode::CREATED, Json(UserResponse::from(identity))))
}

/// POST /api/login — Verify credentials and start a session
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let req = validate_login(json_body(payload)?)?;

    let identity = state
        .auth
        .login(&req.email, &req.password)
        .await
        .inspect_err(|e| {
            if matches!(e, AppError::InvalidCredentials) {
                tracing::warn!(action = "auth_failed", "Invalid credentials");
            }
        })?;

    let token = state.sessions.issue(&identity)?;

    tracing::info!(action = "auth_success", user_id = %identity.id, "User authenticated");

    Ok((
        AppendHeaders([
            (SET_COOKIE, session_cookie(&token)),
            (SET_COOKIE, csrf_cookie(&generate_csrf_token())),
        ]),
        Json(UserResponse::from(identity)),
    ))
}

/// POST /api/v1/logout — Clear the session and CSRF cookies
pub async fn logout(session: AuthSession) -> impl IntoResponse {
    tracing::info!(action = "logout", user_id = %session.user_id, email = %session.email, "User logged out");

    (
        StatusCode::NO_CONTENT,
        AppendHeaders([
            (SET_COOKIE, clear_session_cookie()),
            (SET_COOKIE, clear_csrf_cookie()),
        ]),
    )
}
