//! Error kinds returned by the core and their Axum response conversions.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application error kinds.
///
/// Every variant is terminal for the current request. Only `Unavailable`
/// carries infrastructure detail, and that detail never leaves the process.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User already exists")]
    UserAlreadyExists,

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid session token")]
    InvalidToken,

    #[error("Session expired")]
    Expired,

    #[error("CSRF token mismatch")]
    CsrfMismatch,

    #[error("Not found")]
    NotFound,

    #[error("Forbidden")]
    Forbidden,

    #[error("Cannot delete default address")]
    CannotDeleteDefault,

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    /// True for the session-decode failures, which share one external shape.
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, AppError::InvalidToken | AppError::Expired)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Unavailable(msg) => {
                tracing::error!(error = %msg, "Infrastructure failure");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Service unavailable".to_string(),
                )
            }
            AppError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string())
            }
            // Expired and forged tokens look the same from outside.
            AppError::InvalidToken | AppError::Expired => {
                (StatusCode::UNAUTHORIZED, "Not authenticated".to_string())
            }
            AppError::UserAlreadyExists => {
                (StatusCode::CONFLICT, "User already exists".to_string())
            }
            AppError::CsrfMismatch => (StatusCode::FORBIDDEN, "Invalid CSRF token".to_string()),
            AppError::NotFound => (StatusCode::NOT_FOUND, "Address not found".to_string()),
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                "You do not have access to this address".to_string(),
            ),
            AppError::CannotDeleteDefault => (
                StatusCode::CONFLICT,
                "Cannot delete default address".to_string(),
            ),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

impl From<crate::storage::StoreError> for AppError {
    fn from(err: crate::storage::StoreError) -> Self {
        AppError::Unavailable(format!("Storage error: {}", err))
    }
}

impl From<crate::auth::password::HashError> for AppError {
    fn from(err: crate::auth::password::HashError) -> Self {
        AppError::Unavailable(format!("Password hashing error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StoreError;
    use axum::http::StatusCode;

    /// Extract status code and JSON body from an AppError response.
    async fn error_response(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        (status, json)
    }

    #[tokio::test]
    async fn test_unavailable_hides_details() {
        let (status, body) = error_response(AppError::Unavailable(
            "Redis connection refused at 10.0.0.5:6379".to_string(),
        ))
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "Service unavailable");
        assert!(!body["error"].as_str().unwrap().contains("Redis"));
        assert!(!body["error"].as_str().unwrap().contains("10.0.0.5"));
    }

    #[tokio::test]
    async fn test_expired_and_invalid_token_are_indistinguishable() {
        let expired = error_response(AppError::Expired).await;
        let forged = error_response(AppError::InvalidToken).await;
        assert_eq!(expired, forged);
        assert_eq!(expired.0, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_invalid_credentials() {
        let (status, body) = error_response(AppError::InvalidCredentials).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid credentials");
    }

    #[tokio::test]
    async fn test_ownership_and_invariant_statuses() {
        assert_eq!(
            error_response(AppError::Forbidden).await.0,
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            error_response(AppError::NotFound).await.0,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            error_response(AppError::CannotDeleteDefault).await.0,
            StatusCode::CONFLICT
        );
        assert_eq!(
            error_response(AppError::CsrfMismatch).await.0,
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            error_response(AppError::UserAlreadyExists).await.0,
            StatusCode::CONFLICT
        );
    }

    #[tokio::test]
    async fn test_bad_request() {
        let (status, body) =
            error_response(AppError::BadRequest("zip must be at least 4 characters".to_string()))
                .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "zip must be at least 4 characters");
    }

    #[test]
    fn test_from_store_error() {
        let redis_err = redis::RedisError::from((
            redis::ErrorKind::IoError,
            "test context",
            "connection refused".to_string(),
        ));
        let app_err = AppError::from(StoreError::from(redis_err));
        match app_err {
            AppError::Unavailable(msg) => assert!(msg.contains("Storage error")),
            _ => panic!("Expected Unavailable variant"),
        }
    }

    #[test]
    fn test_is_unauthenticated() {
        assert!(AppError::Expired.is_unauthenticated());
        assert!(AppError::InvalidToken.is_unauthenticated());
        assert!(!AppError::Forbidden.is_unauthenticated());
    }
}
