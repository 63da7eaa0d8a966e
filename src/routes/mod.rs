//! API route handlers.

pub mod address;
pub mod auth;

use crate::auth::middleware::{csrf_protect, require_session, AppState};
use crate::error::AppError;
use crate::models::AddressId;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path,
    },
    middleware,
    routing::{get, post},
    Json, Router,
};

/// Unwrap a JSON body, turning any rejection into a 400 with a fixed message.
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload.map(|Json(value)| value).map_err(|e| {
        tracing::debug!(error = %e, "Rejected request body");
        AppError::BadRequest("Invalid request payload".to_string())
    })
}

/// Unwrap a numeric address id from the path.
pub fn address_id(id: Result<Path<AddressId>, PathRejection>) -> Result<AddressId, AppError> {
    id.map(|Path(id)| id)
        .map_err(|_| AppError::BadRequest("Invalid address ID".to_string()))
}

/// Build the API router with all endpoints.
///
/// Routes under `/api/v1` need a session cookie, and a CSRF token on unsafe
/// methods. The session check runs first.
pub fn api_router(state: &AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/api/register", post(auth::register))
        .route("/api/login", post(auth::login));

    let protected = Router::new()
        .route("/api/v1/logout", post(auth::logout))
        .route("/api/v1/users/address/add", post(address::create_address))
        .route(
            "/api/v1/users/address/{id}",
            get(address::get_address)
                .patch(address::update_address)
                .delete(address::delete_address),
        )
        .route_layer(middleware::from_fn(csrf_protect))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    public.merge(protected)
}
