//! Address API endpoints. The owner is always the session's user.

use super::{address_id, json_body};
use crate::auth::middleware::{AppState, AuthSession};
use crate::error::AppError;
use crate::models::{AddressId, AddressRequest};
use crate::validation::validate_address;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};

/// POST /api/v1/users/address/add — Create an address
pub async fn create_address(
    session: AuthSession,
    State(state): State<AppState>,
    payload: Result<Json<AddressRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let draft = validate_address(json_body(payload)?)?;
    let address = state.addresses.create(session.user_id, draft).await?;
    Ok((StatusCode::CREATED, Json(address)))
}

/// GET /api/v1/users/address/{id} — Fetch one of the caller's addresses
pub async fn get_address(
    session: AuthSession,
    State(state): State<AppState>,
    id: Result<Path<AddressId>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let id = address_id(id)?;
    let address = state.addresses.get(session.user_id, id).await?;
    Ok(Json(address))
}

/// PATCH /api/v1/users/address/{id} — Replace an address
pub async fn update_address(
    session: AuthSession,
    State(state): State<AppState>,
    id: Result<Path<AddressId>, PathRejection>,
    payload: Result<Json<AddressRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let id = address_id(id)?;
    let draft = validate_address(json_body(payload)?)?;
    let address = state.addresses.update(session.user_id, id, draft).await?;
    Ok(Json(address))
}

/// DELETE /api/v1/users/address/{id} — Delete a non-default address
pub async fn delete_address(
    session: AuthSession,
    State(state): State<AppState>,
    id: Result<Path<AddressId>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let id = address_id(id)?;
    state.addresses.delete(session.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
