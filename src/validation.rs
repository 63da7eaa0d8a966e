//! Structural validation of request bodies.
//!
//! Each `validate_*` function normalizes its request (trim, lowercase email)
//! and rejects malformed input with `AppError::BadRequest` naming the field.
//! Passwords are never trimmed.

use crate::error::AppError;
use crate::models::{AddressDraft, AddressRequest, LoginRequest, RegisterRequest};

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 30;
const PASSWORD_MIN: usize = 8;
const EMAIL_MAX: usize = 254;
const LINE1_MIN: usize = 5;
const POSTAL_CODE_MIN: usize = 4;

/// Canonical email form used for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Minimal well-formedness: one `@` with a non-empty local part and a dotted
/// domain, no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    if email.is_empty() || email.len() > EMAIL_MAX || email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

fn bad_request(msg: &str) -> AppError {
    AppError::BadRequest(msg.to_string())
}

pub fn validate_register(req: RegisterRequest) -> Result<RegisterRequest, AppError> {
    let username = req.username.trim().to_string();
    let email = normalize_email(&req.email);

    let username_len = username.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&username_len) {
        return Err(bad_request("username must be 3-30 characters"));
    }
    if !is_valid_email(&email) {
        return Err(bad_request("email is invalid"));
    }
    if req.password.chars().count() < PASSWORD_MIN {
        return Err(bad_request("password must be at least 8 characters"));
    }
    if req.password != req.repeated_password {
        return Err(bad_request("repeatedPassword must match password"));
    }

    Ok(RegisterRequest {
        username,
        email,
        ..req
    })
}

pub fn validate_login(req: LoginRequest) -> Result<LoginRequest, AppError> {
    let email = normalize_email(&req.email);
    if !is_valid_email(&email) {
        return Err(bad_request("email is invalid"));
    }
    if req.password.is_empty() {
        return Err(bad_request("password is required"));
    }
    Ok(LoginRequest { email, ..req })
}

/// Normalize an address request into a draft. An empty `line2` becomes `None`.
pub fn validate_address(req: AddressRequest) -> Result<AddressDraft, AppError> {
    let draft = AddressDraft {
        line1: req.line1.trim().to_string(),
        line2: req
            .line2
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty()),
        postal_code: req.postal_code.trim().to_string(),
        city: req.city.trim().to_string(),
        country: req.country.trim().to_string(),
        is_default: req.is_default,
    };

    if draft.line1.chars().count() < LINE1_MIN {
        return Err(bad_request("line1 must be at least 5 characters"));
    }
    if draft.postal_code.chars().count() < POSTAL_CODE_MIN {
        return Err(bad_request("postal_code must be at least 4 characters"));
    }
    if draft.city.is_empty() {
        return Err(bad_request("city is required"));
    }
    if draft.country.is_empty() {
        return Err(bad_request("country is required"));
    }

    Ok(draft)
}
