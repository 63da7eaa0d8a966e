//! Request, response and storage models.
//!
//! Storage models are the JSON documents kept in Redis. Request models are
//! normalized and validated in [`crate::validation`] before any core call.

use serde::{Deserialize, Serialize};

pub type UserId = i64;
pub type AddressId = i64;

// ============================================================================
// Identity Models
// ============================================================================

/// User record as stored. Carries the password hash; never serialized to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: u64,
    pub updated_at: u64,
}

/// User data handed to the directory for creation. The directory assigns
/// `id`, `created_at` and `updated_at`.
#[derive(Debug, Clone, Serialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// Verified identity as seen outside the auth core (no password hash).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub created_at: u64,
    pub updated_at: u64,
}

impl From<UserRecord> for Identity {
    fn from(record: UserRecord) -> Self {
        Identity {
            id: record.id,
            username: record.username,
            email: record.email,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Decoded session payload. Reconstructed from the token on every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub user_id: UserId,
    pub email: String,
    pub iat: u64,
    pub exp: u64,
}

// ============================================================================
// Address Models
// ============================================================================

/// Address as stored, owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedAddress {
    pub id: AddressId,
    pub owner_id: UserId,
    pub line1: String,
    pub line2: Option<String>,
    pub postal_code: String,
    pub city: String,
    pub country: String,
    pub is_default: bool,
    pub created_at: u64,
    pub updated_at: u64,
}

/// Caller-supplied address fields. Carries no owner: the owner always comes
/// from the verified session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressDraft {
    pub line1: String,
    pub line2: Option<String>,
    pub postal_code: String,
    pub city: String,
    pub country: String,
    pub is_default: bool,
}

/// Address handed to the store for insertion.
#[derive(Debug, Clone, Serialize)]
pub struct NewAddress {
    pub owner_id: UserId,
    pub line1: String,
    pub line2: Option<String>,
    pub postal_code: String,
    pub city: String,
    pub country: String,
    pub is_default: bool,
}

impl NewAddress {
    pub fn from_draft(owner_id: UserId, draft: AddressDraft) -> Self {
        NewAddress {
            owner_id,
            line1: draft.line1,
            line2: draft.line2,
            postal_code: draft.postal_code,
            city: draft.city,
            country: draft.country,
            is_default: draft.is_default,
        }
    }
}

impl OwnedAddress {
    /// Full-field replacement keeping identity, owner and creation time.
    pub fn replaced_with(&self, draft: AddressDraft) -> OwnedAddress {
        OwnedAddress {
            id: self.id,
            owner_id: self.owner_id,
            line1: draft.line1,
            line2: draft.line2,
            postal_code: draft.postal_code,
            city: draft.city,
            country: draft.country,
            is_default: draft.is_default,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

// ============================================================================
// Request / Response Models
// ============================================================================

/// Registration request.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(rename = "repeatedPassword", alias = "repeated_password")]
    pub repeated_password: String,
}

/// Login request.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Create / update address request.
#[derive(Debug, Deserialize)]
pub struct AddressRequest {
    #[serde(alias = "addr_1")]
    pub line1: String,
    #[serde(default, alias = "addr_2")]
    pub line2: Option<String>,
    #[serde(alias = "zip")]
    pub postal_code: String,
    pub city: String,
    pub country: String,
    #[serde(default, alias = "isdefault")]
    pub is_default: bool,
}

impl From<AddressRequest> for AddressDraft {
    fn from(req: AddressRequest) -> Self {
        AddressDraft {
            line1: req.line1,
            line2: req.line2,
            postal_code: req.postal_code,
            city: req.city,
            country: req.country,
            is_default: req.is_default,
        }
    }
}

/// Public user projection returned by register and login.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: UserInfo,
}

#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: UserId,
    pub username: String,
    pub email: String,
}

impl From<Identity> for UserResponse {
    fn from(identity: Identity) -> Self {
        UserResponse {
            user: UserInfo {
                id: identity.id,
                username: identity.username,
                email: identity.email,
            },
        }
    }
}
