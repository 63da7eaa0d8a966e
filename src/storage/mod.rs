//! Persistence boundary for users and addresses.
//!
//! The core only talks to [`UserDirectory`] and [`AddressStore`]. Two
//! implementations exist: Redis (`user`, `address`) for production and an
//! in-process one (`memory`) with the same semantics.

pub mod address;
pub mod memory;
pub mod user;

use crate::models::{AddressId, NewAddress, NewUser, OwnedAddress, UserId, UserRecord};
use async_trait::async_trait;
use std::time::{SystemTime, UNIX_EPOCH};

/// Storage failure.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A uniqueness constraint rejected the write.
    #[error("Conflict: {0}")]
    Conflict(String),
}

/// User identity records.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Look up a user by normalized email.
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Create a user, assigning id and timestamps atomically.
    ///
    /// Fails with [`StoreError::Conflict`] when the email is already taken.
    async fn create(&self, user: NewUser) -> Result<UserRecord, StoreError>;
}

/// Owned address records.
///
/// `insert` and `update_by_id` are atomic with respect to the single-default
/// rule: when the written record has `is_default = true`, every other address
/// of the same owner is demoted in the same step.
#[async_trait]
pub trait AddressStore: Send + Sync {
    /// Insert a new address, assigning id and timestamps.
    async fn insert(&self, address: NewAddress) -> Result<OwnedAddress, StoreError>;

    async fn get_by_id(&self, id: AddressId) -> Result<Option<OwnedAddress>, StoreError>;

    /// Replace all mutable fields of an existing address and bump `updated_at`.
    ///
    /// Returns `None` if the address no longer exists or changed owner.
    async fn update_by_id(
        &self,
        address: &OwnedAddress,
    ) -> Result<Option<OwnedAddress>, StoreError>;

    /// Returns true if a record was deleted.
    async fn delete_by_id(&self, id: AddressId) -> Result<bool, StoreError>;

    /// Set `is_default = false` on every address of `owner_id`.
    ///
    /// Returns the number of addresses that were demoted.
    async fn clear_default_for_owner(&self, owner_id: UserId) -> Result<u64, StoreError>;
}

/// Current Unix time in seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Redis connection helper shared by the Redis-backed stores.
pub(crate) async fn connect(
    client: &redis::Client,
) -> Result<redis::aio::MultiplexedConnection, StoreError> {
    Ok(client.get_multiplexed_async_connection().await?)
}
