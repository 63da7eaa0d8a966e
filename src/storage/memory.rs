//! In-process stores with the same contracts as the Redis ones.
//!
//! Each store keeps its whole state behind one mutex, so every trait call is
//! a single atomic step, including the demote-then-write of default addresses.

use super::{unix_now, AddressStore, StoreError, UserDirectory};
use crate::models::{AddressId, NewAddress, NewUser, OwnedAddress, UserId, UserRecord};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

#[derive(Default)]
struct Users {
    next_id: UserId,
    by_id: HashMap<UserId, UserRecord>,
    by_email: HashMap<String, UserId>,
    by_username: HashMap<String, UserId>,
}

/// In-memory [`UserDirectory`].
#[derive(Default)]
pub struct MemoryUserDirectory {
    inner: Mutex<Users>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let users = self.inner.lock().await;
        Ok(users
            .by_email
            .get(email)
            .and_then(|id| users.by_id.get(id))
            .cloned())
    }

    async fn create(&self, user: NewUser) -> Result<UserRecord, StoreError> {
        let mut users = self.inner.lock().await;
        if users.by_email.contains_key(&user.email) {
            return Err(StoreError::Conflict(format!(
                "email '{}' is already registered",
                user.email
            )));
        }
        if users.by_username.contains_key(&user.username) {
            return Err(StoreError::Conflict(format!(
                "username '{}' is taken",
                user.username
            )));
        }

        users.next_id += 1;
        let now = unix_now();
        let record = UserRecord {
            id: users.next_id,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            created_at: now,
            updated_at: now,
        };
        users.by_email.insert(record.email.clone(), record.id);
        users.by_username.insert(record.username.clone(), record.id);
        users.by_id.insert(record.id, record.clone());
        Ok(record)
    }
}

#[derive(Default)]
struct Addresses {
    next_id: AddressId,
    by_id: HashMap<AddressId, OwnedAddress>,
}

impl Addresses {
    fn demote_others(&mut self, owner_id: UserId, keep: Option<AddressId>, now: u64) -> u64 {
        let mut demoted = 0;
        for address in self.by_id.values_mut() {
            if address.owner_id == owner_id && address.is_default && Some(address.id) != keep {
                address.is_default = false;
                address.updated_at = now;
                demoted += 1;
            }
        }
        demoted
    }
}

/// In-memory [`AddressStore`].
#[derive(Default)]
pub struct MemoryAddressStore {
    inner: Mutex<Addresses>,
}

impl MemoryAddressStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AddressStore for MemoryAddressStore {
    async fn insert(&self, address: NewAddress) -> Result<OwnedAddress, StoreError> {
        let mut addresses = self.inner.lock().await;
        let now = unix_now();
        if address.is_default {
            addresses.demote_others(address.owner_id, None, now);
        }

        addresses.next_id += 1;
        let stored = OwnedAddress {
            id: addresses.next_id,
            owner_id: address.owner_id,
            line1: address.line1,
            line2: address.line2,
            postal_code: address.postal_code,
            city: address.city,
            country: address.country,
            is_default: address.is_default,
            created_at: now,
            updated_at: now,
        };
        addresses.by_id.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get_by_id(&self, id: AddressId) -> Result<Option<OwnedAddress>, StoreError> {
        Ok(self.inner.lock().await.by_id.get(&id).cloned())
    }

    async fn update_by_id(
        &self,
        address: &OwnedAddress,
    ) -> Result<Option<OwnedAddress>, StoreError> {
        let mut addresses = self.inner.lock().await;
        let created_at = match addresses.by_id.get(&address.id) {
            Some(existing) if existing.owner_id == address.owner_id => existing.created_at,
            _ => return Ok(None),
        };

        let now = unix_now();
        if address.is_default {
            addresses.demote_others(address.owner_id, Some(address.id), now);
        }

        let stored = OwnedAddress {
            created_at,
            updated_at: now,
            ..address.clone()
        };
        addresses.by_id.insert(stored.id, stored.clone());
        Ok(Some(stored))
    }

    async fn delete_by_id(&self, id: AddressId) -> Result<bool, StoreError> {
        Ok(self.inner.lock().await.by_id.remove(&id).is_some())
    }

    async fn clear_default_for_owner(&self, owner_id: UserId) -> Result<u64, StoreError> {
        let mut addresses = self.inner.lock().await;
        Ok(addresses.demote_others(owner_id, None, unix_now()))
    }
}
