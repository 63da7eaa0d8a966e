//! Owner-scoped address operations.
//!
//! Every call takes the caller's id from the verified session. Existence is
//! checked before ownership, so a non-owner sees `Forbidden` and a missing id
//! `NotFound`.

use crate::error::AppError;
use crate::models::{AddressDraft, AddressId, NewAddress, OwnedAddress, UserId};
use crate::storage::AddressStore;
use std::sync::Arc;

/// Enforces ownership and the single-default rules on top of an [`AddressStore`].
pub struct AddressAuthorizer {
    store: Arc<dyn AddressStore>,
}

impl AddressAuthorizer {
    pub fn new(store: Arc<dyn AddressStore>) -> Self {
        Self { store }
    }

    /// Fetch and check ownership.
    async fn owned(&self, owner_id: UserId, id: AddressId) -> Result<OwnedAddress, AppError> {
        let address = self.store.get_by_id(id).await?.ok_or(AppError::NotFound)?;

        if address.owner_id != owner_id {
            tracing::warn!(
                action = "address_access_denied",
                user_id = %owner_id,
                address_id = %id,
                "Address owned by another user"
            );
            return Err(AppError::Forbidden);
        }

        Ok(address)
    }

    /// Create an address for `owner_id`. A default address demotes the
    /// owner's previous default in the same store write.
    pub async fn create(
        &self,
        owner_id: UserId,
        draft: AddressDraft,
    ) -> Result<OwnedAddress, AppError> {
        let address = self
            .store
            .insert(NewAddress::from_draft(owner_id, draft))
            .await?;

        tracing::info!(
            action = "address_created",
            user_id = %owner_id,
            address_id = %address.id,
            is_default = address.is_default,
            "Address created"
        );

        Ok(address)
    }

    pub async fn get(&self, owner_id: UserId, id: AddressId) -> Result<OwnedAddress, AppError> {
        self.owned(owner_id, id).await
    }

    /// Replace every caller-editable field of an address.
    pub async fn update(
        &self,
        owner_id: UserId,
        id: AddressId,
        draft: AddressDraft,
    ) -> Result<OwnedAddress, AppError> {
        let existing = self.owned(owner_id, id).await?;

        // None here means the address was deleted between fetch and write
        let address = self
            .store
            .update_by_id(&existing.replaced_with(draft))
            .await?
            .ok_or(AppError::NotFound)?;

        tracing::info!(
            action = "address_updated",
            user_id = %owner_id,
            address_id = %id,
            is_default = address.is_default,
            "Address updated"
        );

        Ok(address)
    }

    /// Delete an address. The default address cannot be deleted; it has to
    /// be demoted first.
    pub async fn delete(&self, owner_id: UserId, id: AddressId) -> Result<(), AppError> {
        let existing = self.owned(owner_id, id).await?;

        if existing.is_default {
            return Err(AppError::CannotDeleteDefault);
        }

        if !self.store.delete_by_id(id).await? {
            return Err(AppError::NotFound);
        }

        tracing::info!(
            action = "address_deleted",
            user_id = %owner_id,
            address_id = %id,
            "Address deleted"
        );

        Ok(())
    }
}
