//! Registration and credential verification.

use super::password::CredentialHasher;
use crate::error::AppError;
use crate::models::{Identity, NewUser};
use crate::storage::{StoreError, UserDirectory};
use crate::validation::normalize_email;
use std::sync::Arc;
use tokio::sync::OnceCell;
use zeroize::Zeroizing;

/// Verifies credentials against a [`UserDirectory`].
///
/// Holds no per-user state. The dummy hash is computed once, on the first
/// login for an unknown email.
pub struct AuthService {
    users: Arc<dyn UserDirectory>,
    hasher: CredentialHasher,
    dummy_hash: OnceCell<String>,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserDirectory>, hasher: CredentialHasher) -> Self {
        Self {
            users,
            hasher,
            dummy_hash: OnceCell::new(),
        }
    }

    /// Create a new identity.
    ///
    /// The email is normalized before the uniqueness check. A collision found
    /// by the directory's own atomic check (email or username) is reported the
    /// same way as one found by the lookup.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<Identity, AppError> {
        let email = normalize_email(email);

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AppError::UserAlreadyExists);
        }

        let password_hash = self
            .hasher
            .hash_blocking(Zeroizing::new(password.to_string()))
            .await?;

        let record = self
            .users
            .create(NewUser {
                username: username.to_string(),
                email,
                password_hash,
            })
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => AppError::UserAlreadyExists,
                other => other.into(),
            })?;

        Ok(record.into())
    }

    /// Verify an email/password pair.
    ///
    /// Unknown email and wrong password both return `InvalidCredentials`.
    pub async fn login(&self, email: &str, password: &str) -> Result<Identity, AppError> {
        let email = normalize_email(email);
        let plaintext = Zeroizing::new(password.to_string());

        let record = match self.users.find_by_email(&email).await? {
            Some(record) => record,
            None => {
                self.burn_verification(plaintext).await;
                return Err(AppError::InvalidCredentials);
            }
        };

        if !self
            .hasher
            .verify_blocking(record.password_hash.clone(), plaintext)
            .await
        {
            return Err(AppError::InvalidCredentials);
        }

        Ok(record.into())
    }

    /// One verification against a throwaway hash, so an unknown email costs
    /// as much time as a wrong password.
    async fn burn_verification(&self, plaintext: Zeroizing<String>) {
        let dummy = self
            .dummy_hash
            .get_or_try_init(|| {
                self.hasher
                    .hash_blocking(Zeroizing::new("postbox-dummy-password".to_string()))
            })
            .await;

        match dummy {
            Ok(hash) => {
                self.hasher.verify_blocking(hash.clone(), plaintext).await;
            }
            Err(e) => tracing::warn!(error = %e, "Dummy hash unavailable"),
        }
    }
}
