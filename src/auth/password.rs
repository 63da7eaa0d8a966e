//! Password hashing and verification (Argon2id, PHC string format).
//!
//! The PHC output embeds the algorithm, parameters and a per-call random
//! salt, so verification needs nothing but the stored string.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use zeroize::Zeroizing;

/// Password hashing failure.
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    #[error("Hashing failed: {0}")]
    Hashing(String),

    #[error("Hashing task failed: {0}")]
    Task(String),
}

/// One-way password hasher.
///
/// Hashing is deliberately slow. The `*_blocking` variants move the work to
/// tokio's blocking pool so request tasks are never stalled behind it.
#[derive(Clone)]
pub struct CredentialHasher {
    params: Params,
}

impl Default for CredentialHasher {
    /// Argon2id with the library's default (OWASP-recommended) cost.
    fn default() -> Self {
        Self {
            params: Params::default(),
        }
    }
}

impl CredentialHasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hasher with explicit cost parameters.
    pub fn with_params(params: Params) -> Self {
        Self { params }
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a plaintext password with a fresh random salt.
    pub fn hash(&self, plaintext: &str) -> Result<String, HashError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| HashError::Hashing(e.to_string()))?;
        Ok(hash.to_string())
    }

    /// Verify a plaintext password against a stored hash.
    ///
    /// Returns false both for a wrong password and for a malformed hash;
    /// callers cannot tell the two apart.
    pub fn verify(&self, hash: &str, plaintext: &str) -> bool {
        let parsed = match PasswordHash::new(hash) {
            Ok(h) => h,
            Err(_) => return false,
        };
        // Constant-time comparison is built into password-hash
        self.argon2()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }

    /// [`hash`](Self::hash) on the blocking pool. The plaintext is zeroized
    /// once hashed.
    pub async fn hash_blocking(&self, plaintext: Zeroizing<String>) -> Result<String, HashError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&plaintext))
            .await
            .map_err(|e| HashError::Task(e.to_string()))?
    }

    /// [`verify`](Self::verify) on the blocking pool. A failed task counts as
    /// a failed verification.
    pub async fn verify_blocking(&self, hash: String, plaintext: Zeroizing<String>) -> bool {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&hash, &plaintext))
            .await
            .unwrap_or(false)
    }
}
