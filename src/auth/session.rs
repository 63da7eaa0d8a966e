//! Signed session tokens.
//!
//! Tokens use the JWT compact form: `base64url(header).base64url(claims).base64url(mac)`
//! with an HMAC-SHA256 over the first two segments. Nothing is stored server-side;
//! the claims are rebuilt from the token on every request.

use crate::error::AppError;
use crate::models::{Identity, SessionClaims, UserId};
use crate::storage::unix_now;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use zeroize::Zeroizing;

type HmacSha256 = Hmac<Sha256>;

/// Session lifetime: expiry is always issue time plus this.
pub const SESSION_TTL_SECS: u64 = 24 * 60 * 60;

const HEADER_JSON: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

#[derive(Deserialize)]
struct TokenHeader {
    alg: String,
}

/// Mints and parses session tokens with a process-wide secret.
pub struct SessionIssuer {
    key: Zeroizing<Vec<u8>>,
}

impl SessionIssuer {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            key: Zeroizing::new(secret.to_vec()),
        }
    }

    fn mac(&self) -> Result<HmacSha256, hmac::digest::InvalidLength> {
        HmacSha256::new_from_slice(&self.key)
    }

    /// Issue a token for `identity`, valid for [`SESSION_TTL_SECS`] from now.
    pub fn issue(&self, identity: &Identity) -> Result<String, AppError> {
        self.issue_at(identity.id, &identity.email, unix_now())
    }

    /// Issue a token as if the current time were `now`.
    pub fn issue_at(&self, user_id: UserId, email: &str, now: u64) -> Result<String, AppError> {
        let claims = SessionClaims {
            user_id,
            email: email.to_string(),
            iat: now,
            exp: now + SESSION_TTL_SECS,
        };

        let header = URL_SAFE_NO_PAD.encode(HEADER_JSON);
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).map_err(|e| {
            AppError::Unavailable(format!("Claims serialization failed: {}", e))
        })?);
        let signing_input = format!("{}.{}", header, payload);

        let mut mac = self
            .mac()
            .map_err(|e| AppError::Unavailable(format!("Invalid session key: {}", e)))?;
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{}.{}", signing_input, signature))
    }

    /// Verify signature and expiry of a token.
    ///
    /// * `InvalidToken` on malformed structure, wrong algorithm, bad signature
    ///   or missing claims
    /// * `Expired` when the current time is past `exp`
    pub fn parse(&self, token: &str) -> Result<SessionClaims, AppError> {
        self.parse_at(token, unix_now())
    }

    /// Parse a token as if the current time were `now`.
    pub fn parse_at(&self, token: &str, now: u64) -> Result<SessionClaims, AppError> {
        let mut parts = token.split('.');
        let (encoded_header, payload, signature) =
            match (parts.next(), parts.next(), parts.next()) {
                (Some(h), Some(p), Some(s)) if parts.next().is_none() => (h, p, s),
                _ => return Err(AppError::InvalidToken),
            };

        // Only HS256 is accepted; anything else (including "none") is rejected
        let header_bytes = URL_SAFE_NO_PAD
            .decode(encoded_header)
            .map_err(|_| AppError::InvalidToken)?;
        let header: TokenHeader =
            serde_json::from_slice(&header_bytes).map_err(|_| AppError::InvalidToken)?;
        if header.alg != "HS256" {
            return Err(AppError::InvalidToken);
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| AppError::InvalidToken)?;
        let mut mac = self.mac().map_err(|_| AppError::InvalidToken)?;
        mac.update(format!("{}.{}", encoded_header, payload).as_bytes());
        // verify_slice compares in constant time
        mac.verify_slice(&signature)
            .map_err(|_| AppError::InvalidToken)?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| AppError::InvalidToken)?;
        let claims: SessionClaims =
            serde_json::from_slice(&payload).map_err(|_| AppError::InvalidToken)?;

        if now > claims.exp {
            return Err(AppError::Expired);
        }

        Ok(claims)
    }
}
