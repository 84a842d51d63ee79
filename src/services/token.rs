//! Session token signing and device credential issuance.
//!
//! Two distinct credentials come out of here: the HS256 session token used
//! against this backend's own auth gate, and the keyed-digest "cursor token"
//! handed to the downstream client application. Both are keyed by the same
//! configured secret, which config validation guarantees is non-empty.

use hmac::{Hmac, Mac};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Token is invalid or expired")]
    Invalid,

    #[error("Failed to sign token: {0}")]
    Signing(String),
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// User id.
    sub: i32,
    iat: i64,
    exp: i64,
}

pub struct TokenService {
    secret: String,
    lifetime_days: i64,
}

impl TokenService {
    #[must_use]
    pub const fn new(secret: String, lifetime_days: i64) -> Self {
        Self {
            secret,
            lifetime_days,
        }
    }

    /// Signs a session token carrying only the subject id.
    pub fn sign_session(&self, user_id: i32) -> Result<String, TokenError> {
        let now = chrono::Utc::now();
        let claims = Claims {
            sub: user_id,
            iat: now.timestamp(),
            exp: (now + chrono::Duration::days(self.lifetime_days)).timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verifies signature and expiry, returning the subject id. The caller
    /// re-resolves the full user record on every request.
    pub fn verify_session(&self, token: &str) -> Result<i32, TokenError> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| TokenError::Invalid)?;

        Ok(data.claims.sub)
    }

    /// Deterministic keyed transform over `user:machine:issued_at`. Pure:
    /// identical inputs always produce the identical token, and re-issuance
    /// differs only because `issued_at_millis` moves.
    #[must_use]
    pub fn issue_cursor_token(
        &self,
        user_id: i32,
        machine_id: &str,
        issued_at_millis: i64,
    ) -> String {
        self.keyed_digest(&format!("{user_id}:{machine_id}:{issued_at_millis}"))
    }

    /// Account-level variant used by `/user/account`, keyed by the user id
    /// alone.
    #[must_use]
    pub fn issue_account_token(&self, user_id: i32) -> String {
        self.keyed_digest(&user_id.to_string())
    }

    fn keyed_digest(&self, payload: &str) -> String {
        // HMAC-SHA256 accepts keys of any length, so construction cannot
        // fail once the secret passed config validation.
        let mut mac = Hmac::<Sha256>::new_from_slice(self.secret.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}
