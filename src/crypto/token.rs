use std::fmt;

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

use crate::error::{AppError, Result};
use crate::models::session::SessionClaims;

/// Issuer written into and required from every session token.
pub const TOKEN_ISSUER: &str = "kharji";
/// Audience written into and required from every session token.
pub const TOKEN_AUDIENCE: &str = "kharji-users";
/// The size of a reset token in bytes.
const RESET_TOKEN_SIZE: usize = 32;

/// A signed session token as it travels in the `auth_token` cookie.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken([hidden])")
    }
}

/// An opaque single-use password reset token.
///
/// Only [`ResetToken::digest`] is ever persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct ResetToken(String);

impl ResetToken {
    /// Generates a new random reset token, hex encoded.
    pub fn generate() -> Self {
        let mut bytes = [0u8; RESET_TOKEN_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Wraps a token received from a client.
    pub fn from_client(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// SHA-256 of the token, hex encoded. This is the storage key.
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(self.0.as_bytes()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ResetToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ResetToken([hidden])")
    }
}

/// Issues and verifies HS256 session tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    lifetime: Duration,
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("keys", &"[hidden]")
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

impl TokenService {
    /// Creates a new `TokenService`.
    ///
    /// # Arguments
    ///
    /// * `secret` - The HMAC signing secret.
    /// * `lifetime` - How long an issued token stays valid.
    pub fn new(secret: &[u8], lifetime: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            lifetime,
        }
    }

    /// The validity window of issued tokens.
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Issues a signed session token for a user.
    pub fn issue(&self, user_id: i32, email: &str) -> Result<SessionToken> {
        let now = Utc::now();
        let claims = SessionClaims {
            user_id,
            email: email.to_string(),
            iss: TOKEN_ISSUER.to_string(),
            aud: TOKEN_AUDIENCE.to_string(),
            iat: now.timestamp(),
            exp: (now + self.lifetime).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map(SessionToken)
            .map_err(|e| AppError::Internal(format!("Token signing failed: {}", e)))
    }

    /// Verifies a token's signature, issuer, audience and expiry.
    ///
    /// # Returns
    ///
    /// The decoded claims, or `None` for any invalid token.
    pub fn verify(&self, token: &str) -> Option<SessionClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[TOKEN_ISSUER]);
        validation.set_audience(&[TOKEN_AUDIENCE]);
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);
        validation.leeway = 0;

        match decode::<SessionClaims>(token, &self.decoding_key, &validation) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                tracing::debug!("Session token rejected: {:?}", e.kind());
                None
            }
        }
    }
}
