use serde::{Deserialize, Serialize};

/// The claims carried by a signed session token.
///
/// Serialized as `{userId, email, iss, aud, iat, exp}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
    /// The ID of the user this session belongs to.
    pub user_id: i32,
    /// The user's email at the time the session was issued.
    pub email: String,
    /// Issuer.
    pub iss: String,
    /// Audience.
    pub aud: String,
    /// Issued at, seconds since the epoch.
    pub iat: i64,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
}
