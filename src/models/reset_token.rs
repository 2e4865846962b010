use chrono::{DateTime, Utc};

/// A persisted password reset token.
///
/// Only the SHA-256 digest of the token is stored; the plaintext goes to the
/// delivery channel and nowhere else.
#[derive(Debug, Clone)]
pub struct PasswordResetToken {
    pub user_id: i32,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
