use chrono::{DateTime, Utc};
use deadpool_postgres::Pool;
use tokio_postgres::Row;

use crate::{
    error::{AppError, Result},
    models::reset_token::PasswordResetToken,
};

fn row_to_token(row: &Row) -> Result<PasswordResetToken> {
    Ok(PasswordResetToken {
        user_id: row.try_get("user_id").map_err(|_| AppError::MissingData("user_id".to_string()))?,
        token_hash: row.try_get("token_hash").map_err(|_| AppError::MissingData("token_hash".to_string()))?,
        expires_at: row.try_get("expires_at").map_err(|_| AppError::MissingData("expires_at".to_string()))?,
        created_at: row.try_get("created_at").map_err(|_| AppError::MissingData("created_at".to_string()))?,
    })
}

/// Replaces any outstanding reset tokens of a user with a new one.
pub async fn replace_for_user(
    pool: &Pool,
    user_id: i32,
    token_hash: &str,
    expires_at: DateTime<Utc>,
) -> Result<PasswordResetToken> {
    let mut client = pool.get().await?;
    let tx = client.transaction().await?;

    tx.execute(
        "DELETE FROM password_reset_tokens WHERE user_id = $1",
        &[&user_id],
    )
    .await?;

    let row = tx
        .query_one(
            r#"
            INSERT INTO password_reset_tokens (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            RETURNING user_id, token_hash, expires_at, created_at
            "#,
            &[&user_id, &token_hash, &expires_at],
        )
        .await?;

    tx.commit().await?;
    row_to_token(&row)
}

/// Consumes a reset token.
///
/// The row is deleted in the same statement that checks it, so a token can
/// be redeemed at most once. Returns `None` for unknown or expired tokens.
pub async fn consume(pool: &Pool, token_hash: &str) -> Result<Option<PasswordResetToken>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            DELETE FROM password_reset_tokens
            WHERE token_hash = $1 AND expires_at > NOW()
            RETURNING user_id, token_hash, expires_at, created_at
            "#,
            &[&token_hash],
        )
        .await?;
    row.map(|r| row_to_token(&r)).transpose()
}

/// Deletes all expired reset tokens.
pub async fn purge_expired(pool: &Pool) -> Result<u64> {
    let client = pool.get().await?;
    let deleted = client
        .execute(
            "DELETE FROM password_reset_tokens WHERE expires_at <= NOW()",
            &[],
        )
        .await?;
    Ok(deleted)
}
