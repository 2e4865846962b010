use deadpool_postgres::Pool;
use tokio_postgres::{Row, error::SqlState};
use crate::{
    error::{AppError, Result},
    models::user::User,
};

const USER_COLUMNS: &str = "id, email, name, password_hash, created_at, updated_at";

/// A helper function to map a `tokio_postgres::Row` to a `User`.
fn row_to_user(row: &Row) -> Result<User> {
    Ok(User {
        id: row.try_get("id").map_err(|_| AppError::MissingData("id".to_string()))?,
        email: row.try_get("email").map_err(|_| AppError::MissingData("email".to_string()))?,
        name: row.try_get("name").map_err(|_| AppError::MissingData("name".to_string()))?,
        password_hash: row.try_get("password_hash").map_err(|_| AppError::MissingData("password_hash".to_string()))?,
        created_at: row.try_get("created_at").map_err(|_| AppError::MissingData("created_at".to_string()))?,
        updated_at: row.try_get("updated_at").map_err(|_| AppError::MissingData("updated_at".to_string()))?,
    })
}

/// Creates a new user in the database.
///
/// Returns `AppError::Conflict` when the email is already registered.
pub async fn create_user(
    pool: &Pool,
    email: &str,
    name: Option<&str>,
    password_hash: &str,
) -> Result<User> {
    let client = pool.get().await?;
    let query = format!(
        "INSERT INTO users (email, name, password_hash) VALUES ($1, $2, $3) RETURNING {USER_COLUMNS}"
    );
    let row = client
        .query_one(query.as_str(), &[&email, &name, &password_hash])
        .await
        .map_err(|e| {
            if e.code() == Some(&SqlState::UNIQUE_VIOLATION) {
                AppError::Conflict("An account with this email already exists".to_string())
            } else {
                AppError::Database(e)
            }
        })?;
    row_to_user(&row)
}

/// Finds a user by their email address, ignoring case.
pub async fn find_by_email(pool: &Pool, email: &str) -> Result<Option<User>> {
    let client = pool.get().await?;
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)");
    let row = client.query_opt(query.as_str(), &[&email]).await?;
    row.map(|r| row_to_user(&r)).transpose()
}

/// Finds a user by their ID.
pub async fn find_by_id(pool: &Pool, user_id: i32) -> Result<Option<User>> {
    let client = pool.get().await?;
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
    let row = client.query_opt(query.as_str(), &[&user_id]).await?;
    row.map(|r| row_to_user(&r)).transpose()
}

/// Updates a user's password hash.
pub async fn update_password(pool: &Pool, user_id: i32, password_hash: &str) -> Result<()> {
    let client = pool.get().await?;
    let updated = client
        .execute(
            r#"
            UPDATE users
            SET password_hash = $1, updated_at = NOW()
            WHERE id = $2
            "#,
            &[&password_hash, &user_id],
        )
        .await?;

    if updated == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}
