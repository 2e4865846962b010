use chrono::{Duration, Utc};

use crate::crypto::password::{hash_password, verify_password};
use crate::crypto::token::ResetToken;
use crate::error::{AppError, Result};
use crate::models::user::User;
use crate::repositories::{reset_token as reset_repo, user as user_repo};
use crate::state::AppState;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// A well-formed stored hash no password matches. Unknown emails are checked
/// against it so they cost the same key derivation as a wrong password.
const DUMMY_PASSWORD_HASH: &str = "4284235ba46eb9c6ad1c7cd7ddb21164:\
    4c9a732832b995377bd85a6478dca351ecc42782423d222e78167368cf31eaea\
    4db78a0afa4e18e2f748db0d3962e5f3712bfb2afbd7ae524b5e2207f0027559";

/// Hashes a password on the blocking pool.
async fn hash_blocking(password: String) -> Result<String> {
    Ok(tokio::task::spawn_blocking(move || hash_password(&password)).await?)
}

/// Verifies a password on the blocking pool.
async fn verify_blocking(password: String, stored: String) -> Result<bool> {
    Ok(tokio::task::spawn_blocking(move || verify_password(&password, &stored)).await?)
}

/// Creates a new user.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `email` - The normalized email address.
/// * `name` - Optional display name.
/// * `password` - The plaintext password.
///
/// # Returns
///
/// A `Result` containing the created `User`.
pub async fn create_user(
    state: &AppState,
    email: &str,
    name: Option<&str>,
    password: String,
) -> Result<User> {
    tracing::debug!("🔐 Creating user: {}", email);

    if user_repo::find_by_email(&state.db, email).await?.is_some() {
        return Err(AppError::Conflict(
            "An account with this email already exists".to_string(),
        ));
    }

    let password_hash = hash_blocking(password).await?;
    let user = user_repo::create_user(&state.db, email, name, &password_hash).await?;

    tracing::info!("✅ User created with ID: {}", user.id);
    Ok(user)
}

/// Authenticates a user by email and password.
///
/// Unknown emails and wrong passwords produce the same error.
pub async fn authenticate_user(state: &AppState, email: &str, password: String) -> Result<User> {
    tracing::debug!("🔐 Authenticating user: {}", email);

    let Some(user) = user_repo::find_by_email(&state.db, email).await? else {
        verify_blocking(password, DUMMY_PASSWORD_HASH.to_string()).await?;
        return Err(AppError::Authentication(INVALID_CREDENTIALS.to_string()));
    };

    if !verify_blocking(password, user.password_hash.clone()).await? {
        return Err(AppError::Authentication(INVALID_CREDENTIALS.to_string()));
    }

    tracing::info!("✅ User authenticated: {}", user.id);
    Ok(user)
}

/// Loads the user behind a session.
pub async fn current_user(state: &AppState, user_id: i32) -> Result<User> {
    user_repo::find_by_id(&state.db, user_id)
        .await?
        .ok_or(AppError::NotFound)
}

/// Issues a reset token for `email` if such an account exists.
///
/// Succeeds silently for unknown emails so callers cannot probe for accounts.
pub async fn request_password_reset(state: &AppState, email: &str) -> Result<()> {
    let Some(user) = user_repo::find_by_email(&state.db, email).await? else {
        tracing::debug!("Password reset requested for unknown email");
        return Ok(());
    };

    let token = ResetToken::generate();
    let expires_at = Utc::now() + Duration::minutes(state.config.reset_token_ttl_minutes);
    reset_repo::replace_for_user(&state.db, user.id, &token.digest(), expires_at).await?;

    state.reset_delivery.deliver(&user.email, &token).await?;

    tracing::info!("🔑 Password reset token issued for user: {}", user.id);
    Ok(())
}

/// Redeems a reset token and sets a new password.
pub async fn reset_password(state: &AppState, token: &ResetToken, new_password: String) -> Result<()> {
    let record = reset_repo::consume(&state.db, &token.digest())
        .await?
        .ok_or_else(|| AppError::Validation("Invalid or expired reset token".to_string()))?;

    let password_hash = hash_blocking(new_password).await?;
    user_repo::update_password(&state.db, record.user_id, &password_hash).await?;

    tracing::info!("✅ Password reset for user: {}", record.user_id);
    Ok(())
}

/// Changes a user's password.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `user_id` - The ID of the user.
/// * `current_password` - The user's current password.
/// * `new_password` - The user's new password.
pub async fn change_password(
    state: &AppState,
    user_id: i32,
    current_password: String,
    new_password: String,
) -> Result<()> {
    tracing::info!("🔑 Changing password for user: {}", user_id);

    let user = current_user(state, user_id).await?;

    if !verify_blocking(current_password, user.password_hash.clone()).await? {
        return Err(AppError::Authentication(
            "Invalid current password".to_string(),
        ));
    }

    let password_hash = hash_blocking(new_password).await?;
    user_repo::update_password(&state.db, user_id, &password_hash).await?;

    tracing::info!("✅ Password changed for user: {}", user_id);
    Ok(())
}
