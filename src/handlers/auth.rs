use axum::{
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use garde::Validate;
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;

use crate::{
    crypto::token::ResetToken,
    error::{AppError, Result},
    models::{session::SessionClaims, user::UserProfile},
    services::auth as auth_service,
    state::AppState,
    validation::auth::{normalize_email, validate_payload},
};

/// The message returned for every forgot-password request.
const RESET_REQUESTED_MESSAGE: &str =
    "If an account with that email exists, a password reset link has been sent.";

/// The request payload for user registration.
#[derive(Deserialize, Validate)]
pub struct SignupRequest {
    #[serde(default)]
    #[garde(email)]
    pub email: String,
    #[serde(default)]
    #[garde(length(min = 8, max = 128))]
    pub password: String,
    #[serde(default)]
    #[garde(skip)]
    pub name: Option<String>,
}

/// The request payload for user login.
#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// The request payload for starting a password reset.
#[derive(Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    #[garde(email)]
    pub email: String,
}

/// The request payload for redeeming a reset token.
#[derive(Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    #[garde(length(min = 1))]
    pub token: String,
    #[serde(default)]
    #[garde(length(min = 8, max = 128))]
    pub password: String,
}

/// The request payload for changing a user's password.
#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(default)]
    #[garde(length(min = 1))]
    pub current_password: String,
    #[serde(default)]
    #[garde(length(min = 8, max = 128))]
    pub new_password: String,
}

/// The response payload for authentication-related requests.
#[derive(Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
}

impl AuthResponse {
    fn ok(message: &str) -> Json<Self> {
        Json(Self { success: true, message: message.to_string() })
    }
}

/// The response payload carrying a user.
#[derive(Serialize)]
pub struct UserResponse {
    pub user: UserProfile,
}

/// The response payload for a successful login.
#[derive(Serialize)]
pub struct LoginResponse {
    pub user: UserProfile,
    pub token: String,
}

/// Identity as seen from the session cookie alone.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub user_id: i32,
    pub email: String,
}

/// The response payload for the session probe.
#[derive(Serialize)]
pub struct SessionResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<SessionUser>,
}

/// Handles user registration.
#[axum::debug_handler]
pub async fn signup(
    State(state): State<AppState>,
    cookies: Cookies,
    payload: std::result::Result<Json<SignupRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(mut payload) = payload?;
    payload.email = normalize_email(&payload.email);
    validate_payload(&payload)?;

    let name = payload
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty());

    tracing::info!("📝 Signup attempt: {}", payload.email);
    let user = auth_service::create_user(&state, &payload.email, name, payload.password).await?;

    state.sessions.start(&cookies, user.id, &user.email)?;
    tracing::info!("✅ User registered: {}", user.id);

    let response = UserResponse { user: UserProfile::from(&user) };
    Ok((StatusCode::CREATED, Json(response)).into_response())
}

/// Handles user login.
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    payload: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(payload) = payload?;
    let email = normalize_email(&payload.email);

    if email.is_empty() || payload.password.is_empty() {
        return Err(AppError::Validation(
            "Email and password are required".to_string(),
        ));
    }

    tracing::info!("🔐 Login attempt: {}", email);
    let user = auth_service::authenticate_user(&state, &email, payload.password).await?;

    let token = state.sessions.start(&cookies, user.id, &user.email)?;
    tracing::info!("✅ User logged in: {}", user.id);

    let response = LoginResponse {
        user: UserProfile::from(&user),
        token: token.into_string(),
    };
    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Handles user logout.
pub async fn logout(
    State(state): State<AppState>,
    claims: Option<Extension<SessionClaims>>,
    cookies: Cookies,
) -> Response {
    state.sessions.end(&cookies);

    match claims {
        Some(Extension(claims)) => tracing::info!("👋 User logged out: {}", claims.user_id),
        None => tracing::debug!("👋 Logout without an active session"),
    }

    (StatusCode::OK, AuthResponse::ok("Logout successful")).into_response()
}

/// Reports whether the caller holds a valid session.
pub async fn session(State(state): State<AppState>, cookies: Cookies) -> Json<SessionResponse> {
    let user = state.sessions.read(&cookies).map(|claims| SessionUser {
        user_id: claims.user_id,
        email: claims.email,
    });

    Json(SessionResponse {
        authenticated: user.is_some(),
        user,
    })
}

/// Returns the signed-in user's profile.
pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
) -> Result<Json<UserResponse>> {
    let user = auth_service::current_user(&state, claims.user_id).await?;
    Ok(Json(UserResponse { user: UserProfile::from(&user) }))
}

/// Starts a password reset.
///
/// Answers the same way whether or not the email belongs to an account.
#[axum::debug_handler]
pub async fn forgot_password(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ForgotPasswordRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(mut payload) = payload?;
    payload.email = normalize_email(&payload.email);
    validate_payload(&payload)?;

    auth_service::request_password_reset(&state, &payload.email).await?;

    Ok((StatusCode::OK, AuthResponse::ok(RESET_REQUESTED_MESSAGE)).into_response())
}

/// Redeems a reset token.
#[axum::debug_handler]
pub async fn reset_password(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ResetPasswordRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(payload) = payload?;
    validate_payload(&payload)?;

    let token = ResetToken::from_client(payload.token.trim());
    auth_service::reset_password(&state, &token, payload.password).await?;

    Ok((StatusCode::OK, AuthResponse::ok("Password has been reset")).into_response())
}

/// Handles changing a user's password.
#[axum::debug_handler]
pub async fn change_password(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    payload: std::result::Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(payload) = payload?;
    validate_payload(&payload)?;

    auth_service::change_password(
        &state,
        claims.user_id,
        payload.current_password,
        payload.new_password,
    )
    .await?;

    Ok((StatusCode::OK, AuthResponse::ok("Password changed successfully")).into_response())
}
