use tower_cookies::cookie::SameSite;
use tower_cookies::cookie::time::Duration;
use tower_cookies::{Cookie, Cookies};

use crate::crypto::token::{SessionToken, TokenService};
use crate::error::Result;
use crate::models::session::SessionClaims;

/// The cookie holding the session token.
pub const SESSION_COOKIE: &str = "auth_token";

/// Keeps the session token in an HTTP-only cookie.
#[derive(Clone, Debug)]
pub struct SessionManager {
    tokens: TokenService,
    secure: bool,
}

impl SessionManager {
    /// Creates a new `SessionManager`.
    ///
    /// # Arguments
    ///
    /// * `tokens` - Issues and verifies the cookie's token.
    /// * `secure` - Whether cookies carry the `Secure` flag (production).
    pub fn new(tokens: TokenService, secure: bool) -> Self {
        Self { tokens, secure }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    fn session_cookie(&self, value: String) -> Cookie<'static> {
        let mut cookie = Cookie::new(SESSION_COOKIE, value);
        cookie.set_http_only(true);
        cookie.set_same_site(SameSite::Lax);
        cookie.set_path("/");
        cookie.set_max_age(Duration::seconds(self.tokens.lifetime().num_seconds()));
        if self.secure {
            cookie.set_secure(true);
        }
        cookie
    }

    /// Starts a session: issues a token and stores it in the cookie.
    ///
    /// # Returns
    ///
    /// The issued token, for embedding in the response body.
    pub fn start(&self, cookies: &Cookies, user_id: i32, email: &str) -> Result<SessionToken> {
        let token = self.tokens.issue(user_id, email)?;
        cookies.add(self.session_cookie(token.as_str().to_string()));
        tracing::debug!("🔑 Session cookie set for user: {}", user_id);
        Ok(token)
    }

    /// Reads the current session.
    ///
    /// A cookie holding an invalid token is cleared and reported as no session.
    pub fn read(&self, cookies: &Cookies) -> Option<SessionClaims> {
        let value = cookies.get(SESSION_COOKIE)?.value().to_string();

        match self.tokens.verify(&value) {
            Some(claims) => Some(claims),
            None => {
                tracing::debug!("Clearing invalid session cookie");
                self.end(cookies);
                None
            }
        }
    }

    /// Ends the session by removing the cookie.
    pub fn end(&self, cookies: &Cookies) {
        let mut cookie = Cookie::new(SESSION_COOKIE, "");
        cookie.set_path("/");
        cookie.set_max_age(Duration::seconds(0));
        cookies.remove(cookie);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, http::{Request, Response, header}, routing::get};
    use http_body_util::BodyExt;
    use tower::ServiceExt;
    use tower_cookies::CookieManagerLayer;

    fn manager(secure: bool) -> SessionManager {
        SessionManager::new(
            TokenService::new(b"session-secret-session-secret-12", chrono::Duration::days(30)),
            secure,
        )
    }

    fn router(sessions: SessionManager) -> Router {
        let starter = sessions.clone();
        let reader = sessions.clone();
        let ender = sessions;

        Router::new()
            .route(
                "/start",
                get(move |cookies: Cookies| async move {
                    starter.start(&cookies, 3, "ali@example.com").unwrap().into_string()
                }),
            )
            .route(
                "/read",
                get(move |cookies: Cookies| async move {
                    reader
                        .read(&cookies)
                        .map(|claims| format!("{}:{}", claims.user_id, claims.email))
                        .unwrap_or_else(|| "none".to_string())
                }),
            )
            .route(
                "/end",
                get(move |cookies: Cookies| async move {
                    ender.end(&cookies);
                    "ended"
                }),
            )
            .layer(CookieManagerLayer::new())
    }

    async fn call(app: &Router, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut request = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        app.clone().oneshot(request.body(Body::empty()).unwrap()).await.unwrap()
    }

    fn set_cookie(response: &Response<Body>) -> String {
        response
            .headers()
            .get(header::SET_COOKIE)
            .map(|value| value.to_str().unwrap().to_string())
            .unwrap_or_default()
    }

    async fn text(response: Response<Body>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn start_sets_scoped_http_only_cookie() {
        let app = router(manager(false));

        let response = call(&app, "/start", None).await;
        let cookie = set_cookie(&response);
        let token = text(response).await;

        assert!(cookie.starts_with(&format!("auth_token={}", token)));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("Max-Age=2592000"));
        assert!(!cookie.contains("Secure"));
    }

    #[tokio::test]
    async fn production_cookie_is_secure() {
        let app = router(manager(true));
        let response = call(&app, "/start", None).await;
        assert!(set_cookie(&response).contains("Secure"));
    }

    #[tokio::test]
    async fn read_returns_claims_of_started_session() {
        let sessions = manager(false);
        let token = sessions.tokens().issue(3, "ali@example.com").unwrap();
        let app = router(sessions);

        let cookie = format!("{}={}", SESSION_COOKIE, token.as_str());
        let response = call(&app, "/read", Some(&cookie)).await;
        assert!(set_cookie(&response).is_empty());
        assert_eq!(text(response).await, "3:ali@example.com");
    }

    #[tokio::test]
    async fn read_without_cookie_is_none() {
        let app = router(manager(false));
        let response = call(&app, "/read", None).await;
        assert!(set_cookie(&response).is_empty());
        assert_eq!(text(response).await, "none");
    }

    #[tokio::test]
    async fn read_clears_invalid_cookie() {
        let app = router(manager(false));

        let response = call(&app, "/read", Some("auth_token=forged.token.value")).await;
        let cookie = set_cookie(&response);
        assert!(cookie.starts_with("auth_token=;"));
        assert!(cookie.contains("Max-Age=0"));
        assert_eq!(text(response).await, "none");
    }

    #[tokio::test]
    async fn end_removes_cookie() {
        let sessions = manager(false);
        let token = sessions.tokens().issue(3, "ali@example.com").unwrap();
        let app = router(sessions);

        let cookie = format!("{}={}", SESSION_COOKIE, token.as_str());
        let response = call(&app, "/end", Some(&cookie)).await;
        let cleared = set_cookie(&response);
        assert!(cleared.starts_with("auth_token=;"));
        assert!(cleared.contains("Max-Age=0"));
        assert!(cleared.contains("Path=/"));
    }
}
