use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tower_cookies::Cookies;

use crate::{
    crypto::token::TokenService,
    error::AppError,
    models::session::SessionClaims,
    services::session::SESSION_COOKIE,
    state::AppState,
};

/// The login page unauthenticated visitors are sent to.
pub const LOGIN_PATH: &str = "/login";

/// How a rule matches a request path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathPattern {
    /// The path equals the pattern.
    Exact(String),
    /// The path equals the pattern or continues it with a `/` segment.
    Prefix(String),
}

impl PathPattern {
    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::Exact(pattern) => path == pattern,
            PathPattern::Prefix(pattern) => match path.strip_prefix(pattern.as_str()) {
                Some(rest) => rest.is_empty() || rest.starts_with('/') || pattern.ends_with('/'),
                None => false,
            },
        }
    }
}

/// What kind of route a path is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteClass {
    PublicApi,
    ProtectedApi,
    Root,
    AuthOnlyPage,
    PublicPage,
    ProtectedPage,
}

/// A single `(pattern, classification)` entry.
#[derive(Clone, Debug)]
pub struct RouteRule {
    pub pattern: PathPattern,
    pub class: RouteClass,
}

impl RouteRule {
    fn exact(path: &str, class: RouteClass) -> Self {
        Self { pattern: PathPattern::Exact(path.to_string()), class }
    }

    fn prefix(path: &str, class: RouteClass) -> Self {
        Self { pattern: PathPattern::Prefix(path.to_string()), class }
    }
}

/// Ordered route classification. The first matching rule wins; unmatched
/// paths are protected pages.
#[derive(Clone, Debug)]
pub struct RouteTable {
    rules: Vec<RouteRule>,
    landing_path: String,
}

impl RouteTable {
    /// Creates a table from explicit rules.
    pub fn new(rules: Vec<RouteRule>, landing_path: impl Into<String>) -> Self {
        Self { rules, landing_path: landing_path.into() }
    }

    /// The application's table.
    ///
    /// Public API routes come before the `/api` catch-all, and `/` is
    /// classified before any page rule.
    pub fn standard(landing_path: &str) -> Self {
        use RouteClass::*;

        let mut rules = vec![
            RouteRule::prefix("/api/auth/login", PublicApi),
            RouteRule::prefix("/api/auth/signup", PublicApi),
            RouteRule::prefix("/api/auth/logout", PublicApi),
            RouteRule::prefix("/api/auth/session", PublicApi),
            RouteRule::prefix("/api/auth/forgot-password", PublicApi),
            RouteRule::prefix("/api/auth/reset-password", PublicApi),
            RouteRule::prefix("/api", ProtectedApi),
            RouteRule::exact("/", Root),
        ];
        rules.extend(
            ["/login", "/signup", "/forgot-password", "/reset-password"]
                .into_iter()
                .map(|page| RouteRule::prefix(page, AuthOnlyPage)),
        );
        rules.push(RouteRule::prefix("/assets", PublicPage));
        rules.push(RouteRule::exact("/favicon.ico", PublicPage));

        Self::new(rules, landing_path)
    }

    pub fn landing_path(&self) -> &str {
        &self.landing_path
    }

    /// Classifies a request path.
    pub fn classify(&self, path: &str) -> RouteClass {
        self.rules
            .iter()
            .find(|rule| rule.pattern.matches(path))
            .map(|rule| rule.class)
            .unwrap_or(RouteClass::ProtectedPage)
    }
}

/// The gate's decision for one request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GateOutcome {
    /// Pass the request on, with the session claims when there is a valid one.
    Allow(Option<SessionClaims>),
    /// Send the browser elsewhere.
    Redirect(String),
    /// Refuse with 401.
    Reject,
}

fn login_redirect_from(path: &str) -> String {
    let from = urlencoding::encode(path).replace("%2F", "/");
    format!("{}?from={}", LOGIN_PATH, from)
}

/// Decides what happens to a request.
///
/// A pure function of the path, the session cookie value and the route table.
/// An invalid cookie counts as no session.
pub fn evaluate(
    path: &str,
    cookie: Option<&str>,
    tokens: &TokenService,
    routes: &RouteTable,
) -> GateOutcome {
    let claims = cookie.and_then(|token| tokens.verify(token));
    let authenticated = claims.is_some();

    match routes.classify(path) {
        RouteClass::PublicApi | RouteClass::PublicPage => GateOutcome::Allow(claims),
        RouteClass::ProtectedApi if authenticated => GateOutcome::Allow(claims),
        RouteClass::ProtectedApi => GateOutcome::Reject,
        RouteClass::Root if authenticated => GateOutcome::Redirect(routes.landing_path().to_string()),
        RouteClass::Root => GateOutcome::Redirect(LOGIN_PATH.to_string()),
        RouteClass::AuthOnlyPage if authenticated => {
            GateOutcome::Redirect(routes.landing_path().to_string())
        }
        RouteClass::AuthOnlyPage => GateOutcome::Allow(None),
        RouteClass::ProtectedPage if authenticated => GateOutcome::Allow(claims),
        RouteClass::ProtectedPage => GateOutcome::Redirect(login_redirect_from(path)),
    }
}

/// A middleware that applies [`evaluate`] to every request.
///
/// On allow with a valid session the claims are placed in the request
/// extensions for handlers.
pub async fn access_gate(
    State(state): State<AppState>,
    cookies: Cookies,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let cookie = cookies.get(SESSION_COOKIE).map(|c| c.value().to_string());

    match evaluate(&path, cookie.as_deref(), state.sessions.tokens(), &state.routes) {
        GateOutcome::Allow(claims) => {
            if let Some(claims) = claims {
                tracing::debug!("✅ {} allowed for user: {}", path, claims.user_id);
                request.extensions_mut().insert(claims);
            }
            next.run(request).await
        }
        GateOutcome::Redirect(location) => {
            tracing::debug!("↪️  {} redirected to {}", path, location);
            Redirect::temporary(&location).into_response()
        }
        GateOutcome::Reject => {
            tracing::debug!("❌ {} rejected: no valid session", path);
            AppError::Unauthorized.into_response()
        }
    }
}
