mod common;

use axum::http::{StatusCode, header};
use common::*;

#[tokio::test]
async fn protected_api_without_cookie_is_unauthorized() {
    let app = app(test_state());

    let response = send(&app, "GET", "/api/expenses", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
    assert_eq!(json_body(response).await, serde_json::json!({ "error": "Unauthorized" }));
}

#[tokio::test]
async fn protected_api_with_forged_cookie_is_unauthorized() {
    let app = app(test_state());

    let response = send(&app, "GET", "/api/auth/me", Some("auth_token=forged")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn public_api_passes_without_cookie() {
    let app = app(test_state());

    // Reaches the login handler, which rejects the empty body itself.
    let response = send(&app, "POST", "/api/auth/login", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await["error"].is_string());
}

#[tokio::test]
async fn root_redirects_by_session() {
    let state = test_state();
    let cookie = session_cookie(&state, 5, "reza@example.com");
    let app = app(state);

    let response = send(&app, "GET", "/", Some(&cookie)).await;
    assert!(is_redirect(response.status()));
    assert_eq!(location(&response), "/overview");

    let response = send(&app, "GET", "/", None).await;
    assert!(is_redirect(response.status()));
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn login_page_redirects_signed_in_user() {
    let state = test_state();
    let cookie = session_cookie(&state, 5, "reza@example.com");
    let app = app(state);

    let response = send(&app, "GET", "/login", Some(&cookie)).await;
    assert!(is_redirect(response.status()));
    assert_eq!(location(&response), "/overview");
}

#[tokio::test]
async fn protected_page_redirects_with_origin() {
    let app = app(test_state());

    let response = send(&app, "GET", "/transactions", None).await;
    assert!(is_redirect(response.status()));
    assert_eq!(location(&response), "/login?from=/transactions");

    let response = send(&app, "GET", "/reports/monthly%20view", None).await;
    assert!(is_redirect(response.status()));
    assert_eq!(location(&response), "/login?from=/reports/monthly%2520view");
}

#[tokio::test]
async fn protected_page_passes_with_session() {
    let state = test_state();
    let cookie = session_cookie(&state, 5, "reza@example.com");
    let app = app(state);

    let response = send(&app, "GET", "/transactions", Some(&cookie)).await;
    assert!(!is_redirect(response.status()));
    assert_ne!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_api_route_is_json_404_when_signed_in() {
    let state = test_state();
    let cookie = session_cookie(&state, 5, "reza@example.com");
    let app = app(state);

    let response = send(&app, "GET", "/api/nothing-here", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["error"], "Resource not found");
}

#[tokio::test]
async fn session_probe_reports_identity() {
    let state = test_state();
    let cookie = session_cookie(&state, 5, "reza@example.com");
    let app = app(state);

    let response = send(&app, "GET", "/api/auth/session", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["authenticated"], true);
    assert_eq!(body["user"]["userId"], 5);
    assert_eq!(body["user"]["email"], "reza@example.com");

    let response = send(&app, "GET", "/api/auth/session", None).await;
    assert_eq!(json_body(response).await, serde_json::json!({ "authenticated": false }));
}

#[tokio::test]
async fn session_probe_clears_stale_cookie() {
    let app = app(test_state());

    let response = send(&app, "GET", "/api/auth/session", Some("auth_token=stale")).await;
    let cleared = set_cookies(&response);
    assert!(cleared.iter().any(|c| c.starts_with("auth_token=") && c.contains("Max-Age=0")));
    assert_eq!(json_body(response).await["authenticated"], false);
}

#[tokio::test]
async fn logout_clears_cookie() {
    let state = test_state();
    let cookie = session_cookie(&state, 5, "reza@example.com");
    let app = app(state);

    let response = send(&app, "POST", "/api/auth/logout", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let cleared = set_cookies(&response);
    assert!(cleared.iter().any(|c| c.starts_with("auth_token=") && c.contains("Max-Age=0")));
    assert_eq!(json_body(response).await["message"], "Logout successful");
}

#[tokio::test]
async fn invalid_forgot_password_payload_is_rejected() {
    let app = app(test_state());

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/api/auth/forgot-password")
        .header(header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(r#"{"email":"not-an-email"}"#))
        .unwrap();
    let response = tower::ServiceExt::oneshot(app, request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await["error"].as_str().unwrap().starts_with("email"));
}
