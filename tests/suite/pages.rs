//! Page routing and the login/dashboard redirects

use axum::http::StatusCode;

use crate::common::spawn_app;

#[tokio::test]
async fn anonymous_visitor_sees_login_page() {
    let app = spawn_app().await;
    let response = app.get("/", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.text().contains("id=\"login\""));
}

#[tokio::test]
async fn dashboard_redirects_anonymous_visitor_home() {
    let app = spawn_app().await;
    let response = app.get("/dashboard", None).await;
    assert_eq!(response.status, StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(response.location(), Some("/"));
}

#[tokio::test]
async fn dashboard_redirects_on_invalid_token() {
    let app = spawn_app().await;
    let response = app.get("/dashboard", Some("auth-token=garbage")).await;
    assert_eq!(response.status, StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(response.location(), Some("/"));
}

#[tokio::test]
async fn signed_in_user_skips_login_page() {
    let app = spawn_app().await;
    let cookie = app.login_demo().await;

    let home = app.get("/", Some(&cookie)).await;
    assert_eq!(home.status, StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(home.location(), Some("/dashboard"));

    let dashboard = app.get("/dashboard", Some(&cookie)).await;
    assert_eq!(dashboard.status, StatusCode::OK);
    assert!(dashboard.text().contains("id=\"roadmap\""));
}

#[tokio::test]
async fn healthz_is_public() {
    let app = spawn_app().await;
    let response = app.get("/healthz", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.text(), "ok");
}
