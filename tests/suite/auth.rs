//! Login, logout and the `auth-token` cookie

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use opticontrol_context::SessionStore;
use opticontrol_types::{ChatMessage, StoredSession, UserId};
use serde_json::json;

use crate::common::{DEMO_EMAIL, DEMO_PASSWORD, spawn_app, spawn_app_with};

#[tokio::test]
async fn login_returns_user_and_sets_cookie() {
    let app = spawn_app().await;
    let response = app
        .post_json(
            "/api/auth",
            None,
            &json!({ "email": DEMO_EMAIL, "password": DEMO_PASSWORD }),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["id"], "user-001");
    assert_eq!(body["user"]["email"], DEMO_EMAIL);
    assert_eq!(body["user"]["name"], "Alex");
    assert!(body["user"].get("password").is_none());

    let cookie = response
        .set_cookies()
        .into_iter()
        .find(|c| c.starts_with("auth-token="))
        .expect("auth cookie");
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
    assert!(cookie.contains("Path=/"));
    assert!(cookie.contains("Max-Age=604800"));
    assert!(!cookie.contains("Secure"));
}

#[tokio::test]
async fn production_cookie_is_secure() {
    let app = spawn_app_with(true).await;
    let response = app
        .post_json(
            "/api/auth",
            None,
            &json!({ "email": DEMO_EMAIL, "password": DEMO_PASSWORD }),
        )
        .await;
    assert!(
        response
            .set_cookies()
            .iter()
            .any(|c| c.starts_with("auth-token=") && c.contains("Secure"))
    );
}

#[tokio::test]
async fn wrong_credentials_are_rejected() {
    let app = spawn_app().await;
    for body in [
        json!({ "email": DEMO_EMAIL, "password": "wrong" }),
        json!({ "email": "nobody@opticontrol.ai", "password": DEMO_PASSWORD }),
        json!({ "email": DEMO_EMAIL }),
        json!({}),
    ] {
        let response = app.post_json("/api/auth", None, &body).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED, "{body}");
        assert_eq!(response.json(), json!({ "error": "Invalid credentials" }));
        assert!(response.set_cookies().is_empty());
    }
}

#[tokio::test]
async fn malformed_login_body_is_a_bad_request() {
    let app = spawn_app().await;
    for (content_type, raw) in [
        ("application/json", "{ not json"),
        ("application/json", "\"just a string\""),
        ("text/plain", "email=demo"),
    ] {
        let request = Request::post("/api/auth")
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(raw))
            .expect("request");
        let response = app.call(request).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{raw}");
        assert_eq!(response.json(), json!({ "error": "Malformed login request" }));
        assert!(response.set_cookies().is_empty());
    }
}

#[tokio::test]
async fn me_requires_a_valid_cookie() {
    let app = spawn_app().await;

    let missing = app.get("/api/auth/me", None).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
    assert_eq!(missing.json()["error"], "Unauthorized");

    let forged = app.get("/api/auth/me", Some("auth-token=forged.token.value")).await;
    assert_eq!(forged.status, StatusCode::UNAUTHORIZED);
    assert_eq!(forged.json()["error"], "Invalid token");

    let cookie = app.login_demo().await;
    let me = app.get("/api/auth/me", Some(&cookie)).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.json()["user"]["name"], "Alex");
}

#[tokio::test]
async fn logout_clears_cookie_and_session() {
    let app = spawn_app().await;
    let cookie = app.login_demo().await;

    let user = UserId::new("user-001");
    let mut session = StoredSession::new(user.clone());
    session.push(ChatMessage::assistant("Hi", 1));
    app.store.save(&session).expect("seed session");

    let response = app.post_empty("/api/auth/logout", Some(&cookie)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json(), json!({ "success": true }));

    let cleared = response
        .set_cookies()
        .into_iter()
        .find(|c| c.starts_with("auth-token="))
        .expect("removal cookie");
    assert!(cleared.starts_with("auth-token=;"));
    assert!(cleared.contains("Max-Age=0"));
    assert!(app.store.load(&user).expect("load").is_none());
}

#[tokio::test]
async fn logout_without_cookie_still_succeeds() {
    let app = spawn_app().await;
    let response = app.post_empty("/api/auth/logout", None).await;
    assert_eq!(response.status, StatusCode::OK);
}
