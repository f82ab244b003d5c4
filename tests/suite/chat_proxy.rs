//! `POST /api/chat`: authenticated raw relay to the workflow engine

use axum::http::StatusCode;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{
    ROADMAP_REPLY, WEBHOOK_PATH, mount_engine_failure, mount_engine_reply, spawn_app,
};

#[tokio::test]
async fn relays_message_and_returns_output() {
    let app = spawn_app().await;
    Mock::given(method("POST"))
        .and(path(WEBHOOK_PATH))
        .and(body_json(json!({ "chatInput": "hello", "sessionId": "browser-1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "output": ROADMAP_REPLY })))
        .expect(1)
        .mount(&app.engine)
        .await;

    let cookie = app.login_demo().await;
    let response = app
        .post_json(
            "/api/chat",
            Some(&cookie),
            &json!({ "message": "hello", "sessionId": "browser-1" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json(), json!({ "output": ROADMAP_REPLY }));
}

#[tokio::test]
async fn text_and_message_fields_are_accepted() {
    let app = spawn_app().await;
    mount_engine_reply(&app.engine, json!({ "text": "from a text node" })).await;

    let cookie = app.login_demo().await;
    let response = app
        .post_json(
            "/api/chat",
            Some(&cookie),
            &json!({ "message": "hi", "sessionId": "s" }),
        )
        .await;
    assert_eq!(response.json()["output"], "from a text node");
}

#[tokio::test]
async fn missing_cookie_is_unauthorized() {
    let app = spawn_app().await;
    let response = app
        .post_json("/api/chat", None, &json!({ "message": "hi", "sessionId": "s" }))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.json(), json!({ "error": "Unauthorized" }));
}

#[tokio::test]
async fn bad_token_is_rejected() {
    let app = spawn_app().await;
    let response = app
        .post_json(
            "/api/chat",
            Some("auth-token=eyJhbGciOiJIUzI1NiJ9.e30.bad"),
            &json!({ "message": "hi", "sessionId": "s" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.json(), json!({ "error": "Invalid token" }));
}

#[tokio::test]
async fn missing_fields_are_a_bad_request() {
    let app = spawn_app().await;
    let cookie = app.login_demo().await;

    for body in [
        json!({ "message": "hi" }),
        json!({ "sessionId": "s" }),
        json!({ "message": "", "sessionId": "s" }),
        json!({ "message": "hi", "sessionId": "" }),
        json!("not an object"),
    ] {
        let response = app.post_json("/api/chat", Some(&cookie), &body).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(
            response.json(),
            json!({ "error": "Missing message or sessionId" })
        );
    }
    assert!(app.engine.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn engine_failure_is_a_bad_gateway() {
    let app = spawn_app().await;
    mount_engine_failure(&app.engine, 500).await;

    let cookie = app.login_demo().await;
    let response = app
        .post_json(
            "/api/chat",
            Some(&cookie),
            &json!({ "message": "hi", "sessionId": "s" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    assert_eq!(
        response.json(),
        json!({ "error": "n8n responded with status 500" })
    );
}
