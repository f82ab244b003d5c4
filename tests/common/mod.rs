//! Shared test utilities and fixtures
//!
//! Every test gets its own router, in-memory session store and mock
//! workflow engine.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use opticontrol_config::default_users;
use opticontrol_context::MemorySessionStore;
use opticontrol_core::{TokenSigner, UserDirectory};
use opticontrol_providers::WebhookClient;
use opticontrol_server::{AppState, build_router};
use serde_json::{Value, json};
use tower::ServiceExt;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const SECRET: &[u8] = b"opticontrol-dev-secret-32chars!!";
pub const WEEK: Duration = Duration::from_secs(7 * 24 * 3600);
pub const WEBHOOK_PATH: &str = "/webhook/opticontrol/chat";

pub const DEMO_EMAIL: &str = "demo@opticontrol.ai";
pub const DEMO_PASSWORD: &str = "demo1234";

pub const ROADMAP_REPLY: &str = "Welcome aboard! Here is where we start.\n\n```json_roadmap\n{\"industry\": \"e-commerce\", \"steps\": [\n  {\"id\": 1, \"title\": \"Discovery\", \"description\": \"Tell Opti about your business\", \"status\": \"completed\"},\n  {\"id\": 2, \"title\": \"Quick win\", \"description\": \"Automate order confirmations\", \"status\": \"in_progress\"},\n  {\"id\": 3, \"title\": \"Scale\", \"description\": \"Connect inventory\", \"status\": \"locked\"}\n]}\n```";

/// Request helpers around a router.
pub struct TestClient {
    pub router: Router,
}

pub struct TestApp {
    pub client: TestClient,
    pub store: Arc<MemorySessionStore>,
    pub engine: MockServer,
}

impl std::ops::Deref for TestApp {
    type Target = TestClient;

    fn deref(&self) -> &TestClient {
        &self.client
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body is JSON")
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.body.clone()).expect("response body is UTF-8")
    }

    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }

    pub fn set_cookies(&self) -> Vec<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect()
    }

    /// `name=value` pair of the `auth-token` cookie, ready for a `Cookie` header.
    pub fn auth_cookie(&self) -> String {
        self.set_cookies()
            .into_iter()
            .find(|c| c.starts_with("auth-token="))
            .and_then(|c| c.split(';').next().map(str::to_string))
            .expect("auth-token cookie")
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(false).await
}

pub async fn spawn_app_with(secure_cookies: bool) -> TestApp {
    let engine = MockServer::start().await;
    let url = Url::parse(&format!("{}{WEBHOOK_PATH}", engine.uri())).expect("url");
    let client = WebhookClient::new(url, Duration::from_secs(5)).expect("client");

    let store = Arc::new(MemorySessionStore::new());
    let state = AppState::new(
        UserDirectory::from_config(&default_users()),
        TokenSigner::new(SECRET, WEEK),
        Arc::new(client),
        store.clone(),
        secure_cookies,
    );

    TestApp {
        client: TestClient {
            router: build_router(Arc::new(state)),
        },
        store,
        engine,
    }
}

/// Answer every webhook call with `body`.
pub async fn mount_engine_reply(server: &MockServer, body: Value) {
    Mock::given(method("POST"))
        .and(path(WEBHOOK_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

pub async fn mount_engine_failure(server: &MockServer, status: u16) {
    Mock::given(method("POST"))
        .and(path(WEBHOOK_PATH))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

impl TestClient {
    pub async fn call(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes()
            .to_vec();
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> TestResponse {
        let mut builder = Request::get(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.call(builder.body(Body::empty()).expect("request")).await
    }

    pub async fn post_json(&self, uri: &str, cookie: Option<&str>, body: &Value) -> TestResponse {
        let mut builder = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.call(builder.body(Body::from(body.to_string())).expect("request"))
            .await
    }

    pub async fn post_empty(&self, uri: &str, cookie: Option<&str>) -> TestResponse {
        let mut builder = Request::post(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.call(builder.body(Body::empty()).expect("request")).await
    }

    pub async fn delete(&self, uri: &str, cookie: Option<&str>) -> TestResponse {
        let mut builder = Request::delete(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.call(builder.body(Body::empty()).expect("request")).await
    }

    /// Log in as the demo user and return the cookie header value.
    pub async fn login_demo(&self) -> String {
        let response = self
            .post_json(
                "/api/auth",
                None,
                &json!({ "email": DEMO_EMAIL, "password": DEMO_PASSWORD }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK);
        response.auth_cookie()
    }
}
