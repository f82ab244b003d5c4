//! Route table and handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::cookie::CookieJar;
use opticontrol_core::ChatOutcome;
use opticontrol_types::{ChatMessage, RoadmapProgress, SessionId, StoredSession, User};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::assets;
use crate::auth::{AuthUser, cleared_cookie, current_user, session_cookie};
use crate::error::ApiError;
use crate::state::SharedState;

pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(login_page))
        .route("/dashboard", get(dashboard_page))
        .route("/healthz", get(healthz))
        .route("/api/auth", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
        .route("/api/chat", post(chat_proxy))
        .route("/api/session", get(get_session).delete(reset_session))
        .route("/api/session/init", post(init_session))
        .route("/api/session/messages", post(send_message))
        .with_state(state)
}

// ============================================================================
// Pages
// ============================================================================

async fn login_page(State(state): State<SharedState>, jar: CookieJar) -> Response {
    if current_user(&jar, &state).is_some() {
        return Redirect::temporary("/dashboard").into_response();
    }
    Html(assets::LOGIN_HTML).into_response()
}

async fn dashboard_page(State(state): State<SharedState>, jar: CookieJar) -> Response {
    if current_user(&jar, &state).is_none() {
        return Redirect::temporary("/").into_response();
    }
    Html(assets::DASHBOARD_HTML).into_response()
}

async fn healthz() -> &'static str {
    "ok"
}

// ============================================================================
// Auth
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LoginRequest {
    email: String,
    password: String,
}

const MALFORMED_LOGIN: &str = "Malformed login request";

#[derive(Debug, Serialize)]
struct LoginResponse {
    success: bool,
    user: User,
}

async fn login(
    State(state): State<SharedState>,
    jar: CookieJar,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<LoginResponse>), ApiError> {
    let Json(request) = body.map_err(|_| ApiError::BadRequest(MALFORMED_LOGIN))?;
    let Some(user) = state.users.authenticate(&request.email, &request.password) else {
        tracing::info!(email = %request.email, "Login rejected");
        return Err(ApiError::InvalidCredentials);
    };

    let token = state.signer.sign(&user)?;
    let cookie = session_cookie(token, state.signer.ttl(), state.secure_cookies);
    tracing::info!(user_id = %user.id, "Login succeeded");
    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            success: true,
            user,
        }),
    ))
}

async fn logout(State(state): State<SharedState>, jar: CookieJar) -> (CookieJar, Json<Value>) {
    if let Some(user) = current_user(&jar, &state)
        && let Err(e) = state.chat.reset(&user.id)
    {
        tracing::warn!(user_id = %user.id, "Failed to clear session on logout: {e}");
    }
    (jar.remove(cleared_cookie()), Json(json!({ "success": true })))
}

async fn me(AuthUser(user): AuthUser) -> Json<Value> {
    Json(json!({ "user": user }))
}

// ============================================================================
// Chat proxy
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ChatRequest {
    message: Option<String>,
    session_id: Option<String>,
}

const MISSING_CHAT_FIELDS: &str = "Missing message or sessionId";

async fn chat_proxy(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = body.map_err(|_| ApiError::BadRequest(MISSING_CHAT_FIELDS))?;
    let message = request.message.filter(|m| !m.is_empty());
    let session_id = request.session_id.filter(|s| !s.is_empty());
    let (Some(message), Some(session_id)) = (message, session_id) else {
        return Err(ApiError::BadRequest(MISSING_CHAT_FIELDS));
    };

    tracing::debug!(user_id = %user.id, session_id = %session_id, "Relaying chat message");
    let output = state
        .chat
        .relay(&message, SessionId::new(session_id))
        .await
        .map_err(|e| ApiError::Upstream(e.to_string()))?;
    Ok(Json(json!({ "output": output })))
}

// ============================================================================
// Server-side session
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionView {
    session: StoredSession,
    progress: Option<RoadmapProgress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    unsent: Option<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    notice: Option<ChatMessage>,
    roadmap_updated: bool,
}

impl SessionView {
    fn stored(session: StoredSession) -> Self {
        Self::from(ChatOutcome {
            session,
            unsent: None,
            notice: None,
            roadmap_updated: false,
        })
    }
}

impl From<ChatOutcome> for SessionView {
    fn from(outcome: ChatOutcome) -> Self {
        Self {
            progress: outcome.session.roadmap.as_ref().map(|r| r.progress()),
            session: outcome.session,
            unsent: outcome.unsent,
            notice: outcome.notice,
            roadmap_updated: outcome.roadmap_updated,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SendRequest {
    message: String,
}

async fn get_session(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
) -> Result<Json<SessionView>, ApiError> {
    let session = state.chat.session(&user.id)?;
    Ok(Json(SessionView::stored(session)))
}

async fn init_session(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
) -> Result<Json<SessionView>, ApiError> {
    let outcome = state.chat.initialize(&user.id).await?;
    Ok(Json(outcome.into()))
}

async fn send_message(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    body: Result<Json<SendRequest>, JsonRejection>,
) -> Result<Json<SessionView>, ApiError> {
    let Json(request) = body.map_err(|_| ApiError::BadRequest("Missing message"))?;
    let outcome = state.chat.send(&user.id, &request.message).await?;
    Ok(Json(outcome.into()))
}

async fn reset_session(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Value>, ApiError> {
    state.chat.reset(&user.id)?;
    Ok(Json(json!({ "success": true })))
}
