use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use opticontrol_core::{AuthError, ChatError};
use serde_json::json;

/// API failure rendered as `{ "error": "<message>" }`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("{0}")]
    BadRequest(&'static str),
    #[error("A message is already being processed")]
    Busy,
    #[error("{0}")]
    Upstream(String),
    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized | Self::InvalidToken | Self::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Busy => StatusCode::CONFLICT,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::EmptyMessage => Self::BadRequest("Message is empty"),
            ChatError::Busy => Self::Busy,
            ChatError::Store(e) => {
                tracing::error!("Session store failure: {e}");
                Self::Internal
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Sign(e) => {
                tracing::error!("Token signing failed: {e}");
                Self::Internal
            }
            AuthError::Expired | AuthError::Invalid(_) => Self::InvalidToken,
        }
    }
}
