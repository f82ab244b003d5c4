//! Client for the external AI-automation workflow engine.
//!
//! The engine is an n8n workflow exposed through a Chat Trigger webhook. One
//! user message is one `POST` carrying [`ChatPayload`]; the reply is a JSON
//! object whose text lives in `output` (AI Agent with `responseMode:
//! "lastNode"`), or in `text` / `message` for other node types.
//!
//! # Failure model
//!
//! Every call makes exactly one request bounded by a fixed total timeout.
//! There is no retry: a slow or failing engine surfaces immediately as a
//! [`WebhookError`] and the caller decides what the user sees.

use std::time::{Duration, Instant};

use opticontrol_config::WebhookSettings;
use opticontrol_types::SessionId;
use opticontrol_utils::{MAX_UPSTREAM_TEXT_CHARS, redact_secrets, sanitize_upstream_text};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

const CONNECT_TIMEOUT_SECS: u64 = 10;
const TCP_KEEPALIVE_SECS: u64 = 60;
const POOL_MAX_IDLE_PER_HOST: usize = 16;
const POOL_IDLE_TIMEOUT_SECS: u64 = 90;
const MAX_ERROR_BODY_BYTES: usize = 32 * 1024;

/// Keys checked, in order, for the reply text.
const OUTPUT_KEYS: [&str; 3] = ["output", "text", "message"];

/// Request body understood by the n8n Chat Trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatPayload {
    pub chat_input: String,
    pub session_id: SessionId,
}

impl ChatPayload {
    #[must_use]
    pub fn new(chat_input: impl Into<String>, session_id: SessionId) -> Self {
        Self {
            chat_input: chat_input.into(),
            session_id,
        }
    }
}

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("n8n responded with status {0}")]
    Status(u16),
    #[error("n8n did not respond within {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("n8n request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("n8n returned an unreadable response: {0}")]
    Decode(String),
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

#[derive(Debug, Clone)]
pub struct WebhookClient {
    url: Url,
    timeout: Duration,
    http: reqwest::Client,
}

fn client_builder(timeout: Duration) -> reqwest::ClientBuilder {
    use reqwest::header::{HeaderMap, HeaderValue};

    let mut default_headers = HeaderMap::new();
    default_headers.insert(
        reqwest::header::ACCEPT,
        HeaderValue::from_static("application/json"),
    );

    reqwest::Client::builder()
        .user_agent(concat!("opticontrol/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS).min(timeout))
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::none())
        .tcp_keepalive(Some(Duration::from_secs(TCP_KEEPALIVE_SECS)))
        .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
        .pool_idle_timeout(Some(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS)))
        .default_headers(default_headers)
}

impl WebhookClient {
    pub fn new(url: Url, timeout: Duration) -> Result<Self, WebhookError> {
        let http = client_builder(timeout)
            .build()
            .map_err(WebhookError::Client)?;
        Ok(Self { url, timeout, http })
    }

    pub fn from_settings(settings: &WebhookSettings) -> Result<Self, WebhookError> {
        Self::new(settings.url.clone(), settings.timeout)
    }

    /// Forward one message and return the engine's reply text.
    pub async fn send_message(&self, payload: &ChatPayload) -> Result<String, WebhookError> {
        let started = Instant::now();
        let result = self.post(payload).await;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match &result {
            Ok(output) => tracing::info!(
                session_id = %payload.session_id,
                elapsed_ms,
                output_chars = output.chars().count(),
                "Workflow engine replied"
            ),
            Err(e) => tracing::warn!(
                session_id = %payload.session_id,
                elapsed_ms,
                error = %e,
                "Workflow engine call failed"
            ),
        }
        result
    }

    async fn post(&self, payload: &ChatPayload) -> Result<String, WebhookError> {
        let response = self
            .http
            .post(self.url.clone())
            .json(payload)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = read_capped_body(response, MAX_ERROR_BODY_BYTES).await;
            tracing::debug!(
                status = status.as_u16(),
                body = %self.loggable(&body),
                "Workflow engine error body"
            );
            return Err(WebhookError::Status(status.as_u16()));
        }

        let body = response.text().await.map_err(|e| self.classify(e))?;
        let value: serde_json::Value = serde_json::from_str(&body).map_err(|e| {
            tracing::debug!(
                body = %self.loggable(&body),
                "Workflow engine body is not JSON"
            );
            WebhookError::Decode(e.to_string())
        })?;

        Ok(extract_output(&value))
    }

    /// The webhook path acts as a shared secret, so it never reaches logs or
    /// error bodies.
    fn classify(&self, error: reqwest::Error) -> WebhookError {
        if error.is_timeout() {
            WebhookError::Timeout(self.timeout)
        } else {
            WebhookError::Transport(error.without_url())
        }
    }

    fn loggable(&self, body: &str) -> String {
        let sanitized = sanitize_upstream_text(body, MAX_UPSTREAM_TEXT_CHARS);
        match self.url.path() {
            "" | "/" => sanitized,
            path => redact_secrets(&sanitized, &[path]),
        }
    }
}

/// Read at most `max_bytes` of a response body. Read errors end the body
/// early instead of failing.
async fn read_capped_body(mut response: reqwest::Response, max_bytes: usize) -> String {
    let mut body = Vec::new();
    while let Ok(Some(chunk)) = response.chunk().await {
        body.extend_from_slice(&chunk);
        if body.len() > max_bytes {
            body.truncate(max_bytes);
            let text = String::from_utf8_lossy(&body);
            return format!("{text}...(truncated)");
        }
    }
    String::from_utf8_lossy(&body).into_owned()
}

/// Pick the reply text out of an engine response body.
///
/// The first non-empty string among `output`, `text` and `message` wins.
/// A single-element array (n8n's "all items" response mode) is unwrapped
/// first. Anything else is returned as compact JSON.
#[must_use]
pub fn extract_output(value: &serde_json::Value) -> String {
    let item = match value {
        serde_json::Value::Array(items) if items.len() == 1 => &items[0],
        other => other,
    };

    OUTPUT_KEYS
        .iter()
        .filter_map(|key| item.get(key).and_then(serde_json::Value::as_str))
        .find(|text| !text.is_empty())
        .map_or_else(|| value.to_string(), str::to_string)
}
