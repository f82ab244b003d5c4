//! Chat session state machine.
//!
//! A user's session moves through two phases. While `is_first_time` is set,
//! [`ChatService::initialize`] sends the onboarding trigger and stores the
//! engine's greeting. After that every [`ChatService::send`] appends the user
//! message and the assistant reply, and replaces the roadmap when the reply
//! carries a new one.
//!
//! Engine failures never touch the stored session. The caller gets the
//! persisted state back together with a transient notice to show the user.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use opticontrol_context::{
    SessionStore, StoreError, clear_session, get_stored_session, save_stored_session,
    split_response,
};
use opticontrol_providers::{ChatPayload, WebhookClient, WebhookError};
use opticontrol_types::{ChatMessage, NonEmptyString, Roadmap, SessionId, StoredSession, UserId};
use thiserror::Error;

/// Message that asks the engine to open the conversation.
pub const INIT_MESSAGE: &str = "__INIT__";

pub const ONBOARDING_FALLBACK: &str = "Hi! I'm Opti, your AI Automation Expert. I'm having a little trouble connecting right now - please try sending a message to get started.";

pub const SEND_FAILURE_NOTICE: &str = "I had trouble connecting. Please try again in a moment.";

pub type BackendFut<'a> = Pin<Box<dyn Future<Output = Result<String, WebhookError>> + Send + 'a>>;

/// Anything that can answer one chat turn.
pub trait ChatBackend: Send + Sync {
    fn send<'a>(&'a self, payload: &'a ChatPayload) -> BackendFut<'a>;
}

impl ChatBackend for WebhookClient {
    fn send<'a>(&'a self, payload: &'a ChatPayload) -> BackendFut<'a> {
        Box::pin(self.send_message(payload))
    }
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Message is empty")]
    EmptyMessage,
    #[error("A message is already being processed")]
    Busy,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result of one state-machine step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatOutcome {
    /// The session as persisted after this step.
    pub session: StoredSession,
    /// User message that did not reach the engine. Never persisted.
    pub unsent: Option<ChatMessage>,
    /// Connection-failure text to show once. Never persisted.
    pub notice: Option<ChatMessage>,
    pub roadmap_updated: bool,
}

impl ChatOutcome {
    fn stored(session: StoredSession, roadmap_updated: bool) -> Self {
        Self {
            session,
            unsent: None,
            notice: None,
            roadmap_updated,
        }
    }
}

/// Fold one engine reply into a session.
///
/// The roadmap block is stripped from the stored assistant text. A session
/// keeps its previous roadmap when the reply has none.
#[must_use]
pub fn apply_response(
    mut session: StoredSession,
    raw: &str,
    user_message: Option<ChatMessage>,
    now: DateTime<Utc>,
) -> (StoredSession, Option<Roadmap>) {
    let extracted = split_response(raw, &now.to_rfc3339());

    if let Some(message) = user_message {
        session.push(message);
    }
    session.push(ChatMessage::assistant(
        extracted.display,
        now.timestamp_millis(),
    ));
    session.is_first_time = false;

    if let Some(roadmap) = &extracted.roadmap {
        session.replace_roadmap(roadmap.clone());
    }
    (session, extracted.roadmap)
}

pub struct ChatService {
    backend: Arc<dyn ChatBackend>,
    store: Arc<dyn SessionStore>,
    in_flight: Mutex<HashSet<UserId>>,
}

impl std::fmt::Debug for ChatService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatService").finish_non_exhaustive()
    }
}

/// Marks a user as busy until dropped.
struct InFlightGuard<'a> {
    set: &'a Mutex<HashSet<UserId>>,
    user_id: UserId,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.user_id);
    }
}

impl ChatService {
    #[must_use]
    pub fn new(backend: Arc<dyn ChatBackend>, store: Arc<dyn SessionStore>) -> Self {
        Self {
            backend,
            store,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    fn begin(&self, user_id: &UserId) -> Result<InFlightGuard<'_>, ChatError> {
        let mut set = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !set.insert(user_id.clone()) {
            return Err(ChatError::Busy);
        }
        Ok(InFlightGuard {
            set: &self.in_flight,
            user_id: user_id.clone(),
        })
    }

    pub fn session(&self, user_id: &UserId) -> Result<StoredSession, ChatError> {
        Ok(get_stored_session(self.store.as_ref(), user_id)?)
    }

    /// Run onboarding for a first-time session.
    pub async fn initialize(&self, user_id: &UserId) -> Result<ChatOutcome, ChatError> {
        let _guard = self.begin(user_id)?;
        let session = self.session(user_id)?;
        if !session.is_first_time {
            return Ok(ChatOutcome::stored(session, false));
        }

        let payload = ChatPayload::new(INIT_MESSAGE, session.session_id.clone());
        match self.backend.send(&payload).await {
            Ok(raw) => {
                let (session, roadmap) = apply_response(session, &raw, None, Utc::now());
                save_stored_session(self.store.as_ref(), &session)?;
                tracing::info!(
                    user_id = %user_id,
                    session_id = %session.session_id,
                    roadmap = roadmap.is_some(),
                    "Onboarding complete"
                );
                Ok(ChatOutcome::stored(session, roadmap.is_some()))
            }
            Err(e) => {
                tracing::warn!(user_id = %user_id, "Onboarding failed: {e}");
                let notice = ChatMessage::assistant(ONBOARDING_FALLBACK, Utc::now().timestamp_millis());
                Ok(ChatOutcome {
                    session,
                    unsent: None,
                    notice: Some(notice),
                    roadmap_updated: false,
                })
            }
        }
    }

    /// Send one user message through the engine.
    pub async fn send(&self, user_id: &UserId, text: &str) -> Result<ChatOutcome, ChatError> {
        let text = NonEmptyString::trimmed(text).map_err(|_| ChatError::EmptyMessage)?;
        let _guard = self.begin(user_id)?;

        let session = self.session(user_id)?;
        let user_message = ChatMessage::user(text.as_str(), Utc::now().timestamp_millis());
        let payload = ChatPayload::new(text.into_inner(), session.session_id.clone());

        match self.backend.send(&payload).await {
            Ok(raw) => {
                let (session, roadmap) =
                    apply_response(session, &raw, Some(user_message), Utc::now());
                save_stored_session(self.store.as_ref(), &session)?;
                tracing::debug!(
                    user_id = %user_id,
                    messages = session.messages.len(),
                    roadmap = roadmap.is_some(),
                    "Chat turn stored"
                );
                Ok(ChatOutcome::stored(session, roadmap.is_some()))
            }
            Err(e) => {
                tracing::warn!(user_id = %user_id, "Chat send failed: {e}");
                let notice =
                    ChatMessage::assistant(SEND_FAILURE_NOTICE, Utc::now().timestamp_millis());
                Ok(ChatOutcome {
                    session,
                    unsent: Some(user_message),
                    notice: Some(notice),
                    roadmap_updated: false,
                })
            }
        }
    }

    /// Forward a message verbatim and return the raw engine output.
    pub async fn relay(&self, message: &str, session_id: SessionId) -> Result<String, WebhookError> {
        let payload = ChatPayload::new(message, session_id);
        self.backend.send(&payload).await
    }

    pub fn reset(&self, user_id: &UserId) -> Result<(), ChatError> {
        clear_session(self.store.as_ref(), user_id)?;
        tracing::info!(user_id = %user_id, "Session reset");
        Ok(())
    }
}
