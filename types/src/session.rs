use serde::{Deserialize, Serialize};

use crate::ids::{SessionId, UserId};
use crate::message::ChatMessage;
use crate::roadmap::Roadmap;

/// Per-user chat state: transcript, latest roadmap, and onboarding flag.
///
/// Serialized in camelCase so stored documents keep the format the
/// dashboard reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSession {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub is_first_time: bool,
    pub roadmap: Option<Roadmap>,
    pub messages: Vec<ChatMessage>,
}

impl StoredSession {
    /// First-time session with a fresh session id.
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        Self {
            session_id: SessionId::generate(),
            user_id,
            is_first_time: true,
            roadmap: None,
            messages: Vec::new(),
        }
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn replace_roadmap(&mut self, roadmap: Roadmap) {
        self.roadmap = Some(roadmap);
    }
}
