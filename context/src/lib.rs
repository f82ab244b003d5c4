//! Conversation context for OptiControl.
//!
//! - [`roadmap`]: pulls the embedded `json_roadmap` block out of engine replies
//! - [`store`]: persists each user's [`StoredSession`](opticontrol_types::StoredSession)

pub mod roadmap;
pub mod store;

pub use roadmap::{
    ExtractedResponse, ROADMAP_FENCE_TAG, parse_roadmap_from_response, split_response,
    strip_roadmap_json,
};
pub use store::{
    FileSessionStore, MemorySessionStore, SESSION_KEY_PREFIX, SessionStore, StoreError,
    clear_session, get_stored_session, save_stored_session, session_key,
};
