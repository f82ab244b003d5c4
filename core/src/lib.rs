//! OptiControl application core.
//!
//! - [`auth`]: demo-user login and signed `auth-token` cookies
//! - [`chat`]: the per-user chat session state machine

pub mod auth;
pub mod chat;

pub use auth::{AUTH_COOKIE_NAME, AuthError, Claims, DemoUser, TokenSigner, UserDirectory};
pub use chat::{
    BackendFut, ChatBackend, ChatError, ChatOutcome, ChatService, INIT_MESSAGE,
    ONBOARDING_FALLBACK, SEND_FAILURE_NOTICE, apply_response,
};
