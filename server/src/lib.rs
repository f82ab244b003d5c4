//! OptiControl HTTP server.
//!
//! ```text
//! browser ── /, /dashboard ──> route guard + HTML shells
//!         ── /api/auth*    ──> demo login, auth-token cookie
//!         ── /api/chat     ──> raw relay to the workflow engine
//!         ── /api/session* ──> ChatService (onboarding, send, reset)
//! ```

pub mod assets;
pub mod auth;
pub mod error;
pub mod routes;
pub mod state;

pub use auth::{AuthUser, cleared_cookie, current_user, session_cookie};
pub use error::ApiError;
pub use routes::build_router;
pub use state::{AppState, SharedState};
