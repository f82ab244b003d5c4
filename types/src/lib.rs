//! Core domain types for OptiControl.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the application.

mod ids;
mod message;
mod proofs;
mod roadmap;
mod session;

use serde::{Deserialize, Serialize};

pub use ids::{MessageId, SessionId, UserId};
pub use message::{ChatMessage, MessageRole};
pub use proofs::{EmptyStringError, NonEmptyString};
pub use roadmap::{Roadmap, RoadmapProgress, RoadmapStep, StepStatus};
pub use session::StoredSession;

/// Public identity of a signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
}
