//! Roadmap extraction from assistant replies.
//!
//! The workflow engine embeds its roadmap as a fenced block inside the
//! free-text reply:
//!
//! ````text
//! Great, here is your plan!
//!
//! ```json_roadmap
//! {"industry": "retail", "steps": [{"id": 1, "title": "...", "description": "...", "status": "in_progress"}]}
//! ```
//! ````
//!
//! The first block is parsed into a [`Roadmap`]; every block is removed from
//! the text shown to the user.

use std::sync::LazyLock;

use opticontrol_types::{Roadmap, RoadmapStep};
use regex::Regex;
use serde::Deserialize;

/// Info string that marks a roadmap block.
pub const ROADMAP_FENCE_TAG: &str = "json_roadmap";

static ROADMAP_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?s)```{ROADMAP_FENCE_TAG}\s*(.*?)```"))
        .expect("roadmap block pattern is valid")
});

/// Block body as emitted by the engine. `generatedAt` is ours to stamp, so
/// any value the engine sends is ignored.
#[derive(Deserialize)]
struct RoadmapWire {
    steps: Vec<RoadmapStep>,
    #[serde(default)]
    industry: Option<String>,
}

/// Display text and optional roadmap split out of one reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedResponse {
    pub display: String,
    pub roadmap: Option<Roadmap>,
}

/// Parse the first `json_roadmap` block in `text`.
///
/// Returns `None` when there is no block or its body is not a valid roadmap.
#[must_use]
pub fn parse_roadmap_from_response(text: &str, generated_at: &str) -> Option<Roadmap> {
    let body = ROADMAP_BLOCK.captures(text)?.get(1)?.as_str().trim();
    match serde_json::from_str::<RoadmapWire>(body) {
        Ok(wire) => Some(Roadmap {
            steps: wire.steps,
            generated_at: generated_at.to_string(),
            industry: wire.industry,
        }),
        Err(e) => {
            tracing::debug!("Ignoring malformed roadmap block: {e}");
            None
        }
    }
}

/// Remove every `json_roadmap` block and trim what is left.
#[must_use]
pub fn strip_roadmap_json(text: &str) -> String {
    ROADMAP_BLOCK.replace_all(text, "").trim().to_string()
}

#[must_use]
pub fn split_response(text: &str, generated_at: &str) -> ExtractedResponse {
    ExtractedResponse {
        display: strip_roadmap_json(text),
        roadmap: parse_roadmap_from_response(text, generated_at),
    }
}
