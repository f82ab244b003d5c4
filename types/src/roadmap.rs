//! Roadmap data model.
//!
//! A roadmap is the ordered list of automation steps the workflow engine
//! proposes for a user. It arrives embedded in assistant replies and is
//! stored alongside the chat transcript.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Completed,
    InProgress,
    Locked,
}

impl StepStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::InProgress => "in_progress",
            Self::Locked => "locked",
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoadmapStep {
    pub id: u32,
    pub title: String,
    pub description: String,
    pub status: StepStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Roadmap {
    pub steps: Vec<RoadmapStep>,
    /// RFC 3339 time the roadmap was extracted.
    pub generated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
}

/// Completion summary shown above the step list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoadmapProgress {
    pub completed: usize,
    pub total: usize,
    pub percent: u8,
}

impl Roadmap {
    #[must_use]
    pub fn progress(&self) -> RoadmapProgress {
        let completed = self
            .steps
            .iter()
            .filter(|step| step.status == StepStatus::Completed)
            .count();
        let total = self.steps.len();
        let percent = if total == 0 {
            0
        } else {
            ((completed as f64 / total as f64) * 100.0).round() as u8
        };
        RoadmapProgress {
            completed,
            total,
            percent,
        }
    }

    /// First step the user is currently working on.
    #[must_use]
    pub fn current_step(&self) -> Option<&RoadmapStep> {
        self.steps
            .iter()
            .find(|step| step.status == StepStatus::InProgress)
    }
}
