//! Stage identities and the per-stage status machine.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::pipeline::types::ReviewVerdict;

/// A badge-carrying stage. Finalize has no badge and is modelled by the
/// final-output panel instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    Generate,
    Review,
    Refine,
}

impl StageId {
    pub const ALL: [StageId; 3] = [StageId::Generate, StageId::Review, StageId::Refine];

    /// Display number used on the presentation boundary (1, 2, 3).
    pub fn number(&self) -> u8 {
        match self {
            Self::Generate => 1,
            Self::Review => 2,
            Self::Refine => 3,
        }
    }

    pub fn index(&self) -> usize {
        usize::from(self.number() - 1)
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Generate => "Generator Agent",
            Self::Review => "Reviewer Agent",
            Self::Refine => "Refinement",
        }
    }

    /// Only Refine starts hidden; it is shown when the server refined.
    pub fn shown_on_reset(&self) -> bool {
        !matches!(self, Self::Refine)
    }

    /// Badge text while the stage is running.
    pub fn in_progress_label(&self) -> &'static str {
        match self {
            Self::Generate => "Generating...",
            Self::Review => "Evaluating...",
            Self::Refine => "Refining...",
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generate => write!(f, "generate"),
            Self::Review => write!(f, "review"),
            Self::Refine => write!(f, "refine"),
        }
    }
}

/// Stage status. `Complete` and `NeedsRevision` are terminal within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageStatus {
    #[default]
    Pending,
    InProgress,
    Complete,
    NeedsRevision,
}

impl StageStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::NeedsRevision)
    }

    /// Status string on the presentation boundary.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in-progress",
            Self::Complete => "complete",
            Self::NeedsRevision => "needs-revision",
        }
    }

    /// Allowed forward moves: Pending → InProgress → {Complete, NeedsRevision}.
    pub fn can_transition_to(&self, next: StageStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::InProgress)
                | (Self::InProgress, Self::Complete)
                | (Self::InProgress, Self::NeedsRevision)
        )
    }

    /// Terminal status for the review stage given the reviewer verdict.
    pub fn for_verdict(verdict: ReviewVerdict) -> Self {
        if verdict.is_pass() {
            Self::Complete
        } else {
            Self::NeedsRevision
        }
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Badge text for a stage in a given status.
pub fn status_label(stage: StageId, status: StageStatus) -> &'static str {
    match (stage, status) {
        (_, StageStatus::Pending) => "Pending",
        (_, StageStatus::InProgress) => stage.in_progress_label(),
        (StageId::Review, StageStatus::Complete) => "Passed",
        (_, StageStatus::Complete) => "Complete",
        (_, StageStatus::NeedsRevision) => "Needs Revision",
    }
}
