//! Immutable display snapshot and the events that move it forward.
//!
//! The controller never mutates a [`PipelineView`] in place. It emits
//! [`PipelineEvent`]s, and the presenter folds each one into a fresh view.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::pipeline::stage::{StageId, StageStatus, status_label};
use crate::pipeline::types::{GeneratedContent, ReviewVerdict};

/// Content block attached to a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageContent {
    Generated(GeneratedContent),
    Review {
        verdict: ReviewVerdict,
        feedback: Vec<String>,
    },
    Refined {
        notes_addressed: usize,
    },
}

/// One badge-carrying stage as currently displayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageView {
    pub id: StageId,
    pub status: StageStatus,
    pub label: &'static str,
    /// Whether the stage itself is on screen (only Refine starts hidden).
    pub visible: bool,
    /// Whether the stage's content block is on screen.
    pub content_visible: bool,
    pub content: Option<StageContent>,
}

impl StageView {
    pub fn pending(id: StageId) -> Self {
        Self {
            id,
            status: StageStatus::Pending,
            label: status_label(id, StageStatus::Pending),
            visible: id.shown_on_reset(),
            content_visible: false,
            content: None,
        }
    }
}

/// Everything the display surface shows for the current run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineView {
    pub run_id: Option<Uuid>,
    pub pipeline_visible: bool,
    pub stages: [StageView; 3],
    /// `Some` once the final panel has been revealed.
    pub final_output: Option<GeneratedContent>,
    pub error: Option<String>,
    pub trigger_enabled: bool,
}

impl Default for PipelineView {
    fn default() -> Self {
        Self {
            run_id: None,
            pipeline_visible: false,
            stages: StageId::ALL.map(StageView::pending),
            final_output: None,
            error: None,
            trigger_enabled: true,
        }
    }
}

impl PipelineView {
    pub fn stage(&self, id: StageId) -> &StageView {
        &self.stages[id.index()]
    }

    pub(crate) fn stage_mut(&mut self, id: StageId) -> &mut StageView {
        &mut self.stages[id.index()]
    }

    /// First shown stage that has not reached a terminal status.
    pub fn first_unfinished_stage(&self) -> Option<StageId> {
        self.stages
            .iter()
            .find(|s| s.visible && !s.status.is_terminal())
            .map(|s| s.id)
    }
}

/// A discrete display transition emitted by the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// All stages back to Pending, content and final panel hidden.
    Reset,
    ErrorCleared,
    PipelineShown,
    /// Trigger control disabled.
    Locked,
    StageStatus {
        stage: StageId,
        status: StageStatus,
    },
    StageRendered {
        stage: StageId,
        content: StageContent,
    },
    StageContentRevealed {
        stage: StageId,
    },
    StageShown {
        stage: StageId,
    },
    FinalRevealed {
        content: GeneratedContent,
    },
    ErrorShown {
        message: String,
    },
    /// Trigger control re-enabled.
    Unlocked,
}

/// An event tagged with the run that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct StampedEvent {
    pub run_id: Option<Uuid>,
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: PipelineEvent,
}

impl StampedEvent {
    pub fn new(run_id: Option<Uuid>, event: PipelineEvent) -> Self {
        Self {
            run_id,
            at: Utc::now(),
            event,
        }
    }
}
