//! Stage presenter: pure projections of controller events onto a display.
//!
//! Nothing here keeps state between calls. View updates take a
//! [`PipelineView`] and return the next one; text rendering takes content
//! and returns lines. [`reduce`] is the single entry point the controller
//! folds events through.

use crate::errors::TransitionError;
use crate::pipeline::stage::{StageId, StageStatus, status_label};
use crate::pipeline::types::{GeneratedContent, Mcq, ReviewVerdict};
use crate::pipeline::view::{PipelineEvent, PipelineView, StageContent, StageView};

pub const PASS_HEADLINE: &str = "✅ Content passed all quality checks!";
pub const REVISION_HEADLINE: &str = "⚠️ Content needs revision";
pub const REFINED_SUMMARY: &str = "Content refined using reviewer feedback";

/// Fold one event into the view.
pub fn reduce(view: &PipelineView, event: &PipelineEvent) -> Result<PipelineView, TransitionError> {
    match event {
        PipelineEvent::Reset => Ok(reset(view)),
        PipelineEvent::ErrorCleared => Ok(clear_error(view)),
        PipelineEvent::PipelineShown => Ok(PipelineView {
            pipeline_visible: true,
            ..view.clone()
        }),
        PipelineEvent::Locked => Ok(set_trigger(view, false)),
        PipelineEvent::Unlocked => Ok(set_trigger(view, true)),
        PipelineEvent::StageStatus { stage, status } => set_stage_status(view, *stage, *status),
        PipelineEvent::StageRendered { stage, content } => {
            Ok(render_stage(view, *stage, content.clone()))
        }
        PipelineEvent::StageContentRevealed { stage } => reveal_stage_content(view, *stage),
        PipelineEvent::StageShown { stage } => Ok(show_stage(view, *stage)),
        PipelineEvent::FinalRevealed { content } => reveal_final_output(view, content),
        PipelineEvent::ErrorShown { message } => Ok(show_error(view, message)),
    }
}

/// Every stage back to Pending with content hidden; Refine and the final
/// panel hidden. Idempotent.
pub fn reset(view: &PipelineView) -> PipelineView {
    PipelineView {
        stages: StageId::ALL.map(StageView::pending),
        final_output: None,
        ..view.clone()
    }
}

/// Move a stage to a new status, enforcing forward-only transitions.
pub fn set_stage_status(
    view: &PipelineView,
    stage: StageId,
    status: StageStatus,
) -> Result<PipelineView, TransitionError> {
    let current = view.stage(stage);
    if !current.visible {
        return Err(TransitionError::StageHidden(stage));
    }
    if !current.status.can_transition_to(status) {
        return Err(TransitionError::InvalidStatus {
            stage,
            from: current.status,
            to: status,
        });
    }
    let mut next = view.clone();
    let target = next.stage_mut(stage);
    target.status = status;
    target.label = status_label(stage, status);
    Ok(next)
}

/// Attach a content block to a stage without revealing it.
pub fn render_stage(view: &PipelineView, stage: StageId, content: StageContent) -> PipelineView {
    let mut next = view.clone();
    next.stage_mut(stage).content = Some(content);
    next
}

pub fn reveal_stage_content(
    view: &PipelineView,
    stage: StageId,
) -> Result<PipelineView, TransitionError> {
    if !view.stage(stage).visible {
        return Err(TransitionError::StageHidden(stage));
    }
    let mut next = view.clone();
    next.stage_mut(stage).content_visible = true;
    Ok(next)
}

pub fn show_stage(view: &PipelineView, stage: StageId) -> PipelineView {
    let mut next = view.clone();
    next.stage_mut(stage).visible = true;
    next
}

/// Reveal the final panel. Every shown stage must already be terminal.
pub fn reveal_final_output(
    view: &PipelineView,
    content: &GeneratedContent,
) -> Result<PipelineView, TransitionError> {
    if let Some(pending) = view.first_unfinished_stage() {
        return Err(TransitionError::FinalBeforeTerminal(pending));
    }
    Ok(PipelineView {
        final_output: Some(content.clone()),
        ..view.clone()
    })
}

pub fn show_error(view: &PipelineView, message: &str) -> PipelineView {
    PipelineView {
        error: Some(message.to_string()),
        ..view.clone()
    }
}

pub fn clear_error(view: &PipelineView) -> PipelineView {
    PipelineView {
        error: None,
        ..view.clone()
    }
}

fn set_trigger(view: &PipelineView, enabled: bool) -> PipelineView {
    PipelineView {
        trigger_enabled: enabled,
        ..view.clone()
    }
}

/// Text shown on the error display.
pub fn error_text(message: &str) -> String {
    format!("Error: {}", message)
}

/// Sequential option label: 0 → 'A', 1 → 'B', ...
pub fn option_label(index: usize) -> char {
    // Option counts are small in practice; no wraparound past 'Z'.
    char::from_u32('A' as u32 + index as u32).unwrap_or('?')
}

/// One question as displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMcq {
    pub heading: String,
    pub options: Vec<String>,
    pub answer: String,
}

/// Explanation plus question list as displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedContent {
    pub explanation: String,
    pub mcqs: Vec<RenderedMcq>,
}

impl RenderedContent {
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![self.explanation.clone()];
        for mcq in &self.mcqs {
            lines.push(String::new());
            lines.push(mcq.heading.clone());
            lines.extend(mcq.options.iter().map(|o| format!("  {}", o)));
            lines.push(mcq.answer.clone());
        }
        lines
    }
}

pub fn render_mcq(index: usize, mcq: &Mcq) -> RenderedMcq {
    RenderedMcq {
        heading: format!("Q{}: {}", index + 1, mcq.question),
        options: mcq
            .options
            .iter()
            .enumerate()
            .map(|(i, opt)| format!("{}. {}", option_label(i), opt))
            .collect(),
        answer: format!("✓ Correct Answer: {}", mcq.answer),
    }
}

pub fn render_generator_or_final_output(explanation: &str, mcqs: &[Mcq]) -> RenderedContent {
    RenderedContent {
        explanation: explanation.to_string(),
        mcqs: mcqs
            .iter()
            .enumerate()
            .map(|(i, m)| render_mcq(i, m))
            .collect(),
    }
}

/// Review block as displayed. `feedback` is `None` on a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedReview {
    pub headline: &'static str,
    pub feedback: Option<Vec<String>>,
}

impl RenderedReview {
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![self.headline.to_string()];
        if let Some(notes) = &self.feedback {
            lines.push("Feedback:".to_string());
            lines.extend(notes.iter().map(|n| format!("  • {}", n)));
        }
        lines
    }
}

pub fn render_review_result(verdict: ReviewVerdict, notes: &[String]) -> RenderedReview {
    match verdict {
        ReviewVerdict::Pass => RenderedReview {
            headline: PASS_HEADLINE,
            feedback: None,
        },
        ReviewVerdict::NeedsRevision => RenderedReview {
            headline: REVISION_HEADLINE,
            feedback: Some(notes.to_vec()),
        },
    }
}

/// Lines for any stage content block.
pub fn render_stage_content(content: &StageContent) -> Vec<String> {
    match content {
        StageContent::Generated(output) => {
            render_generator_or_final_output(&output.explanation, &output.mcqs).lines()
        }
        StageContent::Review { verdict, feedback } => {
            render_review_result(*verdict, feedback).lines()
        }
        StageContent::Refined { .. } => vec![REFINED_SUMMARY.to_string()],
    }
}
