//! Terminal rendering of pipeline runs.
//!
//! [`PipelineUI`] is the display surface the controller drives. It supports
//! three output modes:
//! - `full`: one spinner per stage plus content blocks, via `indicatif`
//! - `minimal`: plain status and content lines
//! - `json`: one JSON object per event, for machine consumption

use console::{Term, style};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;

use crate::pipeline::controller::StageSink;
use crate::pipeline::presenter::{
    error_text, render_generator_or_final_output, render_stage_content,
};
use crate::pipeline::stage::{StageId, StageStatus};
use crate::pipeline::view::{PipelineEvent, PipelineView, StampedEvent};
use crate::ui::icons::{CHECK, CROSS, GENERATE, PENDING, REFINE, REVIEW, RUNNING, SPARKLE, WARNING};

/// Output mode for the pipeline UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UiMode {
    /// Spinners and colours
    #[default]
    Full,
    /// Plain line-per-transition output
    Minimal,
    /// JSON-formatted events
    Json,
}

impl std::str::FromStr for UiMode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "json" => Self::Json,
            "minimal" => Self::Minimal,
            _ => Self::Full,
        })
    }
}

impl UiMode {
    /// Parse UI mode from string; unknown values fall back to `Full`.
    pub fn parse(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }

    pub fn is_known(s: &str) -> bool {
        matches!(s.to_lowercase().as_str(), "full" | "minimal" | "json")
    }
}

/// Terminal display surface for pipeline runs.
///
/// Spinners are created on `Reset` and replaced on every new run, so one
/// instance can serve a whole interactive session.
pub struct PipelineUI {
    mode: UiMode,
    multi: MultiProgress,
    stage_bars: Mutex<HashMap<StageId, ProgressBar>>,
    verbose: bool,
    term: Term,
}

impl PipelineUI {
    /// `Full` degrades to `Minimal` when stdout is not a terminal, since
    /// hidden progress bars swallow their output.
    pub fn new(mode: UiMode, verbose: bool) -> Self {
        let term = Term::stdout();
        let mode = if mode == UiMode::Full && !term.is_term() {
            UiMode::Minimal
        } else {
            mode
        };
        Self {
            mode,
            multi: MultiProgress::new(),
            stage_bars: Mutex::new(HashMap::new()),
            verbose,
            term,
        }
    }

    pub fn mode(&self) -> UiMode {
        self.mode
    }

    /// Print a line via `MultiProgress`, falling back to `eprintln!` if that fails.
    fn print_line(&self, msg: impl AsRef<str>) {
        if self.multi.println(msg.as_ref()).is_err() {
            eprintln!("{}", msg.as_ref());
        }
    }

    fn write_line(&self, msg: &str) {
        if writeln!(&self.term, "{}", msg).is_err() {
            eprintln!("{}", msg);
        }
    }

    fn handle_json(&self, event: &StampedEvent) {
        match serde_json::to_string(event) {
            Ok(json) => self.write_line(&json),
            Err(e) => tracing::warn!(error = %e, "failed to serialize pipeline event"),
        }
    }

    fn handle_minimal(&self, event: &PipelineEvent, view: &PipelineView) {
        for line in minimal_lines(event, view) {
            self.write_line(&line);
        }
    }

    fn handle_full(&self, stamped: &StampedEvent, view: &PipelineView) {
        match &stamped.event {
            PipelineEvent::Reset => self.on_reset(view),
            PipelineEvent::PipelineShown => self.on_pipeline_shown(stamped),
            PipelineEvent::StageShown { stage } => {
                self.add_stage_bar(*stage);
            }
            PipelineEvent::StageStatus { stage, status } => {
                self.on_stage_status(*stage, *status, view.stage(*stage).label);
            }
            PipelineEvent::StageContentRevealed { stage } => {
                self.on_content_revealed(*stage, view);
            }
            PipelineEvent::FinalRevealed { content } => {
                self.print_line("");
                self.print_line(format!("{}", style("═".repeat(70)).cyan()));
                self.print_line(format!(
                    "{} {}",
                    SPARKLE,
                    style("Final Output").green().bold()
                ));
                self.print_line(format!("{}", style("═".repeat(70)).cyan()));
                for line in render_generator_or_final_output(&content.explanation, &content.mcqs)
                    .lines()
                {
                    self.print_line(format!("  {}", line));
                }
                self.print_line("");
            }
            PipelineEvent::ErrorShown { message } => {
                self.print_line(format!(
                    "{} {}",
                    CROSS,
                    style(error_text(message)).red().bold()
                ));
            }
            PipelineEvent::Unlocked => {
                if self.verbose {
                    self.print_line(format!("{}", style("Ready for the next submission").dim()));
                }
            }
            PipelineEvent::Locked
            | PipelineEvent::ErrorCleared
            | PipelineEvent::StageRendered { .. } => {}
        }
    }

    fn on_reset(&self, view: &PipelineView) {
        let mut bars = self.stage_bars.lock().unwrap_or_else(|e| e.into_inner());
        for (_, bar) in bars.drain() {
            bar.finish_and_clear();
        }
        drop(bars);
        for stage in view.stages.iter().filter(|s| s.visible) {
            self.add_stage_bar(stage.id);
        }
    }

    fn on_pipeline_shown(&self, stamped: &StampedEvent) {
        let run = stamped
            .run_id
            .map(|id| id.to_string()[..8].to_string())
            .unwrap_or_default();
        self.print_line("");
        self.print_line(format!(
            "{} Content pipeline {}",
            style("▶").green().bold(),
            style(run).dim()
        ));
    }

    fn add_stage_bar(&self, stage: StageId) {
        let bar_style = ProgressStyle::default_spinner()
            .template("{prefix:.bold} {spinner} {msg}")
            .expect("progress bar template is a valid static string");

        let bar = self.multi.add(ProgressBar::new_spinner());
        bar.set_style(bar_style);
        bar.set_prefix(format!("{}{}", stage_icon(stage), stage.title()));
        bar.set_message(format!("{}{}", PENDING, style("Pending").dim()));

        let mut bars = self.stage_bars.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(old) = bars.insert(stage, bar) {
            old.finish_and_clear();
        }
    }

    fn on_stage_status(&self, stage: StageId, status: StageStatus, label: &str) {
        let bars = self.stage_bars.lock().unwrap_or_else(|e| e.into_inner());
        let Some(bar) = bars.get(&stage) else {
            return;
        };
        match status {
            StageStatus::Pending => bar.set_message(format!("{}{}", PENDING, style(label).dim())),
            StageStatus::InProgress => {
                bar.set_message(format!("{}{}", RUNNING, style(label).cyan()));
                bar.enable_steady_tick(Duration::from_millis(100));
            }
            StageStatus::Complete => {
                bar.finish_with_message(format!("{}{}", CHECK, style(label).green().bold()));
            }
            StageStatus::NeedsRevision => {
                bar.finish_with_message(format!("{}{}", WARNING, style(label).yellow().bold()));
            }
        }
    }

    fn on_content_revealed(&self, stage: StageId, view: &PipelineView) {
        let Some(content) = &view.stage(stage).content else {
            return;
        };
        self.print_line(format!("{}", style(format!("── {} ──", stage.title())).dim()));
        for line in render_stage_content(content) {
            self.print_line(format!("  {}", line));
        }
    }
}

impl StageSink for PipelineUI {
    fn on_event(&self, event: &StampedEvent, view: &PipelineView) {
        match self.mode {
            UiMode::Json => self.handle_json(event),
            UiMode::Minimal => self.handle_minimal(&event.event, view),
            UiMode::Full => self.handle_full(event, view),
        }
    }
}

fn stage_icon(stage: StageId) -> console::Emoji<'static, 'static> {
    match stage {
        StageId::Generate => GENERATE,
        StageId::Review => REVIEW,
        StageId::Refine => REFINE,
    }
}

/// Lines printed in minimal mode for one event.
pub fn minimal_lines(event: &PipelineEvent, view: &PipelineView) -> Vec<String> {
    match event {
        PipelineEvent::StageStatus { stage, status } => vec![format!(
            "[{}] {}: {} ({})",
            stage.number(),
            stage.title(),
            view.stage(*stage).label,
            status
        )],
        PipelineEvent::StageContentRevealed { stage } => view
            .stage(*stage)
            .content
            .as_ref()
            .map(|c| {
                render_stage_content(c)
                    .into_iter()
                    .map(|l| format!("    {}", l))
                    .collect()
            })
            .unwrap_or_default(),
        PipelineEvent::FinalRevealed { content } => {
            let mut lines = vec!["Final Output:".to_string()];
            lines.extend(
                render_generator_or_final_output(&content.explanation, &content.mcqs)
                    .lines()
                    .into_iter()
                    .map(|l| format!("    {}", l)),
            );
            lines
        }
        PipelineEvent::ErrorShown { message } => vec![error_text(message)],
        PipelineEvent::Reset
        | PipelineEvent::ErrorCleared
        | PipelineEvent::PipelineShown
        | PipelineEvent::Locked
        | PipelineEvent::StageRendered { .. }
        | PipelineEvent::StageShown { .. }
        | PipelineEvent::Unlocked => Vec::new(),
    }
}
