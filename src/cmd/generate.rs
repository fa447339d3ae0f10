//! Single pipeline run (`ekalavya generate`).

use anyhow::Result;
use std::sync::Arc;

use ekalavya::config::ClientConfig;
use ekalavya::pipeline::{HttpGenerationService, Pacing, PipelineController, RunOutcome};
use ekalavya::ui::PipelineUI;

/// Wire the HTTP service, terminal UI and pacing into a controller.
pub fn build_controller(config: &ClientConfig, verbose: bool) -> Result<PipelineController> {
    let service = HttpGenerationService::new(&config.api)?;
    let ui = PipelineUI::new(config.ui_mode(), verbose);
    Ok(PipelineController::new(
        Arc::new(service),
        Arc::new(ui),
        Pacing::from_settings(&config.pacing),
    ))
}

/// Run once. Returns whether the run reached the final output.
pub async fn cmd_generate(
    config: &ClientConfig,
    verbose: bool,
    grade: Option<i64>,
    topic: Option<&str>,
) -> Result<bool> {
    let controller = build_controller(config, verbose)?;
    let outcome = submit_or_interrupt(&controller, grade.unwrap_or(0), topic.unwrap_or("")).await;
    Ok(outcome.is_some_and(|o| o.is_success()))
}

/// Submit, giving up on Ctrl-C. Dropping the run unlocks the trigger.
pub async fn submit_or_interrupt(
    controller: &PipelineController,
    grade: i64,
    topic: &str,
) -> Option<RunOutcome> {
    tokio::select! {
        outcome = controller.submit(grade, topic) => Some(outcome),
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("run interrupted");
            eprintln!("Interrupted");
            None
        }
    }
}
