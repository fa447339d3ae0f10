//! Resubmittable prompt loop (`ekalavya interactive`).

use anyhow::{Context, Result};
use dialoguer::Input;

use ekalavya::config::ClientConfig;

use super::generate::{build_controller, submit_or_interrupt};

/// Keep prompting until both fields are left blank. Each submission is a
/// fresh run on the same controller, so the display fully resets.
pub async fn cmd_interactive(config: &ClientConfig, verbose: bool) -> Result<bool> {
    let controller = build_controller(config, verbose)?;
    println!("Leave both fields blank to quit.");

    let mut all_succeeded = true;
    loop {
        let grade: String = Input::new()
            .with_prompt("Grade")
            .allow_empty(true)
            .interact_text()
            .context("Failed to read grade")?;
        let topic: String = Input::new()
            .with_prompt("Topic")
            .allow_empty(true)
            .interact_text()
            .context("Failed to read topic")?;

        if grade.trim().is_empty() && topic.trim().is_empty() {
            break;
        }

        // Unparseable grades fall through to validation as missing.
        let grade = grade.trim().parse::<i64>().unwrap_or(0);
        match submit_or_interrupt(&controller, grade, &topic).await {
            Some(outcome) => all_succeeded &= outcome.is_success(),
            None => return Ok(false),
        }
    }
    Ok(all_succeeded)
}
