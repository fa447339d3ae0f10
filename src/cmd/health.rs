//! Service reachability check (`ekalavya health`).

use anyhow::Result;
use console::style;

use ekalavya::config::ClientConfig;
use ekalavya::pipeline::HttpGenerationService;
use ekalavya::pipeline::presenter::error_text;
use ekalavya::ui::icons::{CHECK, CROSS};

pub async fn cmd_health(config: &ClientConfig) -> Result<bool> {
    let service = HttpGenerationService::new(&config.api)?;
    match service.health().await {
        Ok(health) => {
            println!(
                "{}Service at {} is {}",
                CHECK,
                config.api.base_url,
                style(&health.status).green().bold()
            );
            Ok(health.status == "healthy")
        }
        Err(e) => {
            println!("{}{}", CROSS, style(error_text(&e.user_message())).red());
            Ok(false)
        }
    }
}
