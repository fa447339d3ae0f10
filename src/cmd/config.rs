//! Configuration view and validation commands (`ekalavya config`).

use anyhow::Result;
use std::path::Path;

use ekalavya::config::{CliOverrides, ClientConfig};

use super::super::{Cli, ConfigCommands};

/// Resolve file, environment and CLI layers.
pub fn load_config(cli: &Cli, project_dir: &Path) -> Result<ClientConfig> {
    let mut config = ClientConfig::load(project_dir, cli.config.as_deref())?;
    config.apply_cli(&CliOverrides {
        api_url: cli.api_url.clone(),
        ui: cli.ui.clone(),
        no_pacing: cli.no_pacing,
    });
    Ok(config)
}

pub fn cmd_config(cli: &Cli, project_dir: &Path, command: Option<ConfigCommands>) -> Result<()> {
    match command {
        None | Some(ConfigCommands::Show) => {
            let config = load_config(cli, project_dir)?;

            println!();
            println!("Ekalavya Configuration");
            println!("======================");
            println!();
            match &config.source {
                Some(path) => println!("Config file: {}", path.display()),
                None => println!("No config file found; using defaults."),
            }
            println!();
            println!("[api]");
            println!("  base_url = \"{}\"", config.api.base_url);
            println!("  generate_path = \"{}\"", config.api.generate_path);
            println!("  health_path = \"{}\"", config.api.health_path);
            println!("  timeout_secs = {}", config.api.timeout_secs);
            println!();
            println!("[pacing]");
            println!("  short_ms = {}", config.pacing.short_ms);
            println!("  long_ms = {}", config.pacing.long_ms);
            println!();
            println!("[ui]");
            println!("  mode = \"{}\"", config.ui.mode);
            println!();
            if config.source.is_none() {
                println!("Run 'ekalavya config init' to create a config file.");
                println!();
            }
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            let config = load_config(cli, project_dir)?;
            let warnings = config.validate();
            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            let config_path = ClientConfig::project_path(project_dir);
            if config_path.exists() {
                println!("Config already exists at {}", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }
            if let Some(dir) = config_path.parent() {
                std::fs::create_dir_all(dir)?;
            }
            std::fs::write(&config_path, ClientConfig::default_toml()?)?;

            println!("Created {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [api] base_url, generate_path, timeout_secs");
            println!("  - [pacing] short_ms, long_ms");
            println!("  - [ui] mode (full, minimal, json)");
            println!();
        }
    }

    Ok(())
}
