use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;

#[derive(Parser)]
#[command(name = "ekalavya")]
#[command(version, about = "Staged display client for the Ekalavya content pipeline")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a config file. Defaults to .ekalavya/ekalavya.toml, then the user config dir.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Base URL of the content service (overrides config and EKALAVYA_API_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// UI output mode: full, minimal, json
    #[arg(long, global = true)]
    pub ui: Option<String>,

    /// Skip the pacing pauses between stage reveals
    #[arg(long, global = true)]
    pub no_pacing: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate, review and refine content for one grade and topic
    Generate {
        /// Grade level (positive integer)
        #[arg(short, long, allow_negative_numbers = true)]
        grade: Option<i64>,

        /// Topic to generate content for
        #[arg(short, long)]
        topic: Option<String>,
    },
    /// Prompt for grade and topic repeatedly; a blank submission exits
    Interactive,
    /// Check that the content service is reachable
    Health,
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Write a default .ekalavya/ekalavya.toml
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is normal.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    if let Commands::Config { command } = &cli.command {
        return cmd::cmd_config(&cli, &project_dir, command.clone());
    }

    let config = cmd::load_config(&cli, &project_dir)?;
    ekalavya::logging::init_logging(ekalavya::logging::LogConfig {
        verbose: cli.verbose,
        json: config.ui_mode() == ekalavya::ui::UiMode::Json,
    })?;

    let success = match &cli.command {
        Commands::Generate { grade, topic } => {
            cmd::cmd_generate(&config, cli.verbose, *grade, topic.as_deref()).await?
        }
        Commands::Interactive => cmd::cmd_interactive(&config, cli.verbose).await?,
        Commands::Health => cmd::cmd_health(&config).await?,
        Commands::Config { .. } => true,
    };

    if !success {
        std::process::exit(1);
    }
    Ok(())
}
