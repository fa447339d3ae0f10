//! Layered client configuration.
//!
//! Values are resolved file → environment → CLI. The file lives at
//! `.ekalavya/ekalavya.toml` in the working directory, falling back to the
//! user config directory.
//!
//! ```toml
//! [api]
//! base_url = "http://localhost:5000"
//! generate_path = "/api/generate"
//! health_path = "/health"
//! timeout_secs = 120
//!
//! [pacing]
//! short_ms = 500
//! long_ms = 1000
//!
//! [ui]
//! mode = "full"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::ui::UiMode;

pub const CONFIG_DIR: &str = ".ekalavya";
pub const CONFIG_FILE: &str = "ekalavya.toml";

pub const ENV_API_URL: &str = "EKALAVYA_API_URL";
pub const ENV_TIMEOUT_SECS: &str = "EKALAVYA_TIMEOUT_SECS";
pub const ENV_UI: &str = "EKALAVYA_UI";

/// Generation service endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_generate_path")]
    pub generate_path: String,
    #[serde(default = "default_health_path")]
    pub health_path: String,
    /// Whole-request timeout. Generation plus review plus refinement can
    /// take a while server-side.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_generate_path() -> String {
    "/api/generate".to_string()
}

fn default_health_path() -> String {
    "/health".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            generate_path: default_generate_path(),
            health_path: default_health_path(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Pacing pauses between stage reveals, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacingSettings {
    #[serde(default = "default_short_ms")]
    pub short_ms: u64,
    #[serde(default = "default_long_ms")]
    pub long_ms: u64,
}

fn default_short_ms() -> u64 {
    500
}

fn default_long_ms() -> u64 {
    1000
}

impl Default for PacingSettings {
    fn default() -> Self {
        Self {
            short_ms: default_short_ms(),
            long_ms: default_long_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiSettings {
    /// full, minimal or json
    #[serde(default = "default_ui_mode")]
    pub mode: String,
}

fn default_ui_mode() -> String {
    "full".to_string()
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            mode: default_ui_mode(),
        }
    }
}

/// Overrides taken from command-line flags. `None` leaves the value alone.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub api_url: Option<String>,
    pub ui: Option<String>,
    pub no_pacing: bool,
}

/// Effective configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub pacing: PacingSettings,
    #[serde(default)]
    pub ui: UiSettings,
    /// File the values were read from, if any.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl ClientConfig {
    /// Project-local config path: `<dir>/.ekalavya/ekalavya.toml`.
    pub fn project_path(project_dir: &Path) -> PathBuf {
        project_dir.join(CONFIG_DIR).join(CONFIG_FILE)
    }

    /// User-level config path, e.g. `~/.config/ekalavya/ekalavya.toml`.
    pub fn user_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("ekalavya").join(CONFIG_FILE))
    }

    /// Read a config file. Missing sections take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Resolve file and environment layers.
    ///
    /// An explicit path must exist. Otherwise the project file is tried,
    /// then the user file, then built-in defaults.
    pub fn load(project_dir: &Path, explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => {
                let candidates = std::iter::once(Self::project_path(project_dir))
                    .chain(Self::user_path());
                match candidates.into_iter().find(|p| p.exists()) {
                    Some(path) => Self::from_file(&path)?,
                    None => Self::default(),
                }
            }
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        tracing::debug!(source = ?config.source, base_url = %config.api.base_url, "configuration loaded");
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL) {
            self.api.base_url = url;
        }
        if let Some(secs) = lookup(ENV_TIMEOUT_SECS) {
            self.api.timeout_secs = secs
                .trim()
                .parse()
                .with_context(|| format!("{} must be a whole number of seconds", ENV_TIMEOUT_SECS))?;
        }
        if let Some(mode) = lookup(ENV_UI) {
            self.ui.mode = mode;
        }
        Ok(())
    }

    pub fn apply_cli(&mut self, overrides: &CliOverrides) {
        if let Some(url) = &overrides.api_url {
            self.api.base_url = url.clone();
        }
        if let Some(mode) = &overrides.ui {
            self.ui.mode = mode.clone();
        }
        if overrides.no_pacing {
            self.pacing = PacingSettings {
                short_ms: 0,
                long_ms: 0,
            };
        }
    }

    pub fn ui_mode(&self) -> UiMode {
        UiMode::parse(&self.ui.mode)
    }

    /// Non-fatal problems worth telling the user about.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        let url = self.api.base_url.as_str();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            warnings.push(format!(
                "api.base_url '{}' should start with http:// or https://",
                url
            ));
        }
        if self.api.timeout_secs == 0 {
            warnings.push("api.timeout_secs is 0; every request will time out".to_string());
        }
        if self.pacing.short_ms > self.pacing.long_ms {
            warnings.push(format!(
                "pacing.short_ms ({}) is longer than pacing.long_ms ({})",
                self.pacing.short_ms, self.pacing.long_ms
            ));
        }
        if !UiMode::is_known(&self.ui.mode) {
            warnings.push(format!(
                "ui.mode '{}' is not one of full, minimal, json; using full",
                self.ui.mode
            ));
        }
        warnings
    }

    /// Default file contents written by `config init`.
    pub fn default_toml() -> Result<String> {
        toml::to_string_pretty(&Self::default()).context("Failed to serialize default config")
    }
}
