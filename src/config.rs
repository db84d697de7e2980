//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.critic-consensus.toml` files.

use crate::cli::{Args, OutputFormat};
use crate::rubric::{Rubric, RubricPreset};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".critic-consensus.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Critic output collection settings.
    #[serde(default)]
    pub collect: CollectConfig,

    /// Rubric selection.
    #[serde(default)]
    pub rubric: RubricConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Report format.
    #[serde(default)]
    pub format: OutputFormat,

    /// Report file; stdout when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            output: None,
        }
    }
}

/// Critic output collection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectConfig {
    /// Preferred critic order; other critics follow sorted by name.
    #[serde(default = "default_critics")]
    pub critics: Vec<String>,

    /// File extensions treated as critic output.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// File names to skip.
    #[serde(default)]
    pub excludes: Vec<String>,

    /// Maximum critic file size in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Extra read attempts after the first failure.
    #[serde(default = "default_retries")]
    pub retries: usize,

    /// Delay between read attempts in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            critics: default_critics(),
            extensions: default_extensions(),
            excludes: Vec::new(),
            max_file_size: default_max_file_size(),
            retries: default_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl CollectConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

fn default_critics() -> Vec<String> {
    vec!["claude", "gpt", "gemini"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_extensions() -> Vec<String> {
    vec!["json", "txt", "md"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_max_file_size() -> u64 {
    1024 * 1024 // 1MB
}

fn default_retries() -> usize {
    2
}

fn default_retry_delay_ms() -> u64 {
    250
}

/// Rubric selection: a preset, or a TOML rubric file which wins when set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RubricConfig {
    #[serde(default)]
    pub preset: RubricPreset,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl RubricConfig {
    /// Build the selected rubric.
    pub fn resolve(&self) -> Result<Rubric> {
        match self.file {
            Some(ref path) => Rubric::load(path)
                .with_context(|| format!("Failed to load rubric from {}", path.display())),
            None => Ok(self.preset.rubric()),
        }
    }
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load configuration from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &Args) {
        if let Some(format) = args.format {
            self.general.format = format;
        }
        if let Some(ref output) = args.output {
            self.general.output = Some(output.clone());
        }
        if let Some(retries) = args.retries {
            self.collect.retries = retries;
        }
        if let Some(delay) = args.retry_delay_ms {
            self.collect.retry_delay_ms = delay;
        }

        // A preset named on the command line replaces a configured file.
        if let Some(preset) = args.rubric {
            self.rubric.preset = preset;
            self.rubric.file = None;
        }
        if let Some(ref file) = args.rubric_file {
            self.rubric.file = Some(file.clone());
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> Result<String> {
        toml::to_string_pretty(&Config::default()).context("Failed to render default config")
    }
}
