//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::Severity;
use crate::rubric::RubricPreset;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

/// critic-consensus - reduce several LLM critiques into one verdict
///
/// Reads captured critic outputs (JSON or prose), normalizes them against
/// a rubric and writes a single consensus record as Markdown or JSON.
///
/// Examples:
///   critic-consensus --dir critiques/
///   critic-consensus --critic claude=claude.json --critic gpt=gpt.txt --format json
///   critic-consensus --dir critiques/ --rubric clinical-sovereign --fail-on reject
///   critic-consensus --dir critiques/ --draft draft.txt --history past/
///   critic-consensus --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Directory with one output file per critic
    ///
    /// The critic name is the file stem (claude.json -> claude).
    #[arg(short, long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// A single critic output, as NAME=FILE (repeatable, order is kept)
    #[arg(long = "critic", value_name = "NAME=FILE", value_parser = parse_critic)]
    pub critics: Vec<CriticArg>,

    /// Built-in rubric to evaluate against
    #[arg(short, long, value_name = "PRESET", conflicts_with = "rubric_file")]
    pub rubric: Option<RubricPreset>,

    /// Custom rubric TOML file
    #[arg(long, value_name = "FILE")]
    pub rubric_file: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Output file path for the report (stdout if omitted)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// The critiqued draft, to quote flagged sentences in the report
    #[arg(long, value_name = "FILE")]
    pub draft: Option<PathBuf>,

    /// Directory of past critic directories, for the historical average
    #[arg(long, value_name = "DIR")]
    pub history: Option<PathBuf>,

    /// Extra read attempts per critic file
    #[arg(long, value_name = "COUNT")]
    pub retries: Option<usize>,

    /// Delay between read attempts
    #[arg(long, value_name = "MS")]
    pub retry_delay_ms: Option<u64>,

    /// Fail if the consensus is at or above this severity
    ///
    /// Useful for CI pipelines. Exit code 2 when threshold is reached.
    /// Values: revise, reject
    #[arg(long, value_name = "LEVEL")]
    pub fail_on: Option<FailOnLevel>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .critic-consensus.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Generate a default .critic-consensus.toml configuration file
    #[arg(long)]
    pub init_config: bool,

    /// Print the selected rubric as TOML and exit
    #[arg(long)]
    pub print_rubric: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,
}

/// One `--critic NAME=FILE` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CriticArg {
    pub name: String,
    pub path: PathBuf,
}

fn parse_critic(value: &str) -> Result<CriticArg, String> {
    let (name, path) = value
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=FILE, got '{}'", value))?;
    let name = name.trim();
    if name.is_empty() {
        return Err("critic name must not be empty".to_string());
    }
    if path.is_empty() {
        return Err(format!("missing file for critic '{}'", name));
    }
    Ok(CriticArg {
        name: name.to_string(),
        path: PathBuf::from(path),
    })
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

/// Severity level for --fail-on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, clap::ValueEnum)]
pub enum FailOnLevel {
    Revise,
    Reject,
}

impl FailOnLevel {
    pub fn severity(self) -> Severity {
        match self {
            FailOnLevel::Revise => Severity::Revise,
            FailOnLevel::Reject => Severity::Reject,
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Whether the run only prints something and exits.
    pub fn is_informational(&self) -> bool {
        self.init_config || self.print_rubric
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.is_informational() {
            return Ok(());
        }

        if self.dir.is_none() && self.critics.is_empty() {
            return Err("Provide critic outputs with --dir or --critic".to_string());
        }

        if let Some(ref dir) = self.dir {
            if !dir.is_dir() {
                return Err(format!("Critic directory does not exist: {}", dir.display()));
            }
        }

        let mut names = HashSet::new();
        for critic in &self.critics {
            if !names.insert(critic.name.to_lowercase()) {
                return Err(format!("Critic '{}' given more than once", critic.name));
            }
        }

        if let Some(ref history) = self.history {
            if !history.is_dir() {
                return Err(format!(
                    "History directory does not exist: {}",
                    history.display()
                ));
            }
        }

        if let Some(ref draft) = self.draft {
            if !draft.is_file() {
                return Err(format!("Draft file does not exist: {}", draft.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
