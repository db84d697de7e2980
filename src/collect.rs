//! Critic output collection.
//!
//! Reads every critic's captured output concurrently. A critic whose
//! output cannot be read is never dropped: it is represented by a failure
//! sentinel so the consensus engine excludes it like any other failed
//! critic.

use crate::analysis::ConsensusEngine;
use crate::config::CollectConfig;
use crate::models::{CriticResponse, Tenths};
use crate::scanner::{FileScanner, ScanConfig, ScannedFile};
use anyhow::Result;
use futures::future::join_all;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Where one critic's output lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CriticSource {
    pub critic: String,
    pub path: PathBuf,
}

impl CriticSource {
    pub fn new(critic: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            critic: critic.into(),
            path: path.into(),
        }
    }
}

impl From<ScannedFile> for CriticSource {
    fn from(file: ScannedFile) -> Self {
        Self {
            critic: file.critic,
            path: file.path,
        }
    }
}

/// Fixed-delay retry with a bounded number of extra attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: usize,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            delay: Duration::from_millis(250),
        }
    }
}

impl From<&CollectConfig> for RetryPolicy {
    fn from(config: &CollectConfig) -> Self {
        Self {
            max_retries: config.retries,
            delay: config.retry_delay(),
        }
    }
}

/// Sentinel text for a critic whose output could not be acquired.
pub fn failure_text(critic: &str, reason: &str) -> String {
    format!("{} evaluation failed: {}", critic, reason)
}

/// Read one critic's output, retrying on error.
pub async fn read_critic(source: &CriticSource, policy: &RetryPolicy) -> CriticResponse {
    let mut attempt = 0;
    loop {
        match tokio::fs::read_to_string(&source.path).await {
            Ok(text) => {
                debug!(
                    "Read {} bytes for critic {} from {}",
                    text.len(),
                    source.critic,
                    source.path.display()
                );
                return CriticResponse::new(source.critic.clone(), text);
            }
            Err(e) if attempt < policy.max_retries => {
                attempt += 1;
                warn!(
                    "Reading {} for critic {} failed ({}), retry {}/{}",
                    source.path.display(),
                    source.critic,
                    e,
                    attempt,
                    policy.max_retries
                );
                tokio::time::sleep(policy.delay).await;
            }
            Err(e) => {
                warn!("Giving up on critic {}: {}", source.critic, e);
                return CriticResponse::new(
                    source.critic.clone(),
                    failure_text(&source.critic, &e.to_string()),
                );
            }
        }
    }
}

/// Read every critic concurrently. Output order matches input order.
pub async fn collect_critiques(sources: &[CriticSource], policy: &RetryPolicy) -> Vec<CriticResponse> {
    let responses = join_all(sources.iter().map(|s| read_critic(s, policy))).await;
    info!("Collected {} critic responses", responses.len());
    responses
}

/// Critic sources discovered in a directory.
pub fn discover(dir: &Path, scan_config: &ScanConfig) -> Result<Vec<CriticSource>> {
    let scanner = FileScanner::new(dir.to_path_buf(), scan_config.clone());
    Ok(scanner.scan()?.into_iter().map(CriticSource::from).collect())
}

/// Overall scores of past pieces, one critic directory per piece.
///
/// Pieces without an overall score are skipped.
pub async fn collect_history(
    engine: &ConsensusEngine,
    history_dir: &Path,
    scan_config: &ScanConfig,
    policy: &RetryPolicy,
) -> Result<Vec<Tenths>> {
    let scanner = FileScanner::new(history_dir.to_path_buf(), scan_config.clone());
    let mut scores = Vec::new();

    for piece in scanner.scan_history()? {
        let sources = discover(&piece, scan_config)?;
        let responses = collect_critiques(&sources, policy).await;
        let result = engine.evaluate(&responses);
        match result.overall_score {
            Some(score) => scores.push(score),
            None => debug!("No overall score for past piece {}", piece.display()),
        }
    }

    info!("Historical scores: {} piece(s)", scores.len());
    Ok(scores)
}
