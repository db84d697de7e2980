//! Critic output discovery.
//!
//! A critic directory holds one file per critic, named after the critic
//! (`claude.json`, `gpt.txt`, ...). A history directory holds one such
//! critic directory per past piece.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Configuration for critic file discovery.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// File extensions to include (e.g., ["json", "txt"])
    pub extensions: Vec<String>,
    /// File names to skip
    pub excludes: Vec<String>,
    /// Maximum file size in bytes
    pub max_file_size: u64,
    /// Critics listed here come first, in this order
    pub critic_order: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::from(&crate::config::CollectConfig::default())
    }
}

impl From<&crate::config::CollectConfig> for ScanConfig {
    fn from(config: &crate::config::CollectConfig) -> Self {
        Self {
            extensions: config.extensions.clone(),
            excludes: config.excludes.clone(),
            max_file_size: config.max_file_size,
            critic_order: config.critics.clone(),
        }
    }
}

/// A discovered critic output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    /// Critic name, taken from the file stem
    pub critic: String,
    /// Full path to the file
    pub path: PathBuf,
}

/// Scanner for critic output directories.
pub struct FileScanner {
    config: ScanConfig,
    root: PathBuf,
}

impl FileScanner {
    /// Create a new scanner rooted at a critic directory.
    pub fn new(root: PathBuf, config: ScanConfig) -> Self {
        Self { config, root }
    }

    /// Find one output file per critic, in critic order.
    ///
    /// Critics named in the configured order come first; the rest follow
    /// sorted by name. When two files share a stem, the one whose path
    /// sorts first is kept.
    pub fn scan(&self) -> Result<Vec<ScannedFile>> {
        if !self.root.is_dir() {
            anyhow::bail!("Critic directory not found: {}", self.root.display());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry
                .with_context(|| format!("Failed to read directory {}", self.root.display()))?;

            if !entry.file_type().is_file() || !self.matches(entry.path()) {
                continue;
            }

            let Some(critic) = entry.path().file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            if size > self.config.max_file_size {
                warn!(
                    "Skipping {}: {} bytes exceeds the {} byte limit",
                    entry.path().display(),
                    size,
                    self.config.max_file_size
                );
                continue;
            }

            files.push(ScannedFile {
                critic: critic.to_string(),
                path: entry.path().to_path_buf(),
            });
        }

        let mut seen = HashSet::new();
        files.retain(|f| {
            let first = seen.insert(f.critic.clone());
            if !first {
                warn!("Ignoring {}: critic {} already has a file", f.path.display(), f.critic);
            }
            first
        });

        files.sort_by(|a, b| self.order_key(&a.critic).cmp(&self.order_key(&b.critic)));
        debug!("Found {} critic files in {}", files.len(), self.root.display());

        Ok(files)
    }

    /// Sub-directories of the root, one per past piece, sorted by name.
    pub fn scan_history(&self) -> Result<Vec<PathBuf>> {
        if !self.root.is_dir() {
            anyhow::bail!("History directory not found: {}", self.root.display());
        }

        let mut dirs = Vec::new();
        for entry in WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry
                .with_context(|| format!("Failed to read directory {}", self.root.display()))?;
            let excluded = self.is_excluded(&entry.file_name().to_string_lossy());
            if entry.file_type().is_dir() && !excluded {
                dirs.push(entry.into_path());
            }
        }

        Ok(dirs)
    }

    /// Check if a file matches scan criteria.
    pub fn matches(&self, path: &Path) -> bool {
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if self.is_excluded(name) {
                return false;
            }
        }

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        self.config
            .extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(ext))
    }

    /// Hidden files and explicit excludes.
    fn is_excluded(&self, name: &str) -> bool {
        name.starts_with('.') || self.config.excludes.iter().any(|pattern| name == pattern)
    }

    /// Configured position first, then name.
    fn order_key<'a>(&self, critic: &'a str) -> (usize, &'a str) {
        let position = self
            .config
            .critic_order
            .iter()
            .position(|c| c.eq_ignore_ascii_case(critic))
            .unwrap_or(usize::MAX);
        (position, critic)
    }
}
