//! TOML persistence for the timeline, with optional git sync

use crate::git_ops::{CommitOutcome, GitOps, PullOutcome, timeline_commit_message};
use crate::timeline::TimelineData;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub struct Storage {
    file_path: PathBuf,
    git_ops: GitOps,
    sync_git: bool,
}

impl Storage {
    /// Create storage for a data file
    ///
    /// # Arguments
    /// * `file_path` - Path to the timeline TOML file
    /// * `sync_git` - Commit and push the file after each save when it lives
    ///   in a git repository
    pub fn new(file_path: impl AsRef<Path>, sync_git: bool) -> Self {
        // Commits need the path relative to the repository root
        let file_path = std::path::absolute(file_path.as_ref())
            .unwrap_or_else(|_| file_path.as_ref().to_path_buf());
        let git_ops = GitOps::new(&file_path);
        if sync_git && !git_ops.is_git_managed() {
            warn!(
                path = %file_path.display(),
                "git sync requested but the data file is not inside a git repository"
            );
        }
        Self {
            file_path,
            git_ops,
            sync_git,
        }
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    fn syncing(&self) -> bool {
        self.sync_git && self.git_ops.is_git_managed()
    }

    /// Load the timeline; a missing or empty file gives an empty timeline
    pub fn load(&self) -> Result<TimelineData> {
        if self.syncing() {
            match self.git_ops.pull() {
                Ok(PullOutcome::FastForwarded { timeline_changed }) => {
                    info!(timeline_changed, "pulled timeline from origin")
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "git pull before load failed"),
            }
        }

        if !self.file_path.exists() {
            return Ok(TimelineData::new());
        }

        let content = fs::read_to_string(&self.file_path)
            .with_context(|| format!("Failed to read {}", self.file_path.display()))?;
        if content.trim().is_empty() {
            return Ok(TimelineData::new());
        }
        let data: TimelineData = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", self.file_path.display()))?;
        info!(
            properties = data.properties().len(),
            events = data.events().len(),
            "loaded timeline"
        );
        Ok(data)
    }

    /// Save with a generic commit message
    pub fn save(&self, data: &TimelineData) -> Result<()> {
        self.save_with_message(data, "Update timeline")
    }

    /// Write the file, then commit (and push, with an `origin`) when git
    /// sync is on
    ///
    /// Git failures are logged and do not fail the save.
    pub fn save_with_message(&self, data: &TimelineData, message: &str) -> Result<()> {
        let content = toml::to_string_pretty(data).context("Failed to serialize timeline")?;
        fs::write(&self.file_path, content)
            .with_context(|| format!("Failed to write {}", self.file_path.display()))?;
        info!(message, "saved timeline");

        if !self.syncing() {
            return Ok(());
        }
        match self.git_ops.sync(&timeline_commit_message(message, data)) {
            Ok(CommitOutcome::Unchanged) => debug!(message, "nothing new to commit"),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "git sync after save failed"),
        }
        Ok(())
    }

    /// The timeline as last committed, when the file is tracked by git
    pub fn committed(&self) -> Result<Option<TimelineData>> {
        self.git_ops.committed_timeline()
    }

    /// Push any outstanding commits before exit
    pub fn shutdown(&self) -> Result<()> {
        if self.syncing() && self.git_ops.has_origin()? {
            self.git_ops.push().context("Failed to push on shutdown")?;
        }
        Ok(())
    }
}
