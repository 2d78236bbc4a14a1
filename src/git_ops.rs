//! Git sync for the timeline data file
//!
//! A `GitOps` is bound to one data file inside one working tree. Commits
//! stage only that file and are skipped when its blob already matches HEAD;
//! pulls only fast-forward and report whether the timeline itself changed.

use crate::timeline::TimelineData;
use anyhow::{Context, Result, anyhow, bail};
use git2::{AnnotatedCommit, Commit, ErrorCode, Oid, Repository, Signature, Time};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

const FALLBACK_NAME: &str = "CGT Timeline MCP Server";
const FALLBACK_EMAIL: &str = "cgt-timeline-mcp@localhost";

/// Result of committing the data file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed(Oid),
    /// The file matches HEAD; no commit was made
    Unchanged,
    /// The file is not inside a git working tree
    NotTracked,
}

/// Result of pulling from `origin`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullOutcome {
    UpToDate,
    FastForwarded { timeline_changed: bool },
    /// Nothing to pull: no repository, no `origin` or no local commit yet
    Skipped,
}

struct TrackedFile {
    repo: Mutex<Repository>,
    /// Data file path relative to the working directory
    relative: PathBuf,
}

/// Git operations for the repository that holds the timeline file, if any
pub struct GitOps {
    tracked: Option<TrackedFile>,
}

/// Path of `file_path` inside `workdir`, resolving symlinks on both sides
///
/// The file itself may not exist yet; its directory must.
fn relative_to_workdir(workdir: &Path, file_path: &Path) -> Option<PathBuf> {
    let workdir = workdir.canonicalize().ok()?;
    let dir = match file_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.canonicalize().ok()?,
        _ => Path::new(".").canonicalize().ok()?,
    };
    let name = file_path.file_name()?;
    dir.strip_prefix(&workdir).ok().map(|inner| inner.join(name))
}

fn head_commit(repo: &Repository) -> Result<Option<Commit<'_>>> {
    match repo.head() {
        Ok(head) => Ok(Some(head.peel_to_commit()?)),
        Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn current_branch(repo: &Repository) -> Result<String> {
    let head = repo.head().context("Repository has no HEAD")?;
    head.shorthand()
        .map(str::to_string)
        .context("HEAD is not on a branch")
}

/// Blob id of the timeline file in `commit`, `None` if it is not there
fn timeline_blob(repo: &Repository, commit: Oid, relative: &Path) -> Result<Option<Oid>> {
    let tree = repo.find_commit(commit)?.tree()?;
    match tree.get_path(relative) {
        Ok(entry) => Ok(Some(entry.id())),
        Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn fast_forward(repo: &Repository, branch: &str, target: &AnnotatedCommit) -> Result<()> {
    let refname = format!("refs/heads/{}", branch);
    repo.reference(&refname, target.id(), true, "cgt-timeline: fast-forward")?;
    repo.set_head(&refname)?;
    repo.checkout_head(Some(git2::build::CheckoutBuilder::default().force()))?;
    Ok(())
}

/// Commit identity from the repository config, or the server's own
fn signature(repo: &Repository) -> Result<Signature<'static>> {
    let config = repo.config()?;
    let name = config
        .get_string("user.name")
        .unwrap_or_else(|_| FALLBACK_NAME.to_string());
    let email = config
        .get_string("user.email")
        .unwrap_or_else(|_| FALLBACK_EMAIL.to_string());

    Signature::now(&name, &email).or_else(|_| {
        Signature::new(&name, &email, &Time::new(1_700_000_000, 0))
            .context("Failed to create commit signature")
    })
}

/// Commit message: the tool's summary line plus the timeline's size
pub fn timeline_commit_message(summary: &str, data: &TimelineData) -> String {
    format!(
        "{}\n\n{} properties, {} events",
        summary,
        data.properties().len(),
        data.events().len()
    )
}

impl GitOps {
    /// Bind to the working tree containing `file_path`
    ///
    /// A path outside any working tree (or inside a bare repository) is
    /// simply not tracked.
    pub fn new(file_path: &Path) -> Self {
        let search_from = match file_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let tracked = Repository::discover(search_from).ok().and_then(|repo| {
            let relative = relative_to_workdir(repo.workdir()?, file_path)?;
            debug!(file = %relative.display(), "timeline file is tracked by git");
            Some(TrackedFile {
                repo: Mutex::new(repo),
                relative,
            })
        });
        Self { tracked }
    }

    /// Check if the file is under git version control
    pub fn is_git_managed(&self) -> bool {
        self.tracked.is_some()
    }

    fn open(&self) -> Result<Option<(MutexGuard<'_, Repository>, &Path)>> {
        let Some(tracked) = &self.tracked else {
            return Ok(None);
        };
        let repo = tracked
            .repo
            .lock()
            .map_err(|_| anyhow!("Git repository lock poisoned"))?;
        Ok(Some((repo, tracked.relative.as_path())))
    }

    /// Whether the repository has an `origin` remote to pull from and push to
    pub fn has_origin(&self) -> Result<bool> {
        let Some((repo, _)) = self.open()? else {
            return Ok(false);
        };
        Ok(repo.find_remote("origin").is_ok())
    }

    /// Fast-forward the current branch to `origin`
    ///
    /// Diverged history is an error; the timeline is never merged
    /// automatically.
    pub fn pull(&self) -> Result<PullOutcome> {
        let Some((repo, relative)) = self.open()? else {
            return Ok(PullOutcome::Skipped);
        };
        let Some(local) = head_commit(&repo)?.map(|c| c.id()) else {
            return Ok(PullOutcome::Skipped);
        };
        let Ok(mut origin) = repo.find_remote("origin") else {
            return Ok(PullOutcome::Skipped);
        };

        let branch = current_branch(&repo)?;
        origin
            .fetch(&[&branch], None, None)
            .with_context(|| format!("Failed to fetch {} from origin", branch))?;
        let fetched = repo.reference_to_annotated_commit(&repo.find_reference("FETCH_HEAD")?)?;

        let (analysis, _) = repo.merge_analysis(&[&fetched])?;
        if analysis.is_up_to_date() {
            return Ok(PullOutcome::UpToDate);
        }
        if !analysis.is_fast_forward() {
            bail!(
                "Timeline history has diverged from origin/{}; merge it manually",
                branch
            );
        }

        let before = timeline_blob(&repo, local, relative)?;
        let after = timeline_blob(&repo, fetched.id(), relative)?;
        fast_forward(&repo, &branch, &fetched)?;
        let timeline_changed = before != after;
        debug!(branch = %branch, timeline_changed, "fast-forwarded to origin");
        Ok(PullOutcome::FastForwarded { timeline_changed })
    }

    /// Stage the timeline file and commit it if it differs from HEAD
    pub fn commit(&self, message: &str) -> Result<CommitOutcome> {
        let Some((repo, relative)) = self.open()? else {
            return Ok(CommitOutcome::NotTracked);
        };

        let mut index = repo.index()?;
        index
            .add_path(relative)
            .with_context(|| format!("Failed to stage {}", relative.display()))?;
        index.write()?;

        let parent = head_commit(&repo)?;
        let staged = index.get_path(relative, 0).map(|entry| entry.id);
        if let Some(parent) = &parent
            && timeline_blob(&repo, parent.id(), relative)? == staged
        {
            debug!("timeline matches HEAD, skipping commit");
            return Ok(CommitOutcome::Unchanged);
        }

        let tree = repo.find_tree(index.write_tree()?)?;
        let signature = signature(&repo)?;
        let parents: Vec<&Commit> = parent.iter().collect();
        let oid = repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            message,
            &tree,
            &parents,
        )?;
        debug!(%oid, "committed timeline");
        Ok(CommitOutcome::Committed(oid))
    }

    /// Push the current branch to `origin`
    pub fn push(&self) -> Result<()> {
        let Some((repo, _)) = self.open()? else {
            return Ok(());
        };
        let branch = current_branch(&repo)?;
        let mut origin = repo
            .find_remote("origin")
            .context("No remote named 'origin'")?;
        let refspec = format!("refs/heads/{0}:refs/heads/{0}", branch);
        origin
            .push(&[&refspec], None)
            .with_context(|| format!("Failed to push {} to origin", branch))?;
        debug!(branch = %branch, "pushed timeline");
        Ok(())
    }

    /// Pull, commit, then push when something was committed
    ///
    /// Without an `origin` remote this is a local commit only.
    pub fn sync(&self, message: &str) -> Result<CommitOutcome> {
        let remote = self.has_origin()?;
        if remote {
            self.pull().context("Failed to pull before commit")?;
        }
        let outcome = self.commit(message).context("Failed to commit timeline")?;
        if remote && matches!(outcome, CommitOutcome::Committed(_)) {
            self.push()?;
        }
        Ok(outcome)
    }

    /// The timeline as committed at HEAD, if the file is tracked there
    pub fn committed_timeline(&self) -> Result<Option<TimelineData>> {
        let Some((repo, relative)) = self.open()? else {
            return Ok(None);
        };
        let Some(head) = head_commit(&repo)? else {
            return Ok(None);
        };
        let Some(blob) = timeline_blob(&repo, head.id(), relative)? else {
            return Ok(None);
        };
        let blob = repo.find_blob(blob)?;
        let content =
            std::str::from_utf8(blob.content()).context("Committed timeline is not UTF-8")?;
        let data = toml::from_str(content).context("Failed to parse committed timeline")?;
        Ok(Some(data))
    }
}
