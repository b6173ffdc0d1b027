//! Git integration layer for cfgsync
//!
//! Wraps git2 behind two handles: [`RepositoryManager`] validates, creates
//! and configures the settings repository, and [`GitStore`] is the open
//! repository a commit cycle diffs, stages and commits against.

pub mod commit;
pub mod diff;
pub mod progress;
pub mod remote;

#[cfg(test)]
pub(crate) mod test_support;

use crate::error::{CommitFailure, DiffError, Result, SyncError};
use commit::SyncStore;
use diff::{DiffAnalyzer, DiffSnapshot};
use git2::{ErrorCode, Repository, Signature};
use progress::ProgressSink;
use remote::RemoteUrl;
use std::path::{Path, PathBuf};

pub const DEFAULT_REMOTE_NAME: &str = "origin";

const FALLBACK_AUTHOR: &str = "cfgsync";
const FALLBACK_EMAIL: &str = "cfgsync@localhost";

/// Manages the settings repository at a fixed root
#[derive(Debug, Clone)]
pub struct RepositoryManager {
    root: PathBuf,
    remote_name: String,
}

impl RepositoryManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            remote_name: DEFAULT_REMOTE_NAME.to_string(),
        }
    }

    pub fn with_remote_name(mut self, name: impl Into<String>) -> Self {
        self.remote_name = name.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn remote_name(&self) -> &str {
        &self.remote_name
    }

    /// True iff `path` is an existing directory holding a repository that
    /// git2 can open. Does not mutate anything.
    pub fn is_valid_repository(path: &Path) -> bool {
        if !path.is_dir() {
            return false;
        }
        match Repository::open(path) {
            Ok(_) => true,
            Err(e) => {
                tracing::trace!(path = %path.display(), error = %e, "not a repository");
                false
            }
        }
    }

    /// Create an empty repository at `path`, creating parent directories.
    ///
    /// Callers guard against re-initializing an existing repository.
    pub fn init_repository(path: &Path) -> Result<()> {
        std::fs::create_dir_all(path).map_err(|e| SyncError::init(path, e))?;
        Repository::init(path).map_err(|e| SyncError::init(path, e.message()))?;
        tracing::info!(path = %path.display(), "initialized repository");
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        Self::is_valid_repository(&self.root)
    }

    pub fn init(&self) -> Result<()> {
        Self::init_repository(&self.root)
    }

    /// Initialize the root if needed. Returns whether an init happened.
    pub fn ensure_initialized(&self) -> Result<bool> {
        if self.is_valid() {
            return Ok(false);
        }
        self.init()?;
        Ok(true)
    }

    pub fn open(&self) -> Result<GitStore> {
        let repo = Repository::open(&self.root).map_err(|source| SyncError::Open {
            path: self.root.clone(),
            source,
        })?;
        Ok(GitStore { repo })
    }

    /// Persist the remote, or remove it for `None`.
    ///
    /// A local remote must already point at a valid repository.
    pub fn set_remote_repository_url(&self, url: Option<&RemoteUrl>) -> Result<()> {
        let store = self.open()?;
        let repo = &store.repo;
        let existing = match repo.find_remote(&self.remote_name) {
            Ok(_) => true,
            Err(e) if e.code() == ErrorCode::NotFound => false,
            Err(e) => return Err(SyncError::RemoteConfig(e)),
        };

        match url {
            Some(url) if existing => {
                repo.remote_set_url(&self.remote_name, url.as_str())
                    .map_err(SyncError::RemoteConfig)?;
            }
            Some(url) => {
                repo.remote(&self.remote_name, url.as_str())
                    .map_err(SyncError::RemoteConfig)?;
            }
            None if existing => {
                repo.remote_delete(&self.remote_name)
                    .map_err(SyncError::RemoteConfig)?;
            }
            None => {}
        }

        tracing::debug!(
            remote = %self.remote_name,
            url = url.map(RemoteUrl::as_str).unwrap_or(""),
            "remote updated"
        );
        Ok(())
    }

    /// Current remote URL, or an empty string when none is configured or
    /// the repository cannot be opened.
    pub fn get_remote_repository_url(&self) -> String {
        let Ok(repo) = Repository::open(&self.root) else {
            return String::new();
        };
        repo.find_remote(&self.remote_name)
            .ok()
            .and_then(|remote| remote.url().map(str::to_string))
            .unwrap_or_default()
    }
}

/// An open repository implementing the commit-cycle operations
pub struct GitStore {
    repo: Repository,
}

impl GitStore {
    /// Current branch name, `None` when HEAD is detached or unborn
    pub fn current_branch(&self) -> Option<String> {
        match self.repo.head() {
            Ok(head) if head.is_branch() => head.shorthand().map(str::to_string),
            Ok(_) => None,
            Err(_) => self
                .repo
                .find_reference("HEAD")
                .ok()
                .and_then(|r| r.symbolic_target().map(str::to_string))
                .map(|target| target.trim_start_matches("refs/heads/").to_string()),
        }
    }

    /// Short id of the last commit, `None` on an unborn branch
    pub fn head_commit(&self) -> Option<String> {
        let commit = self.repo.head().ok()?.peel_to_commit().ok()?;
        let id = commit.id().to_string();
        Some(id.chars().take(8).collect())
    }

    fn signature(&self) -> std::result::Result<Signature<'static>, git2::Error> {
        self.repo
            .signature()
            .or_else(|_| Signature::now(FALLBACK_AUTHOR, FALLBACK_EMAIL))
    }
}

impl SyncStore for GitStore {
    fn compute_diff(
        &self,
        progress: &dyn ProgressSink,
    ) -> std::result::Result<DiffSnapshot, DiffError> {
        DiffAnalyzer::new(&self.repo).compute(progress)
    }

    fn stage(&self, paths: &[String]) -> std::result::Result<(), CommitFailure> {
        let mut index = self.repo.index().map_err(CommitFailure::Write)?;
        index.read(false).map_err(CommitFailure::Write)?;

        for path in paths {
            tracing::trace!(path = %path, "add");
            index
                .add_path(Path::new(path))
                .map_err(|source| CommitFailure::Stage {
                    path: path.clone(),
                    source,
                })?;
        }

        index.write().map_err(CommitFailure::Write)
    }

    fn commit(&self, message: &str) -> std::result::Result<Option<String>, CommitFailure> {
        let mut index = self.repo.index().map_err(CommitFailure::Write)?;
        index.read(false).map_err(CommitFailure::Write)?;
        let tree_id = index.write_tree().map_err(CommitFailure::Write)?;

        let parent = match self.repo.head() {
            Ok(head) => Some(head.peel_to_commit().map_err(CommitFailure::Commit)?),
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => None,
            Err(e) => return Err(CommitFailure::Commit(e)),
        };

        let tree = self.repo.find_tree(tree_id).map_err(CommitFailure::Commit)?;
        let unchanged = match &parent {
            Some(parent) => parent.tree_id() == tree_id,
            None => tree.is_empty(),
        };
        if unchanged {
            return Ok(None);
        }

        let sig = self.signature().map_err(CommitFailure::Commit)?;
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        let oid = self
            .repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .map_err(CommitFailure::Commit)?;

        Ok(Some(oid.to_string()))
    }
}
