//! One synchronization cycle: diff, selective staging, commit
//!
//! The settings repository is an append-only log of restorable snapshots,
//! so commits carry a placeholder message unless one is configured.

use crate::config::SyncSettings;
use crate::error::{CommitFailure, DiffError, Result, SyncError};
use crate::git::diff::DiffSnapshot;
use crate::git::progress::ProgressSink;
use std::fmt;
use tracing::Level;

/// Repository operations a commit cycle needs.
///
/// Implemented by [`crate::git::GitStore`]; tests substitute a recording
/// fake to count stage and commit calls.
pub trait SyncStore {
    fn compute_diff(&self, progress: &dyn ProgressSink) -> Result<DiffSnapshot, DiffError>;

    /// Stage the given repository-relative paths as one index update
    fn stage(&self, paths: &[String]) -> Result<(), CommitFailure>;

    /// Commit the current index. Returns `None` when the index tree equals
    /// HEAD's tree and no commit was created.
    fn commit(&self, message: &str) -> Result<Option<String>, CommitFailure>;
}

/// Why a cycle did not produce a commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NothingToCommit,
    /// Only paths under the reserved prefix were modified
    OnlyReservedPaths,
    /// Another cycle for the same repository was in flight
    AlreadyRunning,
    /// Automatic commits are suspended while settings are being edited
    Suppressed,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::NothingToCommit => "nothing to commit",
            Self::OnlyReservedPaths => "only project-scoped paths were modified",
            Self::AlreadyRunning => "a sync is already running for this repository",
            Self::Suppressed => "automatic commits are suspended",
        };
        f.write_str(text)
    }
}

/// Result of one commit cycle
#[derive(Debug)]
pub enum CommitOutcome {
    Committed {
        id: String,
        /// Paths staged by this cycle's sweep (empty when the index already
        /// held the changes)
        staged: Vec<String>,
    },
    Skipped(SkipReason),
    Failed(SyncError),
}

impl CommitOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }
}

/// Orchestrates a single diff → stage → commit cycle
#[derive(Debug, Clone)]
pub struct CommitTask {
    reserved_prefix: String,
    message: String,
}

impl CommitTask {
    pub fn new(reserved_prefix: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            reserved_prefix: reserved_prefix.into(),
            message: message.into(),
        }
    }

    pub fn from_settings(settings: &SyncSettings) -> Self {
        let reserved_prefix = if settings.share_project_workspace {
            ""
        } else {
            settings.reserved_prefix.as_str()
        };
        Self::new(reserved_prefix, &settings.commit_message)
    }

    /// Whether `path` belongs to the project-scoped subtree left out of the sweep
    pub fn is_reserved(&self, path: &str) -> bool {
        !self.reserved_prefix.is_empty() && path.starts_with(&self.reserved_prefix)
    }

    /// Run one cycle. Errors are folded into [`CommitOutcome::Failed`].
    pub fn run(&self, store: &dyn SyncStore, progress: &dyn ProgressSink) -> CommitOutcome {
        match self.execute(store, progress) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::debug!(error = ?e, "commit cycle failed");
                CommitOutcome::Failed(e)
            }
        }
    }

    fn execute(&self, store: &dyn SyncStore, progress: &dyn ProgressSink) -> Result<CommitOutcome> {
        let diff = store.compute_diff(progress)?;

        if tracing::enabled!(Level::DEBUG) {
            tracing::debug!("{diff}");
        }

        let mut staged = Vec::new();
        if !diff.has_differences || diff.index_is_clean() {
            if diff.modified_on_disk.is_empty() {
                tracing::debug!("Skip scheduled commit, nothing to commit");
                return Ok(CommitOutcome::Skipped(SkipReason::NothingToCommit));
            }

            staged = diff
                .modified_on_disk
                .iter()
                .filter(|path| !self.is_reserved(path))
                .cloned()
                .collect();

            if staged.is_empty() {
                tracing::debug!(
                    prefix = %self.reserved_prefix,
                    "Skip scheduled commit, only reserved paths modified"
                );
                return Ok(CommitOutcome::Skipped(SkipReason::OnlyReservedPaths));
            }

            tracing::debug!(count = staged.len(), "staging modified files");
            store.stage(&staged)?;
        }

        tracing::debug!("Commit");
        match store.commit(&self.message)? {
            Some(id) => {
                tracing::info!(commit = %id, staged = staged.len(), "committed settings");
                Ok(CommitOutcome::Committed { id, staged })
            }
            None => {
                tracing::debug!("index matches HEAD, no commit created");
                Ok(CommitOutcome::Skipped(SkipReason::NothingToCommit))
            }
        }
    }
}
