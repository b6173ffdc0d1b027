//! Error types for the synchronization engine
//!
//! Configuration errors (unsupported scheme, invalid path, init, remote
//! config) block a configuration change entirely. Diff and commit errors
//! are scoped to a single sync cycle.

use std::path::PathBuf;

/// Errors raised while computing the index/working tree diff.
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    /// The underlying store failed (corrupted index, unreadable objects, ...)
    #[error("failed to compute diff: {0}")]
    Git(#[from] git2::Error),

    /// The progress sink requested cancellation
    #[error("diff computation was cancelled")]
    Cancelled,

    /// The repository has no working tree to compare against
    #[error("repository at {0} has no working directory")]
    BareRepository(PathBuf),
}

/// Errors raised while staging or committing.
#[derive(Debug, thiserror::Error)]
pub enum CommitFailure {
    #[error("failed to stage {path}: {source}")]
    Stage {
        path: String,
        #[source]
        source: git2::Error,
    },

    #[error("failed to write index: {0}")]
    Write(#[source] git2::Error),

    #[error("failed to create commit: {0}")]
    Commit(#[source] git2::Error),
}

/// Top-level error type for the synchronization engine.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Remote URL uses a transport we refuse to talk to
    #[error("{scheme} URLs are not supported, please use HTTP/HTTPS or a local path")]
    UnsupportedScheme { scheme: String },

    /// Local remote target exists but is not a directory
    #[error("specified path is not a directory: {}", path.display())]
    InvalidPath { path: PathBuf },

    /// A `file:` remote with nothing after the scheme
    #[error("remote {url} does not name a directory")]
    EmptyLocalPath { url: String },

    /// Creating a new repository failed
    #[error("failed to initialize repository at {}: {message}", path.display())]
    Init { path: PathBuf, message: String },

    /// The store rejected the remote configuration
    #[error("failed to set remote: {0}")]
    RemoteConfig(#[source] git2::Error),

    /// Opening the configured repository failed
    #[error("failed to open repository at {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: git2::Error,
    },

    #[error(transparent)]
    Diff(#[from] DiffError),

    #[error(transparent)]
    Commit(#[from] CommitFailure),

    /// The background worker running the cycle panicked or was aborted
    #[error("sync worker failed: {0}")]
    Worker(String),
}

impl SyncError {
    /// Create an init error from any displayable cause
    pub fn init(path: impl Into<PathBuf>, cause: impl std::fmt::Display) -> Self {
        Self::Init {
            path: path.into(),
            message: cause.to_string(),
        }
    }

    /// Create an unsupported scheme error
    pub fn unsupported_scheme(scheme: impl Into<String>) -> Self {
        Self::UnsupportedScheme {
            scheme: scheme.into(),
        }
    }
}

/// Result type alias for engine operations
pub type Result<T, E = SyncError> = std::result::Result<T, E>;
