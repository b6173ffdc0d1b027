use super::lock;
use crate::config::SyncConfig;
use crate::git::RepositoryManager;
use crate::git::commit::CommitTask;
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

lazy_static! {
    /// Edit session depth per repository, shared by every context in the process
    static ref SUPPRESSION_DEPTH: Mutex<HashMap<PathBuf, Arc<AtomicUsize>>> =
        Mutex::new(HashMap::new());
}

/// Everything an engine call needs, passed explicitly.
///
/// Cheap to clone. All contexts for one repository share its suppression
/// state.
#[derive(Debug, Clone)]
pub struct SyncContext {
    manager: RepositoryManager,
    config: Arc<SyncConfig>,
    suppression: AutoCommitSuppression,
}

impl SyncContext {
    pub fn new(config: SyncConfig, root: impl Into<PathBuf>) -> Self {
        let manager =
            RepositoryManager::new(root).with_remote_name(&config.repository.remote_name);
        let suppression = AutoCommitSuppression::for_repository(manager.root());
        Self {
            manager,
            config: Arc::new(config),
            suppression,
        }
    }

    pub fn manager(&self) -> &RepositoryManager {
        &self.manager
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn suppression(&self) -> &AutoCommitSuppression {
        &self.suppression
    }

    pub fn commit_task(&self) -> CommitTask {
        CommitTask::from_settings(&self.config.sync)
    }

    /// Run `f` with automatic commits suspended. The suspension ends when
    /// `f` returns or unwinds.
    pub fn edit_session<T>(&self, f: impl FnOnce(&Self) -> T) -> T {
        let _guard = self.suppression.acquire();
        f(self)
    }
}

/// Switch that holds off automatic commits while settings are being edited.
/// Nested sessions are counted.
///
/// A flag bound to a repository is shared by the whole process, and while
/// it is held an edit marker in the repository's `.git` directory tells
/// other cfgsync processes to hold off too. A default flag is standalone.
#[derive(Debug, Clone, Default)]
pub struct AutoCommitSuppression {
    depth: Arc<AtomicUsize>,
    root: Option<PathBuf>,
}

impl AutoCommitSuppression {
    pub fn for_repository(root: &Path) -> Self {
        let depth = SUPPRESSION_DEPTH
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(lock::repository_key(root))
            .or_default()
            .clone();
        Self {
            depth,
            root: Some(root.to_path_buf()),
        }
    }

    pub fn acquire(&self) -> SuppressionGuard {
        let marker = self
            .root
            .as_deref()
            .and_then(lock::metadata_dir)
            .map(|dir| lock::edit_marker(&dir));

        let depth = self.depth.fetch_add(1, Ordering::SeqCst) + 1;
        if depth == 1 {
            if let Some(path) = &marker {
                if let Err(e) = fs::write(path, std::process::id().to_string()) {
                    tracing::warn!(path = %path.display(), error = %e, "cannot write edit marker");
                }
            }
        }
        tracing::trace!(depth, "auto-commit suppressed");

        SuppressionGuard {
            depth: self.depth.clone(),
            marker,
        }
    }

    pub fn is_suppressed(&self) -> bool {
        self.depth.load(Ordering::SeqCst) > 0
            || self
                .root
                .as_deref()
                .and_then(lock::metadata_dir)
                .is_some_and(|dir| lock::foreign_edit_in_progress(&dir))
    }
}

/// Releases one level of suppression on drop
#[must_use = "suppression ends as soon as the guard is dropped"]
#[derive(Debug)]
pub struct SuppressionGuard {
    depth: Arc<AtomicUsize>,
    marker: Option<PathBuf>,
}

impl Drop for SuppressionGuard {
    fn drop(&mut self) {
        let previous = self.depth.fetch_sub(1, Ordering::SeqCst);
        if previous == 1 {
            if let Some(path) = &self.marker {
                // absent when the write failed
                let _ = fs::remove_file(path);
            }
        }
        tracing::trace!(depth = previous - 1, "auto-commit suppression released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::test_support::init_temp_repo;
    use tempfile::TempDir;

    #[test]
    fn test_guard_releases_on_drop() {
        let suppression = AutoCommitSuppression::default();
        assert!(!suppression.is_suppressed());
        {
            let _guard = suppression.acquire();
            assert!(suppression.is_suppressed());
        }
        assert!(!suppression.is_suppressed());
    }

    #[test]
    fn test_nested_guards() {
        let suppression = AutoCommitSuppression::default();
        let outer = suppression.acquire();
        let inner = suppression.acquire();
        drop(outer);
        assert!(suppression.is_suppressed());
        drop(inner);
        assert!(!suppression.is_suppressed());
    }

    #[test]
    fn test_edit_session_released_after_panic() {
        let td = TempDir::new().unwrap();
        let ctx = SyncContext::new(SyncConfig::default(), td.path());
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            ctx.edit_session(|ctx| {
                assert!(ctx.suppression().is_suppressed());
                panic!("editing aborted");
            })
        }));
        assert!(result.is_err());
        assert!(!ctx.suppression().is_suppressed());
    }

    #[test]
    fn test_contexts_for_same_repository_share_suppression() {
        let td = TempDir::new().unwrap();
        let ctx = SyncContext::new(SyncConfig::default(), td.path());
        let other = SyncContext::new(SyncConfig::default(), td.path());
        let unrelated_dir = TempDir::new().unwrap();
        let unrelated = SyncContext::new(SyncConfig::default(), unrelated_dir.path());

        ctx.edit_session(|_| {
            assert!(other.suppression().is_suppressed());
            assert!(!unrelated.suppression().is_suppressed());
        });
        assert!(!other.suppression().is_suppressed());
    }

    #[test]
    fn test_edit_marker_lives_for_the_session() {
        let (td, _repo) = init_temp_repo();
        let ctx = SyncContext::new(SyncConfig::default(), td.path());
        let marker = lock::edit_marker(&td.path().join(".git"));

        ctx.edit_session(|ctx| {
            assert!(marker.exists());
            let _nested = ctx.suppression().acquire();
        });
        assert!(!marker.exists());
    }

    #[test]
    fn test_edit_marker_from_another_process_suppresses() {
        let (td, _repo) = init_temp_repo();
        let ctx = SyncContext::new(SyncConfig::default(), td.path());
        assert!(!ctx.suppression().is_suppressed());

        let foreign = td.path().join(".git").join("cfgsync-edit-0");
        fs::write(&foreign, "0").unwrap();
        assert!(ctx.suppression().is_suppressed());

        fs::remove_file(&foreign).unwrap();
        assert!(!ctx.suppression().is_suppressed());
    }

    #[test]
    fn test_manager_uses_configured_remote_name() {
        let mut config = SyncConfig::default();
        config.repository.remote_name = "backup".to_string();
        let ctx = SyncContext::new(config, "/nonexistent/settings");
        assert_eq!(ctx.manager().remote_name(), "backup");
    }
}
