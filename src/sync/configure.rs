//! Remote configuration flow
//!
//! Validates a user-supplied remote, asks before initializing a missing
//! local repository, then persists it. Nothing is written unless every
//! check passes and the user agrees.

use super::context::SyncContext;
use crate::error::{Result, SyncError};
use crate::git::RepositoryManager;
use crate::git::remote::{RemoteUrl, classify};

/// User interaction needed by the configuration flow
pub trait ConfirmationPort {
    fn confirm(&self, question: &str) -> bool;

    fn report_error(&self, message: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigureOutcome {
    Applied {
        /// `None` when the remote was cleared
        remote: Option<RemoteUrl>,
        /// A local repository was created for the remote
        initialized: bool,
    },
    /// The user declined to initialize the local target; nothing changed
    Declined,
}

/// Whether `raw` is worth running a sync against
pub fn is_syncable_url(raw: &str) -> bool {
    raw.trim().chars().count() > 1
}

/// Validate and save the remote for the context's repository.
///
/// `None` or a blank string clears the remote. Runs as an edit session, so
/// automatic commits are held off until it returns. Errors are reported
/// through `port` and also returned.
pub fn save_remote_url(
    ctx: &SyncContext,
    raw: Option<&str>,
    port: &dyn ConfirmationPort,
) -> Result<ConfigureOutcome> {
    ctx.edit_session(|ctx| {
        let result = apply(ctx, raw, port);
        if let Err(e) = &result {
            tracing::debug!(error = ?e, "remote configuration rejected");
            port.report_error(&e.to_string());
        }
        result
    })
}

fn apply(
    ctx: &SyncContext,
    raw: Option<&str>,
    port: &dyn ConfirmationPort,
) -> Result<ConfigureOutcome> {
    let remote = match raw {
        Some(raw) => classify(raw)?,
        None => None,
    };

    let mut initialized = false;
    if let Some(path) = remote.as_ref().and_then(RemoteUrl::local_path) {
        if path.exists() && !path.is_dir() {
            return Err(SyncError::InvalidPath {
                path: path.to_path_buf(),
            });
        }

        if !RepositoryManager::is_valid_repository(path) {
            let question = format!(
                "Directory {} is not a repository. Initialize a new repository there?",
                path.display()
            );
            if !port.confirm(&question) {
                tracing::debug!(path = %path.display(), "repository init declined");
                return Ok(ConfigureOutcome::Declined);
            }
            RepositoryManager::init_repository(path)?;
            initialized = true;
        }
    }

    if ctx.manager().ensure_initialized()? {
        tracing::info!(root = %ctx.manager().root().display(), "created settings repository");
    }
    ctx.manager().set_remote_repository_url(remote.as_ref())?;

    Ok(ConfigureOutcome::Applied {
        remote,
        initialized,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncConfig;
    use crate::git::test_support::init_temp_repo;
    use std::cell::{Cell, RefCell};
    use tempfile::TempDir;

    struct FakePort {
        answer: bool,
        questions: Cell<usize>,
        errors: RefCell<Vec<String>>,
    }

    impl FakePort {
        fn answering(answer: bool) -> Self {
            Self {
                answer,
                questions: Cell::new(0),
                errors: RefCell::new(Vec::new()),
            }
        }
    }

    impl ConfirmationPort for FakePort {
        fn confirm(&self, _question: &str) -> bool {
            self.questions.set(self.questions.get() + 1);
            self.answer
        }

        fn report_error(&self, message: &str) {
            self.errors.borrow_mut().push(message.to_string());
        }
    }

    fn settings_context() -> (TempDir, SyncContext) {
        let (td, _repo) = init_temp_repo();
        let ctx = SyncContext::new(SyncConfig::default(), td.path());
        (td, ctx)
    }

    #[test]
    fn test_ssh_rejected_and_remote_unchanged() {
        let (_td, ctx) = settings_context();
        let https = "https://example.com/settings.git";
        save_remote_url(&ctx, Some(https), &FakePort::answering(true)).unwrap();

        let port = FakePort::answering(true);
        let err = save_remote_url(&ctx, Some("ssh://git@host/repo.git"), &port).unwrap_err();
        assert!(matches!(err, SyncError::UnsupportedScheme { .. }));
        assert_eq!(port.errors.borrow().len(), 1);
        assert_eq!(port.questions.get(), 0);
        assert_eq!(ctx.manager().get_remote_repository_url(), https);
    }

    #[test]
    fn test_missing_local_target_initialized_after_confirmation() {
        let (_td, ctx) = settings_context();
        let remote_dir = TempDir::new().unwrap();
        let target = remote_dir.path().join("cfg");
        let raw = format!("file://{}", target.display());

        let port = FakePort::answering(true);
        let outcome = save_remote_url(&ctx, Some(raw.as_str()), &port).unwrap();

        assert!(matches!(outcome, ConfigureOutcome::Applied { initialized: true, .. }));
        assert_eq!(port.questions.get(), 1);
        assert!(RepositoryManager::is_valid_repository(&target));
        assert_eq!(
            ctx.manager().get_remote_repository_url(),
            target.display().to_string()
        );
    }

    #[test]
    fn test_declined_leaves_everything_untouched() {
        let (_td, ctx) = settings_context();
        let remote_dir = TempDir::new().unwrap();
        let target = remote_dir.path().join("cfg");

        let port = FakePort::answering(false);
        let outcome =
            save_remote_url(&ctx, Some(target.to_string_lossy().as_ref()), &port).unwrap();

        assert_eq!(outcome, ConfigureOutcome::Declined);
        assert!(!target.exists());
        assert_eq!(ctx.manager().get_remote_repository_url(), "");
        assert!(!ctx.suppression().is_suppressed());
    }

    #[test]
    fn test_valid_local_repository_needs_no_prompt() {
        let (_td, ctx) = settings_context();
        let (remote_td, _remote) = init_temp_repo();

        let port = FakePort::answering(false);
        let raw = format!("{}/.git", remote_td.path().display());
        let outcome = save_remote_url(&ctx, Some(raw.as_str()), &port).unwrap();

        assert!(matches!(outcome, ConfigureOutcome::Applied { initialized: false, .. }));
        assert_eq!(port.questions.get(), 0);
    }

    #[test]
    fn test_file_target_is_invalid_path() {
        let (_td, ctx) = settings_context();
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("settings.jar");
        std::fs::write(&file, "x").unwrap();

        let port = FakePort::answering(true);
        let err = save_remote_url(&ctx, Some(file.to_string_lossy().as_ref()), &port).unwrap_err();

        assert!(matches!(err, SyncError::InvalidPath { .. }));
        assert_eq!(port.questions.get(), 0);
        assert!(port.errors.borrow()[0].contains("not a directory"));
    }

    #[test]
    fn test_file_scheme_without_path_rejected_before_prompt() {
        let (_td, ctx) = settings_context();
        let port = FakePort::answering(true);

        let err = save_remote_url(&ctx, Some("file://"), &port).unwrap_err();
        assert!(matches!(err, SyncError::EmptyLocalPath { .. }));
        assert_eq!(port.questions.get(), 0);
        assert_eq!(port.errors.borrow().len(), 1);
        assert_eq!(ctx.manager().get_remote_repository_url(), "");
    }

    #[test]
    fn test_clear_remote() {
        let (_td, ctx) = settings_context();
        let port = FakePort::answering(true);
        save_remote_url(&ctx, Some("https://example.com/s.git"), &port).unwrap();

        let outcome = save_remote_url(&ctx, None, &port).unwrap();
        assert_eq!(
            outcome,
            ConfigureOutcome::Applied {
                remote: None,
                initialized: false
            }
        );
        assert_eq!(ctx.manager().get_remote_repository_url(), "");
    }

    #[test]
    fn test_settings_repository_created_on_first_save() {
        let td = TempDir::new().unwrap();
        let root = td.path().join("settings");
        let ctx = SyncContext::new(SyncConfig::default(), &root);

        save_remote_url(&ctx, Some("https://example.com/s.git"), &FakePort::answering(true))
            .unwrap();
        assert!(ctx.manager().is_valid());
        assert_eq!(
            ctx.manager().get_remote_repository_url(),
            "https://example.com/s.git"
        );
    }

    #[test]
    fn test_is_syncable_url() {
        assert!(!is_syncable_url(""));
        assert!(!is_syncable_url("  x "));
        assert!(is_syncable_url("/a"));
        assert!(is_syncable_url("https://example.com/s.git"));
    }
}
