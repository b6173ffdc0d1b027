//! Marker files under a repository's `.git` directory
//!
//! They let separate cfgsync processes see each other: `cfgsync.lock` is
//! held while a commit cycle runs, and `cfgsync-edit-<pid>` exists while a
//! process is editing settings. Markers older than [`STALE_AFTER`] are left
//! over from a crashed process and ignored.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

const LOCK_FILE: &str = "cfgsync.lock";
const EDIT_MARKER_PREFIX: &str = "cfgsync-edit-";
const STALE_AFTER: Duration = Duration::from_secs(60 * 60);

/// Key identifying a repository across contexts and schedulers
pub(crate) fn repository_key(root: &Path) -> PathBuf {
    fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf())
}

/// The `.git` directory of a working-tree repository, if there is one yet
pub(crate) fn metadata_dir(root: &Path) -> Option<PathBuf> {
    let dir = root.join(".git");
    dir.is_dir().then_some(dir)
}

fn is_stale(path: &Path) -> bool {
    fs::metadata(path)
        .and_then(|meta| meta.modified())
        .ok()
        .and_then(|modified| modified.elapsed().ok())
        .is_some_and(|age| age > STALE_AFTER)
}

/// Exclusive cycle lock, removed on drop
#[derive(Debug)]
pub(crate) struct CycleLock {
    path: PathBuf,
}

impl CycleLock {
    /// `Ok(None)` when another process holds the lock
    pub(crate) fn try_acquire(dir: &Path) -> io::Result<Option<Self>> {
        let path = dir.join(LOCK_FILE);
        let created = match create_exclusive(&path) {
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && is_stale(&path) => {
                tracing::warn!(path = %path.display(), "removing stale sync lock");
                fs::remove_file(&path)?;
                create_exclusive(&path)
            }
            result => result,
        };

        match created {
            Ok(()) => Ok(Some(Self { path })),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub(crate) fn is_held(dir: &Path) -> bool {
        let path = dir.join(LOCK_FILE);
        path.exists() && !is_stale(&path)
    }
}

impl Drop for CycleLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to remove sync lock");
        }
    }
}

fn create_exclusive(path: &Path) -> io::Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    writeln!(file, "{}", process::id())
}

/// This process's edit marker in `dir`
pub(crate) fn edit_marker(dir: &Path) -> PathBuf {
    dir.join(format!("{EDIT_MARKER_PREFIX}{}", process::id()))
}

/// Whether another process has an edit session open on the repository
pub(crate) fn foreign_edit_in_progress(dir: &Path) -> bool {
    let own = edit_marker(dir);
    let Ok(entries) = fs::read_dir(dir) else {
        return false;
    };
    entries.flatten().any(|entry| {
        let path = entry.path();
        entry.file_name().to_string_lossy().starts_with(EDIT_MARKER_PREFIX)
            && path != own
            && !is_stale(&path)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_lock_is_exclusive_and_released_on_drop() {
        let td = TempDir::new().unwrap();
        let lock = CycleLock::try_acquire(td.path()).unwrap();
        assert!(lock.is_some());
        assert!(CycleLock::is_held(td.path()));
        assert!(CycleLock::try_acquire(td.path()).unwrap().is_none());

        drop(lock);
        assert!(!CycleLock::is_held(td.path()));
        assert!(CycleLock::try_acquire(td.path()).unwrap().is_some());
    }

    #[test]
    fn test_own_edit_marker_is_not_foreign() {
        let td = TempDir::new().unwrap();
        fs::write(edit_marker(td.path()), "").unwrap();
        assert!(!foreign_edit_in_progress(td.path()));

        fs::write(td.path().join("cfgsync-edit-0"), "").unwrap();
        assert!(foreign_edit_in_progress(td.path()));
    }

    #[test]
    fn test_metadata_dir_requires_git_directory() {
        let td = TempDir::new().unwrap();
        assert!(metadata_dir(td.path()).is_none());
        fs::create_dir(td.path().join(".git")).unwrap();
        assert_eq!(metadata_dir(td.path()), Some(td.path().join(".git")));
    }
}
