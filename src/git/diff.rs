//! Index / working tree diff
//!
//! Compares HEAD with the index and the index with the working tree and
//! sorts every path into one of six categories. The computation is purely
//! observational: neither the index nor the working tree is written.

use crate::error::DiffError;
use crate::git::progress::ProgressSink;
use git2::{Delta, DiffDelta, DiffOptions, ErrorCode, Repository, Tree};
use std::collections::BTreeSet;
use std::fmt;

/// Categorized result of one diff computation.
///
/// Paths are repository-relative and `/`-separated. A path appears in at
/// most one set: when a file is both staged and further modified on disk it
/// is reported only in its index-side category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffSnapshot {
    /// In the index, not in HEAD
    pub added: BTreeSet<String>,
    /// In HEAD and the index, with different content
    pub changed: BTreeSet<String>,
    /// In HEAD, not in the index
    pub removed: BTreeSet<String>,
    /// Tracked by the index, different on disk
    pub modified_on_disk: BTreeSet<String>,
    pub untracked_files: BTreeSet<String>,
    pub untracked_directories: BTreeSet<String>,
    /// Coarse signal: any difference at all, including ones that fall in
    /// none of the sets above (such as tracked files deleted from disk)
    pub has_differences: bool,
}

impl DiffSnapshot {
    /// Nothing staged relative to HEAD
    pub fn index_is_clean(&self) -> bool {
        self.added.is_empty() && self.changed.is_empty() && self.removed.is_empty()
    }

    /// No category holds any path
    pub fn is_empty(&self) -> bool {
        self.index_is_clean()
            && self.modified_on_disk.is_empty()
            && self.untracked_files.is_empty()
            && self.untracked_directories.is_empty()
    }

    /// Labeled categories in display order
    pub fn categories(&self) -> [(&'static str, &BTreeSet<String>); 6] {
        [
            ("Added", &self.added),
            ("Changed", &self.changed),
            ("Removed", &self.removed),
            ("Modified on disk relative to the index", &self.modified_on_disk),
            ("Untracked files", &self.untracked_files),
            ("Untracked folders", &self.untracked_directories),
        ]
    }

    fn contains_staged(&self, path: &str) -> bool {
        self.added.contains(path) || self.changed.contains(path) || self.removed.contains(path)
    }
}

impl fmt::Display for DiffSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("To commit:")?;
        for (name, paths) in self.categories() {
            if paths.is_empty() {
                continue;
            }
            let joined = paths.iter().map(String::as_str).collect::<Vec<_>>().join(", ");
            write!(f, "\t{name}: {joined}")?;
        }
        Ok(())
    }
}

/// Computes [`DiffSnapshot`]s for a repository
pub struct DiffAnalyzer<'r> {
    repo: &'r Repository,
}

impl<'r> DiffAnalyzer<'r> {
    pub fn new(repo: &'r Repository) -> Self {
        Self { repo }
    }

    /// Compute the three-way diff, reporting progress with an unknown total.
    ///
    /// Cancellation is checked before each phase and after every delta; a
    /// cancelled run returns [`DiffError::Cancelled`] and leaves nothing
    /// behind.
    pub fn compute(&self, progress: &dyn ProgressSink) -> Result<DiffSnapshot, DiffError> {
        let workdir = self
            .repo
            .workdir()
            .ok_or_else(|| DiffError::BareRepository(self.repo.path().to_path_buf()))?
            .to_path_buf();

        progress.start("Computing changes", None);
        let result = self.collect(&workdir, progress);
        progress.finish();
        result
    }

    fn collect(
        &self,
        workdir: &std::path::Path,
        progress: &dyn ProgressSink,
    ) -> Result<DiffSnapshot, DiffError> {
        let mut snapshot = DiffSnapshot::default();
        let mut processed = 0u64;

        checkpoint(progress)?;
        let head_tree = self.head_tree()?;
        let mut index = self.repo.index()?;
        index.read(false)?;

        let mut staged_opts = DiffOptions::new();
        staged_opts.include_typechange(true);
        let staged =
            self.repo
                .diff_tree_to_index(head_tree.as_ref(), Some(&index), Some(&mut staged_opts))?;

        for delta in staged.deltas() {
            let Some(path) = delta_path(&delta) else {
                continue;
            };
            match delta.status() {
                Delta::Added => {
                    snapshot.added.insert(path);
                }
                Delta::Deleted => {
                    snapshot.removed.insert(path);
                }
                Delta::Modified | Delta::Typechange | Delta::Renamed | Delta::Copied => {
                    snapshot.changed.insert(path);
                }
                other => tracing::trace!(path = %path, status = ?other, "ignoring staged delta"),
            }
            processed += 1;
            progress.update(processed);
            checkpoint(progress)?;
        }

        let mut workdir_opts = DiffOptions::new();
        workdir_opts
            .include_untracked(true)
            .recurse_untracked_dirs(false)
            .include_ignored(false)
            .include_typechange(true);
        let unstaged = self
            .repo
            .diff_index_to_workdir(Some(&index), Some(&mut workdir_opts))?;

        for delta in unstaged.deltas() {
            let Some(path) = delta_path(&delta) else {
                continue;
            };
            match delta.status() {
                Delta::Modified | Delta::Typechange => {
                    if !snapshot.contains_staged(&path) {
                        snapshot.modified_on_disk.insert(path);
                    }
                }
                Delta::Untracked if snapshot.contains_staged(path.trim_end_matches('/')) => {
                    tracing::trace!(path = %path, "untracked copy of a staged removal");
                }
                Delta::Untracked => {
                    if let Some(dir) = path.strip_suffix('/') {
                        snapshot.untracked_directories.insert(dir.to_string());
                    } else if workdir.join(&path).is_dir() {
                        snapshot.untracked_directories.insert(path);
                    } else {
                        snapshot.untracked_files.insert(path);
                    }
                }
                // Deleted from disk but still in the index: not stageable by
                // path, so it stays out of every category
                Delta::Deleted => tracing::trace!(path = %path, "tracked file missing on disk"),
                other => tracing::trace!(path = %path, status = ?other, "ignoring workdir delta"),
            }
            processed += 1;
            progress.update(processed);
            checkpoint(progress)?;
        }

        snapshot.has_differences = staged.deltas().len() > 0 || unstaged.deltas().len() > 0;

        tracing::trace!(
            deltas = processed,
            changed = snapshot.has_differences,
            "diff computed"
        );

        Ok(snapshot)
    }

    /// HEAD's tree, or `None` on an unborn branch
    fn head_tree(&self) -> Result<Option<Tree<'r>>, DiffError> {
        match self.repo.head() {
            Ok(head) => Ok(Some(head.peel_to_tree()?)),
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn checkpoint(progress: &dyn ProgressSink) -> Result<(), DiffError> {
    if progress.is_cancelled() {
        tracing::debug!("diff computation cancelled");
        return Err(DiffError::Cancelled);
    }
    Ok(())
}

fn delta_path(delta: &DiffDelta<'_>) -> Option<String> {
    delta
        .new_file()
        .path()
        .or_else(|| delta.old_file().path())
        .map(|p| p.to_string_lossy().replace('\\', "/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::progress::{CancelFlag, NoProgress};
    use crate::git::test_support::{commit_all, init_temp_repo, stage, write};
    use std::sync::Mutex;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_fresh_repository_is_empty() {
        let (_td, repo) = init_temp_repo();
        let snapshot = DiffAnalyzer::new(&repo).compute(&NoProgress).unwrap();
        assert!(snapshot.is_empty());
        assert!(!snapshot.has_differences);
    }

    #[test]
    fn test_untracked_files_and_directories() {
        let (td, repo) = init_temp_repo();
        write(td.path(), "editor.xml", "<editor/>");
        write(td.path(), "options/colors.xml", "<colors/>");

        let snapshot = DiffAnalyzer::new(&repo).compute(&NoProgress).unwrap();
        assert_eq!(snapshot.untracked_files, set(&["editor.xml"]));
        assert_eq!(snapshot.untracked_directories, set(&["options"]));
        assert!(snapshot.index_is_clean());
        assert!(snapshot.has_differences);
    }

    #[test]
    fn test_staged_file_on_unborn_branch_is_added() {
        let (td, repo) = init_temp_repo();
        write(td.path(), "a.xml", "a");
        stage(&repo, "a.xml");

        let snapshot = DiffAnalyzer::new(&repo).compute(&NoProgress).unwrap();
        assert_eq!(snapshot.added, set(&["a.xml"]));
        assert!(snapshot.modified_on_disk.is_empty());
    }

    #[test]
    fn test_modified_on_disk_and_changed() {
        let (td, repo) = init_temp_repo();
        write(td.path(), "global.xml", "v1");
        write(td.path(), "keymap.xml", "v1");
        commit_all(&repo, "initial");

        write(td.path(), "global.xml", "version two");
        write(td.path(), "keymap.xml", "version two");
        stage(&repo, "keymap.xml");

        let snapshot = DiffAnalyzer::new(&repo).compute(&NoProgress).unwrap();
        assert_eq!(snapshot.modified_on_disk, set(&["global.xml"]));
        assert_eq!(snapshot.changed, set(&["keymap.xml"]));
    }

    #[test]
    fn test_staged_then_modified_again_reported_once() {
        let (td, repo) = init_temp_repo();
        write(td.path(), "global.xml", "v1");
        commit_all(&repo, "initial");

        write(td.path(), "global.xml", "version two");
        stage(&repo, "global.xml");
        write(td.path(), "global.xml", "version three, longer");

        let snapshot = DiffAnalyzer::new(&repo).compute(&NoProgress).unwrap();
        assert_eq!(snapshot.changed, set(&["global.xml"]));
        assert!(snapshot.modified_on_disk.is_empty());
    }

    #[test]
    fn test_removed_from_index() {
        let (td, repo) = init_temp_repo();
        write(td.path(), "old.xml", "old");
        commit_all(&repo, "initial");

        let mut index = repo.index().unwrap();
        index.remove_path(std::path::Path::new("old.xml")).unwrap();
        index.write().unwrap();

        let snapshot = DiffAnalyzer::new(&repo).compute(&NoProgress).unwrap();
        assert_eq!(snapshot.removed, set(&["old.xml"]));
        // still on disk, but reported only as removed
        assert!(snapshot.untracked_files.is_empty());
    }

    #[test]
    fn test_deleted_on_disk_only_sets_coarse_flag() {
        let (td, repo) = init_temp_repo();
        write(td.path(), "gone.xml", "x");
        commit_all(&repo, "initial");
        std::fs::remove_file(td.path().join("gone.xml")).unwrap();

        let snapshot = DiffAnalyzer::new(&repo).compute(&NoProgress).unwrap();
        assert!(snapshot.is_empty());
        assert!(snapshot.has_differences);
    }

    #[test]
    fn test_compute_is_idempotent() {
        let (td, repo) = init_temp_repo();
        write(td.path(), "a.xml", "a");
        write(td.path(), "projects/foo/ws.xml", "ws");
        commit_all(&repo, "initial");
        write(td.path(), "a.xml", "changed");
        write(td.path(), "new.xml", "new");

        let analyzer = DiffAnalyzer::new(&repo);
        let first = analyzer.compute(&NoProgress).unwrap();
        let second = analyzer.compute(&NoProgress).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_cancelled_before_start() {
        let (td, repo) = init_temp_repo();
        write(td.path(), "a.xml", "a");
        stage(&repo, "a.xml");

        let flag = CancelFlag::new();
        flag.cancel();
        let err = DiffAnalyzer::new(&repo).compute(&flag).unwrap_err();
        assert!(matches!(err, DiffError::Cancelled));

        // index untouched
        let snapshot = DiffAnalyzer::new(&repo).compute(&NoProgress).unwrap();
        assert_eq!(snapshot.added, set(&["a.xml"]));
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl ProgressSink for Recorder {
        fn start(&self, _title: &str, total: Option<u64>) {
            self.events.lock().unwrap().push(format!("start:{total:?}"));
        }
        fn update(&self, completed: u64) {
            self.events.lock().unwrap().push(format!("update:{completed}"));
        }
        fn finish(&self) {
            self.events.lock().unwrap().push("finish".to_string());
        }
    }

    #[test]
    fn test_progress_reported_with_unknown_total() {
        let (td, repo) = init_temp_repo();
        write(td.path(), "a.xml", "a");
        write(td.path(), "b.xml", "b");

        let recorder = Recorder::default();
        DiffAnalyzer::new(&repo).compute(&recorder).unwrap();

        let events = recorder.events.lock().unwrap();
        assert_eq!(events.first().map(String::as_str), Some("start:None"));
        assert_eq!(events.last().map(String::as_str), Some("finish"));
        assert!(events.iter().any(|e| e == "update:2"));
    }

    #[test]
    fn test_display_omits_empty_categories() {
        let snapshot = DiffSnapshot {
            added: set(&["a.xml"]),
            modified_on_disk: set(&["global.xml", "keymap.xml"]),
            has_differences: true,
            ..Default::default()
        };
        assert_eq!(
            snapshot.to_string(),
            "To commit:\tAdded: a.xml\tModified on disk relative to the index: global.xml, keymap.xml"
        );
    }
}
