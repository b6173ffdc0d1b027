use super::context::SyncContext;
use super::lock::{self, CycleLock};
use crate::error::SyncError;
use crate::git::commit::{CommitOutcome, SkipReason};
use crate::git::progress::{CancelFlag, Cancellable, NoProgress, ProgressSink};
use lazy_static::lazy_static;
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::MissedTickBehavior;

lazy_static! {
    /// Repositories with a cycle in flight in this process
    static ref IN_FLIGHT: Mutex<HashSet<PathBuf>> = Mutex::new(HashSet::new());
}

/// What started a sync cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Explicit user request; ignores auto-commit suppression
    Manual,
    Startup,
    Periodic,
}

impl Trigger {
    pub fn is_automatic(self) -> bool {
        !matches!(self, Self::Manual)
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manual => f.write_str("manual"),
            Self::Startup => f.write_str("startup"),
            Self::Periodic => f.write_str("periodic"),
        }
    }
}

/// Runs commit cycles on the blocking pool, at most one per repository.
///
/// A trigger that arrives while a cycle for the same repository is in
/// flight is rejected with [`SkipReason::AlreadyRunning`], whichever
/// scheduler or process started that cycle. Different repositories run in
/// parallel.
#[derive(Debug, Clone, Default)]
pub struct SyncScheduler {
    cancel: CancelFlag,
}

impl SyncScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask running and future diff computations to stop. Irreversible for
    /// this scheduler and its clones.
    pub fn cancel(&self) {
        tracing::debug!("cancelling sync cycles");
        self.cancel.cancel();
    }

    pub fn is_running(&self, root: &Path) -> bool {
        let key = lock::repository_key(root);
        IN_FLIGHT
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&key)
            || lock::metadata_dir(root).is_some_and(|dir| CycleLock::is_held(&dir))
    }

    /// Run one commit cycle for `ctx`'s repository
    pub async fn run_sync(
        &self,
        ctx: &SyncContext,
        trigger: Trigger,
        progress: Arc<dyn ProgressSink>,
    ) -> CommitOutcome {
        if trigger.is_automatic() && ctx.suppression().is_suppressed() {
            tracing::debug!(%trigger, "auto-commit suppressed, skipping");
            return CommitOutcome::Skipped(SkipReason::Suppressed);
        }

        let Some(slot) = self.try_acquire(ctx.manager().root()) else {
            tracing::debug!(%trigger, root = %ctx.manager().root().display(), "sync already running");
            return CommitOutcome::Skipped(SkipReason::AlreadyRunning);
        };

        let worker_ctx = ctx.clone();
        let cancel = self.cancel.clone();
        let joined = tokio::task::spawn_blocking(move || {
            let _slot = slot;
            let sink = Cancellable::new(progress.as_ref(), cancel);
            run_cycle(&worker_ctx, &sink)
        })
        .await;

        let outcome = joined.unwrap_or_else(|e| CommitOutcome::Failed(SyncError::Worker(e.to_string())));
        report(trigger, &outcome);
        outcome
    }

    /// Commit every `interval` until `shutdown` resolves. Returns the number
    /// of cycles started.
    pub async fn run_periodic<F>(&self, ctx: &SyncContext, interval: Duration, shutdown: F) -> usize
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // the first tick completes immediately
        ticker.tick().await;

        tokio::pin!(shutdown);
        let mut cycles = 0;
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::debug!(cycles, "periodic auto-commit stopped");
                    return cycles;
                }
                _ = ticker.tick() => {
                    cycles += 1;
                    self.run_sync(ctx, Trigger::Periodic, Arc::new(NoProgress)).await;
                }
            }
        }
    }

    /// Claim `root` for one cycle, in this process and, once the repository
    /// exists, through its lock file for other processes too
    pub(crate) fn try_acquire(&self, root: &Path) -> Option<InFlightSlot> {
        let key = lock::repository_key(root);
        if !IN_FLIGHT
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone())
        {
            return None;
        }
        let mut slot = InFlightSlot { key, lock: None };

        if let Some(dir) = lock::metadata_dir(root) {
            match CycleLock::try_acquire(&dir) {
                Ok(Some(lock)) => slot.lock = Some(lock),
                // dropping the slot releases the in-process claim
                Ok(None) => return None,
                Err(e) => {
                    tracing::warn!(dir = %dir.display(), error = %e, "cannot create sync lock")
                }
            }
        }
        Some(slot)
    }
}

/// Marks a repository busy until dropped
pub(crate) struct InFlightSlot {
    key: PathBuf,
    lock: Option<CycleLock>,
}

impl Drop for InFlightSlot {
    fn drop(&mut self) {
        self.lock.take();
        IN_FLIGHT
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

fn run_cycle(ctx: &SyncContext, progress: &dyn ProgressSink) -> CommitOutcome {
    let store = match ctx.manager().open() {
        Ok(store) => store,
        Err(e) => return CommitOutcome::Failed(e),
    };
    ctx.commit_task().run(&store, progress)
}

/// Manual failures are the user's to see; background ones are only logged
fn report(trigger: Trigger, outcome: &CommitOutcome) {
    match outcome {
        CommitOutcome::Committed { id, .. } => tracing::info!(%trigger, commit = %id, "sync committed"),
        CommitOutcome::Skipped(reason) => tracing::debug!(%trigger, %reason, "sync skipped"),
        CommitOutcome::Failed(e) if trigger.is_automatic() => {
            tracing::warn!(%trigger, error = %e, "auto-commit failed")
        }
        CommitOutcome::Failed(e) => tracing::error!(%trigger, error = %e, "sync failed"),
    }
}
