use super::{Session, short_id};
use crate::cli::SpinnerProgress;
use crate::git::commit::CommitOutcome;
use crate::sync::{SyncContext, SyncScheduler, Trigger};
use anyhow::Result;
use clap::Args;
use std::sync::Arc;

#[derive(Args, Default)]
pub struct SyncArgs {}

pub async fn execute(_args: SyncArgs, session: &Session) -> Result<()> {
    let ctx = session.sync_context()?;
    run_manual(&ctx, session).await
}

/// Run a manual cycle, cancelling the diff on Ctrl-C. A failed cycle is
/// returned as an error.
pub(crate) async fn run_manual(ctx: &SyncContext, session: &Session) -> Result<()> {
    let output = &session.output;
    let scheduler = SyncScheduler::new();

    let canceller = scheduler.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            canceller.cancel();
        }
    });

    let progress = Arc::new(SpinnerProgress::new(output, "Computing changes"));
    let outcome = scheduler.run_sync(ctx, Trigger::Manual, progress).await;
    interrupt.abort();

    match outcome {
        CommitOutcome::Committed { id, staged } => {
            output.success(&format!("Committed {}", short_id(&id)));
            if output.is_verbose() {
                for path in &staged {
                    output.list_item(path);
                }
            }
            Ok(())
        }
        CommitOutcome::Skipped(reason) => {
            output.info(&format!("Nothing committed: {reason}"));
            Ok(())
        }
        CommitOutcome::Failed(e) => Err(anyhow::Error::new(e).context("Sync failed")),
    }
}
