use super::{Session, short_id};
use crate::cli::SpinnerProgress;
use crate::git::commit::CommitOutcome;
use crate::sync::{SyncScheduler, Trigger};
use anyhow::Result;
use clap::Args;
use std::sync::Arc;
use std::time::Duration;

#[derive(Args, Default)]
pub struct WatchArgs {
    /// Seconds between automatic commits, overrides sync.auto_commit_interval_secs
    #[arg(long, value_name = "SECS")]
    pub interval: Option<u64>,

    /// Skip the startup sync even if sync.update_on_start is set
    #[arg(long)]
    pub no_startup_sync: bool,
}

pub async fn execute(args: WatchArgs, session: &Session) -> Result<()> {
    let output = &session.output;
    let ctx = session.sync_context()?;

    if ctx.manager().ensure_initialized()? {
        output.info(&format!(
            "Created settings repository at {}",
            ctx.manager().root().display()
        ));
    }

    let scheduler = SyncScheduler::new();
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let canceller = scheduler.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            canceller.cancel();
        }
        let _ = stop_tx.send(());
    });

    if ctx.config().sync.update_on_start && !args.no_startup_sync {
        let progress = Arc::new(SpinnerProgress::new(output, "Startup sync"));
        match scheduler.run_sync(&ctx, Trigger::Startup, progress).await {
            CommitOutcome::Committed { id, .. } => {
                output.success(&format!("Startup sync committed {}", short_id(&id)))
            }
            CommitOutcome::Skipped(reason) => output.verbose(&format!("Startup sync: {reason}")),
            // logged by the scheduler
            CommitOutcome::Failed(e) => output.warning(&format!("Startup sync failed: {e}")),
        }
    }

    let interval = match args.interval {
        Some(0) => None,
        Some(secs) => Some(Duration::from_secs(secs)),
        None => ctx.config().auto_commit_interval(),
    };
    let Some(interval) = interval else {
        output.info("Periodic auto-commit is disabled");
        return Ok(());
    };

    output.info(&format!(
        "Auto-committing {} every {}s, press Ctrl-C to stop",
        ctx.manager().root().display(),
        interval.as_secs()
    ));

    let shutdown = async move {
        let _ = stop_rx.await;
    };
    let cycles = scheduler.run_periodic(&ctx, interval, shutdown).await;
    output.success(&format!("Stopped after {cycles} auto-commit cycles"));
    Ok(())
}
