use super::{Session, short_id};
use crate::git::commit::SyncStore;
use crate::git::diff::DiffSnapshot;
use crate::git::progress::NoProgress;
use anyhow::{Context, Result};
use clap::Args;

#[derive(Args, Default)]
pub struct StatusArgs {}

struct RepositoryReport {
    branch: Option<String>,
    head: Option<String>,
    diff: DiffSnapshot,
}

pub async fn execute(_args: StatusArgs, session: &Session) -> Result<()> {
    let output = &session.output;
    let ctx = session.sync_context()?;
    let manager = ctx.manager().clone();

    output.header("Settings repository");
    output.key_value("Path", &manager.root().display().to_string(), false);

    if !manager.is_valid() {
        output.warning("Repository is not initialized, run `cfgsync init`");
        return Ok(());
    }

    let remote = manager.get_remote_repository_url();
    output.key_value(
        "Remote",
        if remote.is_empty() { "(none)" } else { remote.as_str() },
        !remote.is_empty(),
    );

    let report = tokio::task::spawn_blocking(move || -> Result<RepositoryReport> {
        let store = manager.open()?;
        let diff = store
            .compute_diff(&NoProgress)
            .context("Failed to compute changes")?;
        Ok(RepositoryReport {
            branch: store.current_branch(),
            head: store.head_commit(),
            diff,
        })
    })
    .await??;

    output.key_value("Branch", report.branch.as_deref().unwrap_or("(detached)"), false);
    output.key_value(
        "Last commit",
        report.head.as_deref().map(short_id).unwrap_or("(none)"),
        false,
    );
    let sync = &ctx.config().sync;
    if sync.share_project_workspace {
        output.key_value("Reserved prefix", "(none, project workspace shared)", false);
    } else {
        output.key_value("Reserved prefix", &sync.reserved_prefix, false);
    }
    let interval = match ctx.config().auto_commit_interval() {
        Some(interval) => format!("every {}s", interval.as_secs()),
        None => "disabled".to_string(),
    };
    output.key_value("Auto-commit", &interval, false);

    if report.diff.is_empty() {
        output.blank_line();
        output.success("Nothing to commit");
        return Ok(());
    }

    for (name, paths) in report.diff.categories() {
        if paths.is_empty() {
            continue;
        }
        output.section_header(name);
        for path in paths {
            output.list_item(path);
        }
    }

    Ok(())
}
