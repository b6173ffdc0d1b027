use super::Session;
use crate::cli::Output;
use crate::sync::{ConfigureOutcome, ConfirmationPort, is_syncable_url, save_remote_url};
use anyhow::{Result, bail};
use clap::{Args, Subcommand};

#[derive(Args)]
pub struct RemoteArgs {
    #[command(subcommand)]
    pub command: RemoteCommand,
}

#[derive(Subcommand)]
pub enum RemoteCommand {
    /// Print the configured remote URL
    Get,
    /// Set the remote (HTTP(S) URL or local path)
    Set {
        url: String,
        /// Initialize a missing local repository without asking
        #[arg(short, long)]
        yes: bool,
        /// Run a sync right after saving
        #[arg(long)]
        sync: bool,
    },
    /// Remove the remote and work locally only
    Clear,
}

/// Terminal-backed confirmation prompts
struct TerminalPort<'a> {
    output: &'a Output,
    assume_yes: bool,
}

impl ConfirmationPort for TerminalPort<'_> {
    fn confirm(&self, question: &str) -> bool {
        if self.assume_yes {
            self.output.verbose(&format!("{question} yes"));
            return true;
        }
        self.output.confirm(question)
    }

    fn report_error(&self, message: &str) {
        self.output.error(message);
    }
}

pub async fn execute(args: RemoteArgs, session: &Session) -> Result<()> {
    let output = &session.output;
    let ctx = session.sync_context()?;

    match args.command {
        RemoteCommand::Get => {
            let url = ctx.manager().get_remote_repository_url();
            if url.is_empty() {
                output.info("No remote configured");
            } else {
                println!("{url}");
            }
            Ok(())
        }
        RemoteCommand::Set { url, yes, sync } => {
            if !is_syncable_url(&url) {
                bail!("Remote URL is too short: '{}'", url.trim());
            }

            let port = TerminalPort {
                output,
                assume_yes: yes,
            };
            let outcome = match save_remote_url(&ctx, Some(url.as_str()), &port) {
                Ok(outcome) => outcome,
                // already reported through the port
                Err(_) => bail!("Remote was not changed"),
            };

            match outcome {
                ConfigureOutcome::Declined => {
                    output.warning("Remote was not changed");
                    Ok(())
                }
                ConfigureOutcome::Applied {
                    remote,
                    initialized,
                } => {
                    if let Some(path) = remote.as_ref().and_then(|r| r.local_path()) {
                        if initialized {
                            output.success(&format!("Initialized repository at {}", path.display()));
                        }
                    }
                    let shown = remote.as_ref().map(|r| r.as_str()).unwrap_or_default();
                    output.success(&format!("Remote set to {shown}"));

                    if sync {
                        super::sync::run_manual(&ctx, session).await?;
                    }
                    Ok(())
                }
            }
        }
        RemoteCommand::Clear => {
            let port = TerminalPort {
                output,
                assume_yes: false,
            };
            if save_remote_url(&ctx, None, &port).is_err() {
                bail!("Remote was not changed");
            }
            output.success("Remote cleared");
            Ok(())
        }
    }
}
