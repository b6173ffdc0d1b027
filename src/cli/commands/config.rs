use super::Session;
use crate::cli::Output;
use crate::config::SyncConfig;
use anyhow::{Context, Result, bail};
use clap::{Args, Subcommand};

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Display current merged configuration
    Show {
        /// Output format: toml, json
        #[arg(short, long, default_value = "toml")]
        format: String,
    },
    /// Print the user configuration file path
    Path,
    /// Turn the startup sync on or off in the user configuration
    SetUpdateOnStart {
        #[arg(action = clap::ArgAction::Set)]
        value: bool,
    },
    /// Commit the project-scoped subtree as well
    SetShareProjectWorkspace {
        #[arg(action = clap::ArgAction::Set)]
        value: bool,
    },
}

pub async fn execute(args: ConfigArgs, session: &Session) -> Result<()> {
    let output = &session.output;

    match args.command {
        ConfigCommand::Show { format } => {
            let rendered = match format.to_lowercase().as_str() {
                "toml" => toml::to_string_pretty(&session.config)?,
                "json" => serde_json::to_string_pretty(&session.config)?,
                _ => bail!("Unsupported format: {format}. Use toml or json"),
            };
            println!("{rendered}");
        }
        ConfigCommand::Path => {
            let path = SyncConfig::user_config_path()
                .context("Could not determine the configuration directory")?;
            println!("{}", path.display());
        }
        ConfigCommand::SetUpdateOnStart { value } => {
            set_flag(output, "update_on_start", value, |c| &mut c.sync.update_on_start)?;
        }
        ConfigCommand::SetShareProjectWorkspace { value } => {
            set_flag(output, "share_project_workspace", value, |c| {
                &mut c.sync.share_project_workspace
            })?;
        }
    }

    Ok(())
}

/// Write a boolean sync setting to the user file, only when it changes
fn set_flag(
    output: &Output,
    name: &str,
    value: bool,
    field: impl FnOnce(&mut SyncConfig) -> &mut bool,
) -> Result<()> {
    let path = SyncConfig::user_config_path()
        .context("Could not determine the configuration directory")?;
    let mut user = if path.exists() {
        SyncConfig::load_from_file(&path)?
    } else {
        SyncConfig::default()
    };

    let current = field(&mut user);
    if *current == value {
        output.info(&format!("{name} is already {value}"));
        return Ok(());
    }
    *current = value;

    user.save_to_file(&path)?;
    tracing::debug!(path = %path.display(), setting = name, value, "saved user configuration");
    output.success(&format!("{name} set to {value}"));
    Ok(())
}
