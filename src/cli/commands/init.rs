use super::Session;
use crate::git::RepositoryManager;
use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Default)]
pub struct InitArgs {
    /// Directory to initialize (defaults to the settings repository)
    pub path: Option<PathBuf>,
}

pub async fn execute(args: InitArgs, session: &Session) -> Result<()> {
    let output = &session.output;
    let path = match args.path {
        Some(path) => path,
        None => session.repository_root()?,
    };

    if RepositoryManager::is_valid_repository(&path) {
        output.info(&format!("{} is already a repository", path.display()));
        return Ok(());
    }

    if path.exists() && !path.is_dir() {
        anyhow::bail!("Specified path is not a directory: {}", path.display());
    }

    RepositoryManager::init_repository(&path)?;
    output.success(&format!("Initialized repository at {}", path.display()));
    Ok(())
}
