//! Command implementations for the cfgsync CLI
//!
//! Each command lives in its own module with a clap `Args` struct and an
//! async `execute` entry point.

pub mod config;
pub mod init;
pub mod remote;
pub mod status;
pub mod sync;
pub mod watch;

use crate::cli::Output;
use crate::config::SyncConfig;
use crate::sync::SyncContext;
use anyhow::Result;
use std::path::PathBuf;

/// State shared by every command of one invocation
pub struct Session {
    pub output: Output,
    pub config: SyncConfig,
    repository: Option<PathBuf>,
}

impl Session {
    pub fn new(output: Output, config: SyncConfig, repository: Option<PathBuf>) -> Self {
        Self {
            output,
            config,
            repository,
        }
    }

    /// Repository root: `--repository`, then `repository.path`, then the
    /// platform default
    pub fn repository_root(&self) -> Result<PathBuf> {
        match &self.repository {
            Some(path) => Ok(path.clone()),
            None => self.config.repository_path(),
        }
    }

    pub fn sync_context(&self) -> Result<SyncContext> {
        Ok(SyncContext::new(self.config.clone(), self.repository_root()?))
    }
}

/// Abbreviated commit id for display
pub(crate) fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}
