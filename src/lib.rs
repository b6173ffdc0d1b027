//! # cfgsync - keep a settings directory committed to git
//!
//! cfgsync watches a git repository holding application settings and
//! commits changes as they happen, so every state can be restored later.
//!
//! ## Features
//!
//! - **Selective auto-staging**: files modified on disk are swept into a
//!   commit, except the per-project subtree (`projects/` by default)
//! - **Single-flight cycles**: at most one commit cycle per repository runs
//!   at a time, on a background worker
//! - **Safe remote configuration**: ssh remotes are rejected up front and a
//!   missing local remote is only created after confirmation
//!
//! ## Quick Start
//!
//! ```bash
//! cfgsync init
//! cfgsync remote set https://example.com/settings.git
//! cfgsync watch
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod git;
pub mod sync;

pub use cli::{Cli, Output};
pub use config::SyncConfig;
pub use error::{Result, SyncError};
