//! Sync engine: explicit context, single-flight scheduling and the remote
//! configuration flow

pub mod configure;
pub mod context;
mod lock;
pub mod manager;

pub use configure::{ConfigureOutcome, ConfirmationPort, is_syncable_url, save_remote_url};
pub use context::{AutoCommitSuppression, SuppressionGuard, SyncContext};
pub use manager::{SyncScheduler, Trigger};
