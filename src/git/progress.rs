//! Progress reporting and cancellation for long-running repository work

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Receives progress updates from the diff computation.
///
/// `total` is `None` when the amount of work cannot be predicted up front.
/// Returning `true` from [`ProgressSink::is_cancelled`] makes the caller stop
/// at the next checkpoint.
pub trait ProgressSink: Send + Sync {
    fn start(&self, _title: &str, _total: Option<u64>) {}

    fn update(&self, _completed: u64) {}

    fn finish(&self) {}

    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Sink that ignores every update
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {}

/// Shared cancellation signal, cheap to clone across threads
#[derive(Debug, Default, Clone)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl ProgressSink for CancelFlag {
    fn is_cancelled(&self) -> bool {
        CancelFlag::is_cancelled(self)
    }
}

/// Wraps another sink and adds an external cancellation signal
pub struct Cancellable<'a> {
    inner: &'a dyn ProgressSink,
    flag: CancelFlag,
}

impl<'a> Cancellable<'a> {
    pub fn new(inner: &'a dyn ProgressSink, flag: CancelFlag) -> Self {
        Self { inner, flag }
    }
}

impl ProgressSink for Cancellable<'_> {
    fn start(&self, title: &str, total: Option<u64>) {
        self.inner.start(title, total);
    }

    fn update(&self, completed: u64) {
        self.inner.update(completed);
    }

    fn finish(&self) {
        self.inner.finish();
    }

    fn is_cancelled(&self) -> bool {
        self.flag.is_cancelled() || self.inner.is_cancelled()
    }
}
