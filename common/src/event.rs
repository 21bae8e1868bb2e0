//! Progress and cancellation plumbing.
//!
//! Plugins report progress as plain events; whether that becomes a bar, a
//! log line or nothing at all is the consumer's business. Long operations
//! poll the [`CancelToken`] between iterations rather than being preempted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Receiver for progress and log events emitted by running plugins.
pub trait EventSink: Send + Sync {
    /// Called once per unit of forward progress. `current` never exceeds
    /// `total` and never repeats a value within one operation.
    fn on_progress(&self, current: u64, total: u64);

    fn on_log(&self, level: LogLevel, message: &str);
}

/// Sink that discards everything. Default for library callers and tests.
pub struct NullSink;

impl EventSink for NullSink {
    fn on_progress(&self, _current: u64, _total: u64) {}

    fn on_log(&self, _level: LogLevel, _message: &str) {}
}

/// Sink that forwards log events into `tracing` and drops progress.
pub struct TracingSink;

impl EventSink for TracingSink {
    fn on_progress(&self, current: u64, total: u64) {
        tracing::trace!(current, total, "progress");
    }

    fn on_log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Debug => tracing::debug!("{message}"),
            LogLevel::Info => tracing::info!("{message}"),
            LogLevel::Warn => tracing::warn!("{message}"),
            LogLevel::Error => tracing::error!("{message}"),
        }
    }
}

/// Cooperative cancellation flag shared between a caller and a running
/// operation.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_token_is_shared_between_clones() {
        let token = CancelToken::new();
        let view = token.clone();
        assert!(!view.is_cancelled());

        token.cancel();
        assert!(view.is_cancelled());
    }
}
