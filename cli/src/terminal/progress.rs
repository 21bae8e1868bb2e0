use std::sync::Mutex;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use sixkit_common::event::{EventSink, LogLevel};

/// Bridges plugin progress events onto an indicatif bar.
///
/// The bar appears lazily on the first event, so actions that never
/// report progress never draw one. Quiet mode drops the bar entirely but
/// still forwards log events into `tracing`.
pub struct ProgressSink {
    bar: Mutex<Option<ProgressBar>>,
    quiet: bool,
}

impl ProgressSink {
    pub fn new(q_level: u8) -> Self {
        Self {
            bar: Mutex::new(None),
            quiet: q_level > 0,
        }
    }

    fn style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.blue} {bar:36.cyan/blue} {pos}/{len} {msg}")
            .expect("progress template is valid")
    }
}

impl EventSink for ProgressSink {
    fn on_progress(&self, current: u64, total: u64) {
        if self.quiet {
            return;
        }

        let mut guard = self.bar.lock().expect("progress bar lock");
        let bar = guard.get_or_insert_with(|| {
            let bar = ProgressBar::new(total);
            bar.set_style(Self::style());
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        });

        if bar.length() != Some(total) {
            bar.set_length(total);
        }
        bar.set_position(current);

        if current >= total {
            bar.finish_and_clear();
            *guard = None;
        }
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
