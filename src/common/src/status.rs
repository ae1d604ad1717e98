//! Progress and status reporting.
//!
//! Long running operations report through a [`StatusHandler`]. Each unit of
//! work with a known size opens a [`StatusLine`], increments it as items
//! finish and ends it with an [`EndResult`].

use std::io::IsTerminal;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::config::{ProgressMode, StatusConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndResult {
    Success,
    Warning,
    Error,
}

impl EndResult {
    fn marker(self) -> &'static str {
        match self {
            EndResult::Success => "✓",
            EndResult::Warning => "⚠",
            EndResult::Error => "✗",
        }
    }
}

pub trait StatusLine: Send + Sync {
    fn set_total(&self, total: u64);
    fn increment(&self);
    fn update(&self, message: &str);
    fn end(&self, result: EndResult);
}

pub trait StatusHandler: Send + Sync {
    fn start_status(&self, total: u64, message: &str) -> Box<dyn StatusLine>;
    fn info(&self, message: &str);
    fn warning(&self, message: &str);
    fn error(&self, message: &str);
    /// Only emitted when tracing output is enabled.
    fn trace(&self, message: &str);
}

/// Pick a handler for the configured progress mode.
pub fn handler_from_config(config: &StatusConfig) -> Arc<dyn StatusHandler> {
    let fancy = match config.progress {
        ProgressMode::Fancy => true,
        ProgressMode::Plain => false,
        ProgressMode::Auto => std::io::stderr().is_terminal(),
    };

    if fancy {
        Arc::new(MultiLineStatusHandler::new(config.trace))
    } else {
        Arc::new(LogStatusHandler::new(config.trace))
    }
}

/// Status handler that turns every event into a log record.
#[derive(Debug, Default)]
pub struct LogStatusHandler {
    trace: bool,
}

impl LogStatusHandler {
    pub fn new(trace: bool) -> Self {
        Self { trace }
    }
}

impl StatusHandler for LogStatusHandler {
    fn start_status(&self, total: u64, message: &str) -> Box<dyn StatusLine> {
        tracing::info!(total, "{message}");
        Box::new(LogStatusLine {
            message: Mutex::new(message.to_string()),
            total: AtomicU64::new(total),
            current: AtomicU64::new(0),
        })
    }

    fn info(&self, message: &str) {
        tracing::info!("{message}");
    }

    fn warning(&self, message: &str) {
        tracing::warn!("{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!("{message}");
    }

    fn trace(&self, message: &str) {
        if self.trace {
            tracing::info!("{message}");
        }
    }
}

struct LogStatusLine {
    message: Mutex<String>,
    total: AtomicU64,
    current: AtomicU64,
}

impl LogStatusLine {
    fn message(&self) -> String {
        self.message
            .lock()
            .map(|message| message.clone())
            .unwrap_or_default()
    }
}

impl StatusLine for LogStatusLine {
    fn set_total(&self, total: u64) {
        self.total.store(total, Ordering::Relaxed);
    }

    fn increment(&self) {
        let current = self.current.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(
            current,
            total = self.total.load(Ordering::Relaxed),
            "{}",
            self.message()
        );
    }

    fn update(&self, message: &str) {
        if let Ok(mut current) = self.message.lock() {
            *current = message.to_string();
        }
    }

    fn end(&self, result: EndResult) {
        let message = self.message();
        match result {
            EndResult::Success => tracing::info!("{} {message}", result.marker()),
            EndResult::Warning => tracing::warn!("{} {message}", result.marker()),
            EndResult::Error => tracing::error!("{} {message}", result.marker()),
        }
    }
}

/// Terminal status handler with one spinner per open status line.
pub struct MultiLineStatusHandler {
    progress: MultiProgress,
    trace: bool,
}

impl MultiLineStatusHandler {
    pub fn new(trace: bool) -> Self {
        Self {
            progress: MultiProgress::new(),
            trace,
        }
    }

    fn print(&self, marker: &str, message: &str) {
        let _ = self.progress.println(format!("{marker} {message}"));
    }
}

impl StatusHandler for MultiLineStatusHandler {
    fn start_status(&self, total: u64, message: &str) -> Box<dyn StatusLine> {
        let bar = self.progress.add(ProgressBar::new(total));
        if let Ok(style) =
            ProgressStyle::default_spinner().template("{spinner:.green} {msg} ({pos}/{len})")
        {
            bar.set_style(style);
        }
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));
        Box::new(SpinnerStatusLine { bar })
    }

    fn info(&self, message: &str) {
        self.print("ⓘ", message);
    }

    fn warning(&self, message: &str) {
        self.print("⚠", message);
    }

    fn error(&self, message: &str) {
        self.print("✗", message);
    }

    fn trace(&self, message: &str) {
        if self.trace {
            self.info(message);
        }
    }
}

struct SpinnerStatusLine {
    bar: ProgressBar,
}

impl StatusLine for SpinnerStatusLine {
    fn set_total(&self, total: u64) {
        self.bar.set_length(total);
    }

    fn increment(&self) {
        self.bar.inc(1);
    }

    fn update(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    fn end(&self, result: EndResult) {
        if let Ok(style) = ProgressStyle::default_spinner().template("{msg}") {
            self.bar.set_style(style);
        }
        let message = format!("{} {}", result.marker(), self.bar.message());
        self.bar.finish_with_message(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_status_line_tracks_progress() {
        let handler = LogStatusHandler::new(false);
        let line = handler.start_status(3, "Deleting objects");

        line.increment();
        line.increment();
        line.update("Deleting objects (2 left)");
        line.set_total(4);
        line.end(EndResult::Success);
    }

    #[test]
    fn test_plain_mode_selects_log_handler() {
        let handler = handler_from_config(&StatusConfig {
            progress: ProgressMode::Plain,
            trace: true,
        });
        handler.trace("visible in trace mode");
        handler.start_status(1, "single").end(EndResult::Warning);
    }

    #[test]
    fn test_end_markers() {
        assert_eq!(EndResult::Success.marker(), "✓");
        assert_eq!(EndResult::Warning.marker(), "⚠");
        assert_eq!(EndResult::Error.marker(), "✗");
    }

    #[test]
    fn test_spinner_line_finishes() {
        let handler = MultiLineStatusHandler {
            progress: MultiProgress::with_draw_target(indicatif::ProgressDrawTarget::hidden()),
            trace: false,
        };
        let line = handler.start_status(2, "Deleting namespaces");
        line.increment();
        line.increment();
        line.end(EndResult::Error);
        handler.info("done");
    }
}
