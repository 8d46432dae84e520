//! Run log for pipeline progress.
//!
//! Stages report progress through the `log_*` functions below. Each entry is
//! printed to stdout (unless the log is quiet) and kept in memory so the run
//! report can include the full history.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Log level for console display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A single log entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Log level
    pub level: LogLevel,
    /// Log message
    pub message: String,
    /// Optional indentation level (for nested logs)
    #[serde(default)]
    pub indent: u8,
}

impl LogEntry {
    pub fn info(message: impl Into<String>) -> Self {
        Self { level: LogLevel::Info, message: message.into(), indent: 0 }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self { level: LogLevel::Success, message: message.into(), indent: 0 }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { level: LogLevel::Warning, message: message.into(), indent: 0 }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: LogLevel::Error, message: message.into(), indent: 0 }
    }

    pub fn with_indent(mut self, indent: u8) -> Self {
        self.indent = indent;
        self
    }

    /// Console rendering, without a trailing newline.
    pub fn render(&self) -> String {
        let prefix = match self.level {
            LogLevel::Info => "   ",
            LogLevel::Success => "   ✓",
            LogLevel::Warning => "   ⚠️",
            LogLevel::Error => "   ❌",
        };
        let indent = "   ".repeat(self.indent as usize);
        format!("{}{} {}", indent, prefix, self.message)
    }
}

/// Global run log
pub static RUN_LOG: Lazy<RunLog> = Lazy::new(RunLog::new);

/// Prints entries and keeps them for the run report
pub struct RunLog {
    entries: Mutex<Vec<LogEntry>>,
    quiet: AtomicBool,
}

impl RunLog {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            quiet: AtomicBool::new(false),
        }
    }

    /// Record an entry, printing it unless quiet
    pub fn log(&self, entry: LogEntry) {
        if !self.quiet.load(Ordering::Relaxed) {
            println!("{}", entry.render());
        }
        self.lock().push(entry);
    }

    /// Silence console output; entries are still recorded
    pub fn set_quiet(&self, quiet: bool) {
        self.quiet.store(quiet, Ordering::Relaxed);
    }

    /// Snapshot of all recorded entries
    pub fn entries(&self) -> Vec<LogEntry> {
        self.lock().clone()
    }

    /// Remove and return all recorded entries
    pub fn take(&self) -> Vec<LogEntry> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<LogEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for RunLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenient logging functions
pub fn log_info(msg: impl Into<String>) {
    RUN_LOG.log(LogEntry::info(msg));
}

pub fn log_success(msg: impl Into<String>) {
    RUN_LOG.log(LogEntry::success(msg));
}

pub fn log_warning(msg: impl Into<String>) {
    RUN_LOG.log(LogEntry::warning(msg));
}

pub fn log_info_indent(msg: impl Into<String>, indent: u8) {
    RUN_LOG.log(LogEntry::info(msg).with_indent(indent));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_prefix_and_indent() {
        assert_eq!(LogEntry::info("Reading").render(), "    Reading");
        assert_eq!(
            LogEntry::success("done").with_indent(1).render(),
            "      ✓ done"
        );
    }

    #[test]
    fn test_quiet_log_still_records() {
        let log = RunLog::new();
        log.set_quiet(true);
        log.log(LogEntry::warning("one bound ignored"));
        log.log(LogEntry::info("next"));

        let entries = log.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].level, LogLevel::Warning);

        assert_eq!(log.take().len(), 2);
        assert!(log.entries().is_empty());
    }

    #[test]
    fn test_entry_serialization() {
        let json = serde_json::to_value(LogEntry::error("boom").with_indent(2)).unwrap();
        assert_eq!(json["level"], "error");
        assert_eq!(json["message"], "boom");
        assert_eq!(json["indent"], 2);
    }
}
