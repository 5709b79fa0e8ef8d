//! Pipeline log stream.
//!
//! Every preparation step reports through a global broadcaster. Entries are
//! echoed to stderr (stdout is reserved for table output) and forwarded to
//! any subscriber. [`RunLog`] is the subscriber the pipeline uses to attach
//! the entries of a run to its result.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;

/// Entries buffered per subscriber before the oldest are dropped.
const CHANNEL_CAPACITY: usize = 1024;

/// Log level of an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
}

/// A single log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    /// Nesting depth, for sub-steps
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

    pub fn with_indent(mut self, indent: u8) -> Self {
        self.indent = indent;
        self
    }
}

/// Global log broadcaster
pub static LOG_BROADCASTER: Lazy<LogBroadcaster> = Lazy::new(LogBroadcaster::new);

/// Fans log entries out to stderr and to every subscriber
pub struct LogBroadcaster {
    sender: broadcast::Sender<LogEntry>,
}

impl LogBroadcaster {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Emit a log entry
    pub fn log(&self, entry: LogEntry) {
        let prefix = match entry.level {
            LogLevel::Info => "   ",
            LogLevel::Success => "   ✓",
            LogLevel::Warning => "   ⚠️",
        };
        let indent = "   ".repeat(entry.indent as usize);
        eprintln!("{}{} {}", indent, prefix, entry.message);

        // No receivers is not an error
        let _ = self.sender.send(entry);
    }

    /// Receive every entry logged from now on
    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.sender.subscribe()
    }
}

impl Default for LogBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

pub fn log_info(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::info(msg));
}

pub fn log_success(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::success(msg));
}

pub fn log_warning(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::warning(msg));
}

pub fn log_warning_indent(msg: impl Into<String>, indent: u8) {
    LOG_BROADCASTER.log(LogEntry::warning(msg).with_indent(indent));
}

// =============================================================================
// Run log
// =============================================================================

/// Collects every entry logged between [`RunLog::start`] and [`RunLog::finish`].
///
/// Entries logged by other threads in that window are collected too.
pub struct RunLog {
    receiver: broadcast::Receiver<LogEntry>,
}

impl RunLog {
    pub fn start() -> Self {
        Self::start_on(&LOG_BROADCASTER)
    }

    fn start_on(broadcaster: &LogBroadcaster) -> Self {
        Self {
            receiver: broadcaster.subscribe(),
        }
    }

    /// Drain the collected entries. Entries lost to a full channel are
    /// replaced by a single warning giving their count.
    pub fn finish(mut self) -> Vec<LogEntry> {
        let mut entries = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(entry) => entries.push(entry),
                Err(TryRecvError::Lagged(skipped)) => {
                    entries.push(LogEntry::warning(format!("{} log entries dropped", skipped)));
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscriber_receives_entries() {
        let broadcaster = LogBroadcaster::new();
        let mut rx = broadcaster.subscribe();

        broadcaster.log(LogEntry::warning("group A/S1 has no demand").with_indent(1));

        let entry = rx.try_recv().unwrap();
        assert_eq!(entry.level, LogLevel::Warning);
        assert_eq!(entry.indent, 1);
        assert!(entry.message.contains("A/S1"));
    }

    #[test]
    fn test_log_without_subscribers_does_not_panic() {
        let broadcaster = LogBroadcaster::default();
        broadcaster.log(LogEntry::info("nobody listening"));
    }

    #[test]
    fn test_run_log_keeps_entries_in_order() {
        let broadcaster = LogBroadcaster::new();
        broadcaster.log(LogEntry::info("before the run"));

        let run = RunLog::start_on(&broadcaster);
        broadcaster.log(LogEntry::info("loading"));
        broadcaster.log(LogEntry::success("done"));
        let entries = run.finish();

        let messages: Vec<_> = entries.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, ["loading", "done"]);
    }

    #[test]
    fn test_run_log_reports_dropped_entries() {
        let broadcaster = LogBroadcaster::new();
        let run = RunLog::start_on(&broadcaster);
        for i in 0..CHANNEL_CAPACITY + 10 {
            broadcaster.log(LogEntry::info(format!("row {i}")));
        }

        let entries = run.finish();
        assert_eq!(entries[0].level, LogLevel::Warning);
        assert_eq!(entries[0].message, "10 log entries dropped");
        assert_eq!(entries.len(), CHANNEL_CAPACITY + 1);
        assert_eq!(entries[1].message, "row 10");
    }

    #[test]
    fn test_entry_serializes_lowercase_level() {
        let json = serde_json::to_value(LogEntry::success("done")).unwrap();
        assert_eq!(json["level"], "success");
        assert_eq!(json["indent"], 0);
    }
}
