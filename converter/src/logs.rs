//! Conversion progress logs.
//!
//! Every stage reports through a global broadcaster that echoes entries to
//! stderr (stdout is reserved for JSON output) and forwards them to any
//! subscriber. [`LogTally`] subscribes to collect the warnings of a run.
//!
//! `AIRISK_QUIET` silences the echo except for errors.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Log level for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A single log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    /// Nesting level for sub-steps
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

    fn render(&self) -> String {
        let prefix = match self.level {
            LogLevel::Info => "   ",
            LogLevel::Success => "   ✓",
            LogLevel::Warning => "   ⚠",
            LogLevel::Error => "   ✗",
        };
        format!("{}{} {}", "   ".repeat(self.indent as usize), prefix, self.message)
    }
}

/// Entries buffered per subscriber before the oldest are dropped
const CHANNEL_CAPACITY: usize = 64;

/// Global log broadcaster
pub static LOG_BROADCASTER: Lazy<LogBroadcaster> = Lazy::new(LogBroadcaster::new);

/// Fans log entries out to stderr and all subscribers
pub struct LogBroadcaster {
    sender: broadcast::Sender<LogEntry>,
    echo: bool,
}

impl LogBroadcaster {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender, echo: std::env::var_os("AIRISK_QUIET").is_none() }
    }

    pub fn log(&self, entry: LogEntry) {
        if self.echo || entry.level == LogLevel::Error {
            eprintln!("{}", entry.render());
        }
        // No receivers is fine
        let _ = self.sender.send(entry);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.sender.subscribe()
    }
}

impl Default for LogBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

/// Collects the warnings logged while it is alive.
pub struct LogTally {
    rx: broadcast::Receiver<LogEntry>,
    skipped: u64,
}

impl LogTally {
    /// Start collecting from the global broadcaster.
    pub fn start() -> Self {
        Self::subscribe_to(&LOG_BROADCASTER)
    }

    pub fn subscribe_to(broadcaster: &LogBroadcaster) -> Self {
        Self { rx: broadcaster.subscribe(), skipped: 0 }
    }

    /// Drain pending entries, returning the warning messages among them.
    pub fn warnings(&mut self) -> Vec<String> {
        let mut warnings = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(entry) if entry.level == LogLevel::Warning => warnings.push(entry.message),
                Ok(_) => {}
                Err(broadcast::error::TryRecvError::Lagged(n)) => self.skipped += n,
                Err(_) => break,
            }
        }
        warnings
    }

    /// Entries lost because the channel overflowed.
    pub fn skipped(&self) -> u64 {
        self.skipped
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

pub fn log_error(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::error(msg));
}

pub fn log_info_indent(msg: impl Into<String>, indent: u8) {
    LOG_BROADCASTER.log(LogEntry::info(msg).with_indent(indent));
}
