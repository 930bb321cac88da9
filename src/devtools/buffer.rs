//! Bounded log buffer and argument rendering.

use std::collections::VecDeque;

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Maximum number of entries the overlay keeps.
pub const LOG_CAPACITY: usize = 200;

/// Severity of a captured log call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Log,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Log => write!(f, "log"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

/// One captured log call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    /// Wall-clock epoch milliseconds.
    pub timestamp: u64,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp: now_ms(),
        }
    }
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_ms() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
}

/// A single rendered argument of a log call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogArg(String);

impl LogArg {
    /// A string argument, kept verbatim.
    pub fn text(s: impl Into<String>) -> Self {
        LogArg(s.into())
    }

    /// A non-string argument, JSON-stringified. Falls back to the `Debug`
    /// rendering when serialization fails.
    pub fn json<T: Serialize + std::fmt::Debug + ?Sized>(value: &T) -> Self {
        match serde_json::to_string(value) {
            Ok(s) => LogArg(s),
            Err(_) => LogArg(format!("{value:?}")),
        }
    }

    /// An error argument, rendered through `Display`.
    pub fn error(err: &dyn std::error::Error) -> Self {
        LogArg(err.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for LogArg {
    fn from(s: &str) -> Self {
        LogArg::text(s)
    }
}

impl From<String> for LogArg {
    fn from(s: String) -> Self {
        LogArg(s)
    }
}

/// Join rendered arguments with single spaces.
pub fn render_args(args: &[LogArg]) -> String {
    args.iter().map(LogArg::as_str).collect::<Vec<_>>().join(" ")
}

/// FIFO ring of log entries (oldest at front).
#[derive(Debug, Clone)]
pub struct LogBuffer {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(LOG_CAPACITY)
    }
}

impl LogBuffer {
    /// Create a buffer holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(256)),
            capacity,
        }
    }

    /// Append an entry, dropping the oldest ones past capacity.
    pub fn push(&mut self, entry: LogEntry) {
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries from newest to oldest, the panel's display order.
    pub fn newest_first(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().rev()
    }

    pub fn oldest(&self) -> Option<&LogEntry> {
        self.entries.front()
    }

    pub fn newest(&self) -> Option<&LogEntry> {
        self.entries.back()
    }
}
