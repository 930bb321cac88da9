//! The injected logging handle.
//!
//! Components that want their output mirrored into the overlay take a
//! [`Devtools`] clone instead of writing to a process-wide logger. Each call
//! emits the matching `tracing` event first, then buffers the rendered line.

use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use super::buffer::{render_args, LogArg, LogBuffer, LogEntry, LogLevel};
use crate::error::{MeshError, Result};

/// Shared handle to the devtools log buffer.
///
/// Cheap to clone; all clones see the same buffer. Every change bumps a
/// revision counter observable through [`Devtools::subscribe`].
#[derive(Clone)]
pub struct Devtools {
    buffer: Arc<Mutex<LogBuffer>>,
    revision: Arc<watch::Sender<u64>>,
}

impl Default for Devtools {
    fn default() -> Self {
        Self::new(super::LOG_CAPACITY)
    }
}

impl std::fmt::Debug for Devtools {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Devtools")
            .field("entries", &self.len())
            .field("revision", &*self.revision.borrow())
            .finish()
    }
}

impl Devtools {
    /// Create a handle whose buffer keeps at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = watch::channel(0u64);
        Self {
            buffer: Arc::new(Mutex::new(LogBuffer::new(capacity))),
            revision: Arc::new(tx),
        }
    }

    pub fn log(&self, args: &[LogArg]) {
        self.emit(LogLevel::Log, args);
    }

    pub fn warn(&self, args: &[LogArg]) {
        self.emit(LogLevel::Warn, args);
    }

    pub fn error(&self, args: &[LogArg]) {
        self.emit(LogLevel::Error, args);
    }

    fn emit(&self, level: LogLevel, args: &[LogArg]) {
        let message = render_args(args);
        match level {
            LogLevel::Log => tracing::info!(target: "mesh_now::console", "{message}"),
            LogLevel::Warn => tracing::warn!(target: "mesh_now::console", "{message}"),
            LogLevel::Error => tracing::error!(target: "mesh_now::console", "{message}"),
        }
        let _ = self.push(LogEntry::new(level, message));
    }

    /// Buffer an entry without emitting a `tracing` event.
    ///
    /// Used by the request decorator, whose callers must never observe a
    /// logging failure; the error is returned so they can discard it.
    pub fn record(&self, level: LogLevel, args: &[LogArg]) -> Result<()> {
        self.push(LogEntry::new(level, render_args(args)))
    }

    fn push(&self, entry: LogEntry) -> Result<()> {
        self.buffer
            .lock()
            .map_err(|_| MeshError::LogBuffer)?
            .push(entry);
        self.bump();
        Ok(())
    }

    /// Empty the buffer.
    pub fn clear(&self) {
        if let Ok(mut buf) = self.buffer.lock() {
            buf.clear();
        }
        self.bump();
    }

    fn bump(&self) {
        self.revision.send_modify(|r| *r = r.wrapping_add(1));
    }

    /// Snapshot of the buffer, newest entry first.
    pub fn entries_newest_first(&self) -> Vec<LogEntry> {
        self.buffer
            .lock()
            .map(|buf| buf.newest_first().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.buffer.lock().map(|buf| buf.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Receiver that wakes on every buffer change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Number of changes so far.
    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }
}
