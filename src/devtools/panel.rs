//! The devtools panel: lazily built on show, dropped on hide, rebuilt from
//! the buffer on every change.

use chrono::{DateTime, Local, Utc};

use super::buffer::{LogEntry, LogLevel};
use super::console::Devtools;

/// One rendered panel row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelRow {
    /// Local `HH:MM:SS`.
    pub time: String,
    pub level: LogLevel,
    pub text: String,
}

impl PanelRow {
    fn from_entry(entry: &LogEntry) -> Self {
        Self {
            time: format_clock(entry.timestamp),
            level: entry.level,
            text: sanitize(&entry.message),
        }
    }
}

/// Content of an open panel.
#[derive(Debug, Default)]
struct PanelView {
    rows: Vec<PanelRow>,
}

/// Toggleable devtools panel.
#[derive(Debug, Default)]
pub struct DevtoolsPanel {
    view: Option<PanelView>,
}

impl DevtoolsPanel {
    /// A closed panel.
    pub fn new() -> Self {
        Self { view: None }
    }

    pub fn is_open(&self) -> bool {
        self.view.is_some()
    }

    /// Build the panel if needed and render the current buffer into it.
    pub fn show(&mut self, devtools: &Devtools) {
        self.view.get_or_insert_with(PanelView::default);
        self.render(devtools);
    }

    /// Tear the panel down. Rows are dropped, not hidden.
    pub fn hide(&mut self) {
        self.view = None;
    }

    /// Flip visibility; returns `true` when the panel is now open.
    pub fn toggle(&mut self, devtools: &Devtools) -> bool {
        if self.is_open() {
            self.hide();
            false
        } else {
            self.show(devtools);
            true
        }
    }

    /// Rebuild every row from the buffer, newest first. No-op while closed.
    pub fn render(&mut self, devtools: &Devtools) {
        if let Some(view) = self.view.as_mut() {
            view.rows = devtools
                .entries_newest_first()
                .iter()
                .map(PanelRow::from_entry)
                .collect();
        }
    }

    /// Empty the buffer and re-render.
    pub fn clear(&mut self, devtools: &Devtools) {
        devtools.clear();
        self.render(devtools);
    }

    /// Rows of the open panel, `None` while closed.
    pub fn rows(&self) -> Option<&[PanelRow]> {
        self.view.as_ref().map(|v| v.rows.as_slice())
    }
}

/// Format epoch milliseconds as local `HH:MM:SS`.
pub fn format_clock(timestamp_ms: u64) -> String {
    i64::try_from(timestamp_ms)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|t| t.with_timezone(&Local).format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string())
}

/// Replace control characters so captured text cannot drive the terminal.
pub fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_control() { '\u{FFFD}' } else { c })
        .collect()
}
