//! Terminal rendering of the chat view and the devtools panel.

use std::io::{self, Write};

use colored::*;

use crate::chat::{ChatLine, Surface, SystemKind};
use crate::devtools::panel::sanitize;
use crate::devtools::{LogLevel, PanelRow};

/// Line-oriented surface: every append prints one line, the panel is drawn
/// as a framed block.
pub struct TerminalSurface<W: Write = io::Stdout> {
    out: W,
    panel_rows: usize,
}

impl TerminalSurface<io::Stdout> {
    pub fn stdout(panel_rows: usize) -> Self {
        Self::new(io::stdout(), panel_rows)
    }
}

impl<W: Write> TerminalSurface<W> {
    /// `panel_rows` caps how many panel rows are drawn (0 draws all).
    pub fn new(out: W, panel_rows: usize) -> Self {
        Self { out, panel_rows }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, text: &str) {
        // A closed stdout is not worth taking the client down for.
        let _ = writeln!(self.out, "{text}");
    }
}

fn level_color(level: LogLevel, text: &str) -> ColoredString {
    match level {
        LogLevel::Error => text.bright_red(),
        LogLevel::Warn => text.yellow(),
        LogLevel::Log => text.bright_black(),
    }
}

impl<W: Write> Surface for TerminalSurface<W> {
    fn draw_header(&mut self, title: &str, status: &str, peer_label: &str) {
        let line = format!(
            "{}  {}  {}",
            title.bold().bright_cyan(),
            status.bright_green(),
            peer_label.bright_blue()
        );
        self.emit(&line);
        self.emit(&"─".repeat(48).bright_black().to_string());
    }

    fn append_line(&mut self, line: &ChatLine) {
        let rendered = match line {
            ChatLine::Peer { sender, content, .. } => format!(
                "{}: {}",
                sanitize(sender).bold().bright_cyan(),
                sanitize(content)
            ),
            ChatLine::System { content, kind: SystemKind::Info } => {
                format!("* {}", sanitize(content)).italic().bright_black().to_string()
            }
            ChatLine::System { content, kind: SystemKind::Error } => {
                format!("! {}", sanitize(content)).bright_red().to_string()
            }
        };
        self.emit(&rendered);
    }

    fn scroll_to_bottom(&mut self) {
        let _ = self.out.flush();
    }

    fn set_peer_label(&mut self, label: &str) {
        let line = format!("[{label}]").bright_blue().to_string();
        self.emit(&line);
    }

    fn draw_panel(&mut self, rows: Option<&[PanelRow]>) {
        let Some(rows) = rows else {
            self.emit(&"── DevTools closed ──".bright_black().to_string());
            return;
        };
        self.emit(&"── DevTools ── /clear to empty, /devtools to close ──".bold().to_string());
        let limit = if self.panel_rows == 0 { rows.len() } else { self.panel_rows };
        for row in rows.iter().take(limit) {
            let line = format!("{} {}", row.time.bright_black(), level_color(row.level, &row.text));
            self.emit(&line);
        }
        if rows.len() > limit {
            self.emit(&format!("… {} older", rows.len() - limit).bright_black().to_string());
        }
        self.emit(&"──".repeat(24).bright_black().to_string());
        let _ = self.out.flush();
    }
}
