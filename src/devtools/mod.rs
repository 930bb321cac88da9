//! # Devtools
//!
//! On-device debugging overlay for environments without an inspector.
//!
//! ## What It Does
//!
//! 1. **Log capture**: [`Devtools`] mirrors `log`/`warn`/`error` calls into
//!    `tracing` and into a bounded [`LogBuffer`] (200 entries, oldest dropped).
//! 2. **Request capture**: [`crate::transport::LoggingTransport`] records
//!    `fetch <METHOD> <path> <status>` for every resolved request.
//! 3. **Panel**: [`DevtoolsPanel`] is built on show, dropped on hide, and
//!    rebuilt from the buffer on every change.
//!
//! ## Usage
//!
//! ```rust
//! use mesh_now::devtools::{Devtools, DevtoolsPanel, LogArg};
//!
//! let devtools = Devtools::default();
//! devtools.warn(&["Poll error:".into(), LogArg::json(&503)]);
//!
//! let mut panel = DevtoolsPanel::new();
//! panel.show(&devtools);
//! assert_eq!(panel.rows().unwrap()[0].text, "Poll error: 503");
//! ```

pub mod buffer;
pub mod console;
pub mod panel;

pub use buffer::{render_args, LogArg, LogBuffer, LogEntry, LogLevel, LOG_CAPACITY};
pub use console::Devtools;
pub use panel::{DevtoolsPanel, PanelRow};
