//! Client configuration: defaults, optional TOML file, validation.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::devtools::LOG_CAPACITY;
use crate::error::{MeshError, Result};

/// Address the ESP32 soft-AP hands out to itself.
pub const DEFAULT_BASE_URL: &str = "http://192.168.4.1";

/// Runtime configuration for the chat client.
///
/// Every field has a default, so a config file only needs the keys it
/// changes:
///
/// ```toml
/// base_url = "http://10.0.0.7"
/// message_poll_ms = 500
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Base URL of the gateway's HTTP server.
    pub base_url: String,
    /// `/messages` poll period.
    pub message_poll_ms: u64,
    /// `/peers` poll period.
    pub peer_poll_ms: u64,
    /// TCP connection timeout.
    pub connect_timeout_ms: u64,
    /// Per-request timeout.
    pub request_timeout_ms: u64,
    /// Chat lines kept before the oldest are evicted.
    pub max_messages: usize,
    /// Devtools log entries kept before the oldest are evicted.
    pub log_capacity: usize,
    /// Rows of the devtools panel drawn on each render.
    pub panel_rows: usize,
    /// Minimum gap between two redraws of the open panel; changes inside
    /// the gap are coalesced into one redraw. 0 redraws on every change.
    pub panel_refresh_ms: u64,
    /// Open the devtools panel at start-up.
    pub devtools_open: bool,
    /// Colour terminal output.
    pub color: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            message_poll_ms: 1_000,
            peer_poll_ms: 5_000,
            connect_timeout_ms: 3_000,
            request_timeout_ms: 10_000,
            max_messages: 500,
            log_capacity: LOG_CAPACITY,
            panel_rows: 12,
            panel_refresh_ms: 2_000,
            devtools_open: false,
            color: true,
        }
    }
}

impl ClientConfig {
    /// Defaults aimed at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Parse a TOML document and validate it.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: ClientConfig =
            toml::from_str(s).map_err(|e| MeshError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Reject values the client cannot run with.
    pub fn validate(&self) -> Result<()> {
        let url = self.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(MeshError::Config(format!(
                "base_url must start with http:// or https://, got '{}'",
                self.base_url
            )));
        }
        for (name, value) in [
            ("message_poll_ms", self.message_poll_ms),
            ("peer_poll_ms", self.peer_poll_ms),
            ("connect_timeout_ms", self.connect_timeout_ms),
            ("request_timeout_ms", self.request_timeout_ms),
        ] {
            if value == 0 {
                return Err(MeshError::Config(format!("{name} must be greater than 0")));
            }
        }
        if self.max_messages == 0 {
            return Err(MeshError::Config("max_messages must be greater than 0".into()));
        }
        if self.log_capacity == 0 {
            return Err(MeshError::Config("log_capacity must be greater than 0".into()));
        }
        Ok(())
    }

    /// Base URL without a trailing slash, ready for `format!("{base}{path}")`.
    pub fn base_url(&self) -> &str {
        self.base_url.trim().trim_end_matches('/')
    }

    pub fn message_poll_interval(&self) -> Duration {
        Duration::from_millis(self.message_poll_ms)
    }

    pub fn peer_poll_interval(&self) -> Duration {
        Duration::from_millis(self.peer_poll_ms)
    }

    pub fn panel_refresh_interval(&self) -> Duration {
        Duration::from_millis(self.panel_refresh_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
