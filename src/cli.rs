use std::path::PathBuf;

use clap::Parser;
use clap_complete::Shell;

use crate::api::WifiInfo;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::gateway::GatewayOptions;

#[derive(Parser, Debug)]
#[command(name = "mesh-now")]
#[command(version)]
#[command(about = "Terminal chat client and devtools overlay for ESP32 Mesh-NOW gateways")]
pub struct Args {
    /// Gateway base URL (default http://192.168.4.1)
    #[arg(long)]
    pub url: Option<String>,

    /// TOML config file; CLI flags override its values
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// `/messages` poll period in milliseconds
    #[arg(long)]
    pub poll_ms: Option<u64>,

    /// `/peers` poll period in milliseconds
    #[arg(long)]
    pub peer_poll_ms: Option<u64>,

    /// Chat lines kept before the oldest are dropped
    #[arg(long)]
    pub max_messages: Option<usize>,

    /// Minimum milliseconds between devtools panel redraws (0 = every change)
    #[arg(long)]
    pub panel_refresh_ms: Option<u64>,

    /// Open the devtools panel at start-up
    #[arg(long)]
    pub devtools: bool,

    /// Disable coloured output
    #[arg(long)]
    pub no_color: bool,

    /// tracing filter for stderr diagnostics (RUST_LOG wins when set)
    #[arg(long, default_value = "warn")]
    pub log_level: String,

    /// Run a local mock gateway instead of the client
    #[arg(long)]
    pub mock_gateway: bool,

    /// Port for the mock gateway
    #[arg(long, default_value = "8080")]
    pub port: u16,

    /// Simulated radio peers on the mock gateway
    #[arg(long, default_value = "2")]
    pub mock_peers: usize,

    /// Mock gateway queues sent messages back to the sender
    #[arg(long)]
    pub mock_echo: bool,

    /// SSID the mock gateway reports on /wifi-info
    #[arg(long, default_value = "ESP32-Mesh-NOW")]
    pub ssid: String,

    /// Print shell completions and exit
    #[arg(long, value_enum)]
    pub completions: Option<Shell>,
}

impl Args {
    /// Build the client config: file (if any), then CLI overrides, then
    /// validation.
    pub fn resolve_config(&self) -> Result<ClientConfig> {
        let mut config = match &self.config {
            Some(path) => ClientConfig::load(path)?,
            None => ClientConfig::default(),
        };
        if let Some(url) = &self.url {
            config.base_url = url.clone();
        }
        if let Some(ms) = self.poll_ms {
            config.message_poll_ms = ms;
        }
        if let Some(ms) = self.peer_poll_ms {
            config.peer_poll_ms = ms;
        }
        if let Some(n) = self.max_messages {
            config.max_messages = n;
        }
        if let Some(ms) = self.panel_refresh_ms {
            config.panel_refresh_ms = ms;
        }
        if self.devtools {
            config.devtools_open = true;
        }
        if self.no_color {
            config.color = false;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn gateway_options(&self) -> GatewayOptions {
        let defaults = GatewayOptions::default();
        GatewayOptions {
            wifi: WifiInfo {
                ssid: self.ssid.clone(),
                ..defaults.wifi
            },
            peers: self.mock_peers,
            echo: self.mock_echo,
        }
    }
}
